use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod from_parameters;

#[proc_macro_derive(FromParameters, attributes(parameter))]
pub fn derive_from_parameters(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match from_parameters::expand_from_parameters(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}
