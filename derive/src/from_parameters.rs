use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Expr, Field, Fields, Ident, Lit, LitStr, Meta, Result, Type,
    spanned::Spanned,
};

pub(crate) fn expand_from_parameters(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new(
            input.span(),
            "`FromParameters` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new(
            input.span(),
            "`FromParameters` may only be derived on structs with named fields.",
        ))?
    };

    let all = fields.named.len();

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .map(Result::transpose)
        .flatten() // Skip fields without an attribute.
        .collect::<Result<Vec<_>>>()?;

    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.key.value() == field.key.value()) {
            Err(Error::new_spanned(
                &field.key,
                "Parameter names must be unique.",
            ))?
        }
    }

    let descriptors = fields.iter().map(|field| {
        let FieldMetadata {
            key,
            required,
            description,
            ..
        } = field;

        quote! {
            Parameter {
                name: #key,
                required: #required,
                description: #description,
            }
        }
    });

    let assignments = fields.iter().enumerate().map(|(index, field)| {
        let name = &field.name;

        let value = quote! {
            values.get(#index).copied().flatten().map(::core::convert::Into::into)
        };

        if field.is_option {
            quote! { #name: #value }
        } else {
            quote! { #name: #value.unwrap_or_default() }
        }
    });

    // Fields without an attribute keep their default value.
    let rest = (fields.len() != all).then(|| quote! { ..::core::default::Default::default() });

    let name = &input.ident;

    let expanded = quote! {
        impl FromParameters for #name {
            const PARAMETERS: &'static [Parameter] = &[#(#descriptors),*];

            #[allow(unused_variables)]
            fn from_values(values: &[Option<u32>]) -> Self {
                Self {
                    #(#assignments,)*
                    #rest
                }
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    key: LitStr,
    required: bool,
    description: String,
    is_option: bool,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Option<Self>> {
        let name = field.ident.clone().unwrap();

        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("parameter")) else {
            return Ok(None);
        };

        let mut key = LitStr::new(&name.to_string(), name.span());
        let mut required = false;

        if let Meta::List(_) = &attr.meta {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("required") {
                    required = true;
                    Ok(())
                } else if meta.path.is_ident("name") {
                    key = meta.value()?.parse()?;
                    Ok(())
                } else {
                    Err(meta.error("Expected `required` or `name = \"...\"`."))
                }
            })?;
        }

        let description = field
            .attrs
            .iter()
            .filter(|a| a.path().is_ident("doc"))
            .filter_map(|a| match &a.meta {
                Meta::NameValue(nv) => match &nv.value {
                    Expr::Lit(lit) => match &lit.lit {
                        Lit::Str(s) => Some(s.value().trim().to_string()),
                        _ => None,
                    },
                    _ => None,
                },
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ");

        let Type::Path(path) = &field.ty else {
            Err(Error::new_spanned(
                &field.ty,
                "Field must have a type annotation.",
            ))?
        };

        let Some(segment) = path.path.segments.last() else {
            Err(Error::new_spanned(
                &path.path.segments,
                "Field must have a type annotation.",
            ))?
        };

        let is_option = segment.ident == "Option";

        if required && is_option {
            Err(Error::new_spanned(
                &segment.ident,
                "Required parameters must not have type `Option<T>`.",
            ))?
        }

        Ok(Some(Self {
            name,
            key,
            required,
            description,
            is_option,
        }))
    }
}
