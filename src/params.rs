//! Algorithm parameters.
//!
//! Parameters arrive as a comma-separated list of `key=value` pairs, such as
//! `p_mul=1,p_div=8,i_mul=1,i_div=256`. Values are non-negative decimal
//! integers. Types implementing [`FromParameters`] describe the parameters
//! they accept and are built from a list of pairs by [`bind`].

use alloc::{
    string::{String, ToString},
    vec,
};

use thiserror::Error;
use tracing::warn;

/// Derive [`FromParameters`] for a struct of parameter values.
///
/// Add the `parameter` attribute to each field to be bound. The field name is
/// the parameter key (override with `name = "..."`), and the field's doc
/// comment is its description. Mark mandatory parameters with `required`;
/// optional parameters are either `Option<T>` or take their default value.
/// Field types must be convertible from `u32`.
///
/// ```
/// #[derive(Debug, Default, FromParameters)]
/// struct Gains {
///     /// Proportional gain numerator.
///     #[parameter(required)]
///     p_mul: u32,
///     /// Limit, in percent of nominal.
///     #[parameter]
///     clamp_pct: Option<u32>,
/// }
/// ```
pub use fluxcell_derive::FromParameters;

/// Description of an accepted parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Build a value from bound parameters.
///
/// See the [`FromParameters`](macro@FromParameters) derive macro for an
/// automatic implementation of this trait.
pub trait FromParameters: Sized {
    /// Parameters accepted, in binding order.
    const PARAMETERS: &'static [Parameter];

    /// Build from the value bound to each entry of [`Self::PARAMETERS`].
    fn from_values(values: &[Option<u32>]) -> Self;
}

/// An error binding parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    /// Value is not a non-negative integer.
    #[error("Parameter {key} must be a non-negative integer (found \"{value}\").")]
    Invalid { key: String, value: String },
    /// A required parameter was not supplied.
    #[error("Required parameter {0} not set.")]
    Missing(&'static str),
    /// A divisor was zero.
    #[error("Parameter {0} must not be zero.")]
    Zero(&'static str),
}

/// A single `key=value` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Split a parameter list into pairs.
///
/// Empty entries are skipped. An entry without `=` has an empty value.
pub fn parse_pairs(s: &str) -> impl Iterator<Item = Pair<'_>> {
    s.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => Pair { key, value },
            None => Pair {
                key: entry,
                value: "",
            },
        })
}

/// Bind pairs to the parameters of `T`.
///
/// Unknown keys are logged and ignored. The last value given for a key wins.
pub fn bind<'a, T: FromParameters>(
    pairs: impl IntoIterator<Item = Pair<'a>>,
) -> Result<T, ParameterError> {
    let mut values = vec![None; T::PARAMETERS.len()];

    for Pair { key, value } in pairs {
        let Some(index) = T::PARAMETERS.iter().position(|p| p.name == key) else {
            warn!(key, "unknown parameter");
            continue;
        };

        let value = value.parse::<u32>().map_err(|_| ParameterError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        })?;

        values[index] = Some(value);
    }

    let missing = T::PARAMETERS
        .iter()
        .zip(&values)
        .find(|(p, v)| p.required && v.is_none());

    if let Some((p, _)) = missing {
        Err(ParameterError::Missing(p.name))?;
    }

    Ok(T::from_values(&values))
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[derive(Debug, Default, FromParameters)]
    struct Example {
        /// Multiplier.
        #[parameter(required)]
        mul: u32,
        /// Optional limit.
        #[parameter(name = "limit_pct")]
        limit: Option<u32>,
        unbound: u8,
    }

    #[test]
    fn describes_parameters() {
        assert_eq!(
            Example::PARAMETERS,
            &[
                Parameter {
                    name: "mul",
                    required: true,
                    description: "Multiplier.",
                },
                Parameter {
                    name: "limit_pct",
                    required: false,
                    description: "Optional limit.",
                },
            ]
        );
    }

    #[test]
    fn splits_pairs() {
        let pairs = parse_pairs("a=1,,b=,c").collect::<Vec<_>>();

        assert_eq!(
            pairs,
            [
                Pair {
                    key: "a",
                    value: "1"
                },
                Pair { key: "b", value: "" },
                Pair { key: "c", value: "" },
            ]
        );
    }

    #[test]
    fn binds_values() {
        let e: Example = bind(parse_pairs("limit_pct=10,mul=3,other=7")).unwrap();

        assert_eq!(e.mul, 3);
        assert_eq!(e.limit, Some(10));
        assert_eq!(e.unbound, 0);
    }

    #[test]
    fn rejects_missing_required() {
        let e = bind::<Example>(parse_pairs("limit_pct=10"));
        assert_eq!(e.unwrap_err(), ParameterError::Missing("mul"));
    }

    #[test]
    fn rejects_negative_and_non_numeric() {
        for list in ["mul=-1", "mul=x", "mul=", "mul"] {
            assert!(matches!(
                bind::<Example>(parse_pairs(list)),
                Err(ParameterError::Invalid { .. })
            ));
        }
    }
}
