#![cfg(feature = "std")]

use std::collections::HashSet;

use fluxcell::{
    params::ParameterError,
    registry::{Algorithm, Config, Selection, SelectionError},
};

const GAINS: &str = "p_mul=1,p_div=8,i_mul=1,i_div=256";

#[test]
fn names_are_unique_and_resolve() {
    let names = Algorithm::ALL.iter().map(|a| a.name()).collect::<HashSet<_>>();
    assert_eq!(names.len(), 12);

    for &algorithm in Algorithm::ALL {
        assert_eq!(algorithm.name().parse::<Algorithm>(), Ok(algorithm));
    }
}

#[test]
fn unknown_algorithm() {
    assert_eq!(
        "flashfloppy_v342".parse::<Config>(),
        Err(SelectionError::UnknownAlgorithm("flashfloppy_v342".into()))
    );
}

#[test]
fn selection_splits_at_brackets() {
    assert_eq!(
        Selection::parse("nco_v1[p_mul=1,p_div=2]"),
        Selection {
            name: "nco_v1",
            parameters: Some("p_mul=1,p_div=2"),
        }
    );

    assert_eq!(
        Selection::parse("fdc9216"),
        Selection {
            name: "fdc9216",
            parameters: None,
        }
    );

    // Parameters run to the last closing bracket.
    assert_eq!(
        Selection::parse("a[b=1]]").parameters,
        Some("b=1]")
    );

    // Without both brackets, in order, everything is the name.
    assert_eq!(Selection::parse("a[b=1").name, "a[b=1");
    assert_eq!(Selection::parse("a]b[").name, "a]b[");
}

#[test]
fn parameter_descriptions() {
    let pi = Algorithm::BitcellWidthPiV2.parameters();
    let names = pi.iter().map(|p| p.name).collect::<Vec<_>>();
    assert_eq!(names, ["p_mul", "p_div", "i_mul", "i_div", "clamp_pct"]);
    assert_eq!(pi.iter().filter(|p| p.required).count(), 4);
    assert!(pi.iter().all(|p| !p.description.is_empty()));

    assert_eq!(Algorithm::NcoV1.parameters(), pi);
    assert_eq!(Algorithm::NcoV2.parameters().len(), 4);
    assert!(Algorithm::NcoV2.parameters().iter().all(|p| p.required));

    for algorithm in [
        Algorithm::FlashfloppyV341,
        Algorithm::FlashfloppyMaster,
        Algorithm::GreaseweazleDefaultPll,
        Algorithm::GreaseweazleFallbackPll,
        Algorithm::Fdc9216,
        Algorithm::Nco178k,
        Algorithm::Nco358k,
        Algorithm::Nco715k,
    ] {
        assert!(algorithm.parameters().is_empty(), "{algorithm}");
    }
}

#[test]
fn required_parameters() {
    for name in ["bitcell_width_pi_v1", "bitcell_width_pi_v2", "nco_v1", "nco_v2"] {
        assert_eq!(
            name.parse::<Config>(),
            Err(SelectionError::Parameter(ParameterError::Missing("p_mul"))),
        );

        assert_eq!(
            format!("{name}[p_mul=1,p_div=8,i_mul=1]").parse::<Config>(),
            Err(SelectionError::Parameter(ParameterError::Missing("i_div"))),
        );

        let config = format!("{name}[{GAINS}]").parse::<Config>().unwrap();
        assert_eq!(config.algorithm().name(), name);
    }
}

#[test]
fn invalid_values() {
    assert_eq!(
        format!("nco_v2[{GAINS},p_mul=-3]").parse::<Config>(),
        Err(SelectionError::Parameter(ParameterError::Invalid {
            key: "p_mul".into(),
            value: "-3".into(),
        })),
    );

    assert!(matches!(
        format!("nco_v1[{GAINS},clamp_pct=ten]").parse::<Config>(),
        Err(SelectionError::Parameter(ParameterError::Invalid { .. }))
    ));
}

#[test]
fn zero_divisors() {
    assert_eq!(
        "nco_v1[p_mul=1,p_div=0,i_mul=1,i_div=256]".parse::<Config>(),
        Err(SelectionError::Parameter(ParameterError::Zero("p_div"))),
    );

    assert_eq!(
        "bitcell_width_pi_v1[p_mul=1,p_div=8,i_mul=1,i_div=0]".parse::<Config>(),
        Err(SelectionError::Parameter(ParameterError::Zero("i_div"))),
    );
}

#[test]
fn unknown_parameters_are_ignored() {
    let config = "fdc9216[speed=fast]".parse::<Config>().unwrap();
    assert_eq!(config.algorithm(), Algorithm::Fdc9216);

    let config = format!("nco_v2[{GAINS},clamp_pct=10]").parse::<Config>();
    assert!(config.is_ok());
}

#[test]
fn later_values_win() {
    let a = format!("nco_v1[{GAINS},p_mul=2]").parse::<Config>().unwrap();
    let b = "nco_v1[p_mul=2,p_div=8,i_mul=1,i_div=256]".parse::<Config>().unwrap();
    assert_eq!(a, b);
}
