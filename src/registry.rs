//! Selection of a clock recovery algorithm by name.
//!
//! An algorithm is selected with a string of the form `name[key=value,...]`.
//! The brackets and parameter list are optional for algorithms that take no
//! parameters. Selecting an algorithm binds and validates its parameters once,
//! yielding a [`Config`] that can decode any number of runs.

use alloc::string::String;
use core::{fmt, str::FromStr};

use thiserror::Error;
use tracing::info;

use crate::{
    log::PhaseLog,
    pack::{PackError, Track, WordBuffer},
    params::{FromParameters, Pair, Parameter, ParameterError, bind, parse_pairs},
    recovery::{
        self, Gains, Limits,
        dual_loop::DualLoop,
        fixed::{Hysteresis, RuntMerge},
        heuristic::{DefaultPll, FallbackPll},
        nco::{Period, PhaseStep, Preset},
        pi::{BitcellWidthPi, Revision},
    },
};

/// An error selecting an algorithm.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown algorithm: {0}.")]
    UnknownAlgorithm(String),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// Every available algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    FlashfloppyV341,
    FlashfloppyMaster,
    GreaseweazleDefaultPll,
    GreaseweazleFallbackPll,
    Fdc9216,
    BitcellWidthPiV1,
    BitcellWidthPiV2,
    NcoV1,
    NcoV2,
    Nco178k,
    Nco358k,
    Nco715k,
}

impl Algorithm {
    pub const ALL: &'static [Self] = &[
        Self::BitcellWidthPiV1,
        Self::BitcellWidthPiV2,
        Self::Fdc9216,
        Self::FlashfloppyV341,
        Self::FlashfloppyMaster,
        Self::GreaseweazleDefaultPll,
        Self::GreaseweazleFallbackPll,
        Self::NcoV1,
        Self::NcoV2,
        Self::Nco178k,
        Self::Nco358k,
        Self::Nco715k,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::FlashfloppyV341 => "flashfloppy_v341",
            Self::FlashfloppyMaster => "flashfloppy_master",
            Self::GreaseweazleDefaultPll => "greaseweazle_default_pll",
            Self::GreaseweazleFallbackPll => "greaseweazle_fallback_pll",
            Self::Fdc9216 => "fdc9216",
            Self::BitcellWidthPiV1 => "bitcell_width_pi_v1",
            Self::BitcellWidthPiV2 => "bitcell_width_pi_v2",
            Self::NcoV1 => "nco_v1",
            Self::NcoV2 => "nco_v2",
            Self::Nco178k => "nco_178k",
            Self::Nco358k => "nco_358k",
            Self::Nco715k => "nco_715k",
        }
    }

    /// Parameters the algorithm accepts.
    pub fn parameters(self) -> &'static [Parameter] {
        match self {
            Self::BitcellWidthPiV1 | Self::BitcellWidthPiV2 | Self::NcoV1 => {
                ClampedGains::PARAMETERS
            }
            Self::NcoV2 => LoopGains::PARAMETERS,
            _ => NoParameters::PARAMETERS,
        }
    }

    /// Bind parameters, producing a reusable configuration.
    pub fn configure<'a>(
        self,
        pairs: impl IntoIterator<Item = Pair<'a>>,
    ) -> Result<Config, ParameterError> {
        let law = match self {
            Self::FlashfloppyV341 => unparameterized(pairs, Law::Hysteresis)?,
            Self::FlashfloppyMaster => unparameterized(pairs, Law::RuntMerge)?,
            Self::GreaseweazleDefaultPll => unparameterized(pairs, Law::DefaultPll)?,
            Self::GreaseweazleFallbackPll => unparameterized(pairs, Law::FallbackPll)?,
            Self::Fdc9216 => unparameterized(pairs, Law::DualLoop)?,
            Self::BitcellWidthPiV1 => {
                let p: ClampedGains = bind(pairs)?;
                Law::BitcellWidthPi(p.gains()?, p.clamp_pct, Revision::V1)
            }
            Self::BitcellWidthPiV2 => {
                let p: ClampedGains = bind(pairs)?;
                Law::BitcellWidthPi(p.gains()?, p.clamp_pct, Revision::V2)
            }
            Self::NcoV1 => {
                let p: ClampedGains = bind(pairs)?;
                Law::PhaseStep(p.gains()?, p.clamp_pct)
            }
            Self::NcoV2 => Law::Period(bind::<LoopGains>(pairs)?.gains()?),
            Self::Nco178k => unparameterized(pairs, Law::Preset(Preset::Nco178k))?,
            Self::Nco358k => unparameterized(pairs, Law::Preset(Preset::Nco358k))?,
            Self::Nco715k => unparameterized(pairs, Law::Preset(Preset::Nco715k))?,
        };

        Ok(Config {
            algorithm: self,
            law,
        })
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| SelectionError::UnknownAlgorithm(s.into()))
    }
}

/// An algorithm name and its unparsed parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub name: &'a str,
    pub parameters: Option<&'a str>,
}

impl<'a> Selection<'a> {
    /// Split `name[parameters]`.
    ///
    /// The name ends at the first `[` and the parameters at the last `]`.
    /// Without both brackets, the whole string is the name.
    pub fn parse(s: &'a str) -> Self {
        match (s.find('['), s.rfind(']')) {
            (Some(start), Some(end)) if start < end => Self {
                name: &s[..start],
                parameters: Some(&s[start + 1..end]),
            },
            _ => Self {
                name: s,
                parameters: None,
            },
        }
    }

    /// Look up the algorithm and bind its parameters.
    pub fn configure(&self) -> Result<Config, SelectionError> {
        let algorithm = self.name.parse::<Algorithm>()?;
        let pairs = parse_pairs(self.parameters.unwrap_or_default());
        Ok(algorithm.configure(pairs)?)
    }
}

/// A selected algorithm with bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    algorithm: Algorithm,
    law: Law,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Law {
    Hysteresis,
    RuntMerge,
    DefaultPll,
    FallbackPll,
    DualLoop,
    BitcellWidthPi(Gains, Option<u32>, Revision),
    PhaseStep(Gains, Option<u32>),
    Period(Gains),
    Preset(Preset),
}

impl Config {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Recover the bitcells of `samples` around a nominal width of `cell`
    /// ticks, packing them into `buffer`.
    ///
    /// Each call starts from fresh algorithm state.
    pub fn decode(
        &self,
        cell: u16,
        samples: &[u16],
        buffer: WordBuffer,
        log: impl PhaseLog,
    ) -> Result<Track, PackError> {
        info!(algorithm = self.algorithm.name(), cell, "starting recovery");

        let track = match self.law {
            Law::Hysteresis => recovery::decode(Hysteresis::new(cell), samples, buffer, log),
            Law::RuntMerge => recovery::decode(RuntMerge::new(cell), samples, buffer, log),
            Law::DefaultPll => recovery::decode(DefaultPll::new(cell), samples, buffer, log),
            Law::FallbackPll => recovery::decode(FallbackPll::new(cell), samples, buffer, log),
            Law::DualLoop => recovery::decode(DualLoop::new(cell), samples, buffer, log),
            Law::BitcellWidthPi(gains, clamp_pct, revision) => {
                let nominal = u32::from(cell.max(1)) << recovery::FRACTIONAL_BITS;
                let limits = clamp_pct.map(|pct| Limits::percent(nominal, pct));
                let pi = BitcellWidthPi::new(cell, gains, limits, revision);
                recovery::decode(pi, samples, buffer, log)
            }
            Law::PhaseStep(gains, clamp_pct) => {
                let unity = 1 << recovery::FRACTIONAL_BITS;
                let limits = clamp_pct.map(|pct| Limits::percent(unity, pct));
                recovery::decode(PhaseStep::new(cell, gains, limits), samples, buffer, log)
            }
            Law::Period(gains) => recovery::decode(Period::new(cell, gains), samples, buffer, log),
            Law::Preset(preset) => {
                recovery::decode(PhaseStep::preset(cell, preset), samples, buffer, log)
            }
        }?;

        info!(bits = track.bit_count, "decoded bitcells");
        Ok(track)
    }
}

impl FromStr for Config {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selection::parse(s).configure()
    }
}

#[derive(Debug, Default, FromParameters)]
struct NoParameters {}

/// Gains of a proportional-integral loop with an optional clamp.
#[derive(Debug, Default, FromParameters)]
struct ClampedGains {
    /// Proportional gain numerator.
    #[parameter(required)]
    p_mul: u32,
    /// Proportional gain denominator.
    #[parameter(required)]
    p_div: u32,
    /// Integral gain numerator.
    #[parameter(required)]
    i_mul: u32,
    /// Integral gain denominator.
    #[parameter(required)]
    i_div: u32,
    /// Limit on deviation from nominal, in percent.
    #[parameter]
    clamp_pct: Option<u32>,
}

impl ClampedGains {
    fn gains(&self) -> Result<Gains, ParameterError> {
        gains(self.p_mul, self.p_div, self.i_mul, self.i_div)
    }
}

/// Gains of a proportional-integral loop.
#[derive(Debug, Default, FromParameters)]
struct LoopGains {
    /// Proportional gain numerator.
    #[parameter(required)]
    p_mul: u32,
    /// Proportional gain denominator.
    #[parameter(required)]
    p_div: u32,
    /// Integral gain numerator.
    #[parameter(required)]
    i_mul: u32,
    /// Integral gain denominator.
    #[parameter(required)]
    i_div: u32,
}

impl LoopGains {
    fn gains(&self) -> Result<Gains, ParameterError> {
        gains(self.p_mul, self.p_div, self.i_mul, self.i_div)
    }
}

/// Bind an empty parameter list, warning about anything supplied.
fn unparameterized<'a>(
    pairs: impl IntoIterator<Item = Pair<'a>>,
    law: Law,
) -> Result<Law, ParameterError> {
    bind::<NoParameters>(pairs)?;
    Ok(law)
}

fn gains(p_mul: u32, p_div: u32, i_mul: u32, i_div: u32) -> Result<Gains, ParameterError> {
    Gains::new(p_mul, p_div, i_mul, i_div).ok_or(ParameterError::Zero(if p_div == 0 {
        "p_div"
    } else {
        "i_div"
    }))
}
