//! Proportional-integral control of the bitcell width.
//!
//! The phase detector measures how far each edge lands from the centre of its
//! bitcell. That error, and its saturating running sum, steer the width of the
//! following cell away from nominal. The next cell begins where the current
//! one ends under the width in effect before the update.

use either::Either::{self, Left, Right};
use tracing::debug;

use crate::{
    SAMPLE_CLOCK_HZ,
    log::{PhaseError, PhaseLog},
};

use super::{Edge, FRACTIONAL_BITS, Gains, Limits, Pulse, Recovery, Runt, Window};

/// How the phase error is reported to the diagnostics log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    /// Raw 16.16 fixed-point error.
    V1,
    /// Error in fractional sample ticks.
    V2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcellWidthPi {
    nominal: u32,
    gains: Gains,
    limits: Limits,
    revision: Revision,
    width: u32,
    integral: i32,
    window: Option<Window>,
}

impl BitcellWidthPi {
    /// Create a loop around a nominal width of `cell` ticks.
    ///
    /// Without `limits`, the width is only kept non-zero.
    pub fn new(cell: u16, gains: Gains, limits: Option<Limits>, revision: Revision) -> Self {
        let nominal = u32::from(cell.max(1)) << FRACTIONAL_BITS;

        Self {
            nominal,
            gains,
            limits: limits.unwrap_or(Limits::UNBOUNDED),
            revision,
            width: nominal,
            integral: 0,
            window: None,
        }
    }

    /// Current bitcell width, in 16.16 fixed-point ticks.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Accumulated centre error.
    pub fn integral(&self) -> i32 {
        self.integral
    }

    /// Current bitcell window, once the first edge has been seen.
    pub fn window(&self) -> Option<Window> {
        self.window
    }
}

impl Recovery for BitcellWidthPi {
    const TIMESTAMP_FREQ_HZ: u64 = SAMPLE_CLOCK_HZ;

    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse> {
        let position = edge.fixed();

        // The first edge is taken to be centred in the first bitcell.
        let window = self.window.get_or_insert_with(|| {
            debug!(sample = edge.sample, "first edge");
            Window::centred(position, self.nominal)
        });

        if window.is_runt(position) {
            return Left(Runt);
        }

        let zeros = window.skip_empty(position, self.width);
        let error = window.centre_error(position, self.width);

        log.event(
            edge.timestamp,
            match self.revision {
                Revision::V1 => PhaseError::Ticks(error),
                Revision::V2 => PhaseError::from_fixed(error),
            },
        );

        self.integral = self.integral.saturating_add(error);

        window.advance(self.width);
        self.width = self.limits.clamp(self.gains.steer(self.nominal, error, self.integral));

        Right(Pulse { zeros })
    }
}
