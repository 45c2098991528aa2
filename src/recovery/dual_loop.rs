//! A PLL modelled on the FDC9216 data separator, steering phase and frequency
//! separately.
//!
//! Phase moves in steps of an eighth of a bitcell whenever an edge lands
//! outside the middle quarter of its cell. Every five phase steps, a net trend
//! of more than two in one direction nudges the period by 1/800 of nominal.
//! The period never leaves ±10% of nominal.

use either::Either::{self, Left, Right};
use tracing::debug;

use crate::log::{PhaseError, PhaseLog};

use super::{Edge, FRACTIONAL_BITS, Limits, Pulse, Recovery, Runt, Window};

/// Phase steps between frequency decisions.
const PHASE_STEPS_PER_DECISION: u8 = 5;

/// Net phase trend needed to move the frequency.
const TREND_THRESHOLD: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualLoop {
    period: u32,
    period_adjust: u32,
    limits: Limits,
    phase_incs: u8,
    phase_decs: u8,
    phase_offset: i32,
    prev_left: u32,
}

impl DualLoop {
    pub fn new(cell: u16) -> Self {
        let period = u32::from(cell.max(1)) << FRACTIONAL_BITS;

        Self {
            period,
            period_adjust: period / 800,
            limits: Limits::percent(period, 10),
            phase_incs: 0,
            phase_decs: 0,
            phase_offset: 0,
            prev_left: 0u32.wrapping_sub(period),
        }
    }

    /// Current bitcell period, in 16.16 fixed-point ticks.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Net phase correction applied so far, in 16.16 fixed-point ticks.
    pub fn phase_offset(&self) -> i32 {
        self.phase_offset
    }

    /// Window the next edge is measured against.
    pub fn window(&self) -> Window {
        Window {
            prev_left: self.prev_left,
            curr_left: self.prev_left.wrapping_add(self.period),
        }
    }

    fn steer_frequency(&mut self) {
        if self.phase_incs + self.phase_decs < PHASE_STEPS_PER_DECISION {
            return;
        }

        let trend = i32::from(self.phase_incs) - i32::from(self.phase_decs);
        let period = i64::from(self.period);
        let adjust = i64::from(self.period_adjust);

        if trend > TREND_THRESHOLD {
            // Edges keep arriving late: the clock is fast.
            self.period = self.limits.clamp(period + adjust);
            debug!(period = self.period, "period+");
        } else if trend < -TREND_THRESHOLD {
            // Edges keep arriving early: the clock is slow.
            self.period = self.limits.clamp(period - adjust);
            debug!(period = self.period, "period-");
        }

        self.phase_incs = 0;
        self.phase_decs = 0;
    }
}

impl Recovery for DualLoop {
    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse> {
        let position = edge.fixed();

        let mut window = self.window();

        if window.is_runt(position) {
            return Left(Runt);
        }

        let zeros = window.skip_empty(position, self.period);
        let distance = position.wrapping_sub(window.curr_left);

        log.event(
            edge.timestamp,
            PhaseError::from_fixed(window.centre_error(position, self.period)),
        );

        let period = u64::from(self.period);
        let phase_adjust = (period / 8) as u32;
        let early = (period * 3 / 8) as u32;
        let late = (period * 5 / 8) as u32;

        if distance < early {
            self.phase_offset = self.phase_offset.wrapping_sub(phase_adjust as i32);
            window.curr_left = window.curr_left.wrapping_sub(phase_adjust);
            self.phase_decs += 1;
        } else if distance > late {
            self.phase_offset = self.phase_offset.wrapping_add(phase_adjust as i32);
            window.curr_left = window.curr_left.wrapping_add(phase_adjust);
            self.phase_incs += 1;
        }

        self.steer_frequency();

        // The next cell starts one (possibly updated) period after this one.
        self.prev_left = window.curr_left;

        Right(Pulse { zeros })
    }
}
