//! Greaseweazle-style coarse PLLs.
//!
//! Both adjust the bitcell width by a fixed percentage after each accepted
//! edge. While few zeros separate edges the loop is considered locked and
//! chases the residual phase; after a long run of zeros it relaxes toward the
//! nominal width instead. The width never leaves ±10% of nominal.

use either::Either::{self, Left, Right};
use tracing::debug;

use crate::log::{PhaseError, PhaseLog};

use super::{Edge, FRACTIONAL_BITS, Pulse, Recovery, Runt};

/// Longest zero run after which the loop is still considered locked.
const LOCKED_MAX_ZEROS: u32 = 3;

/// Adjustment range around the nominal width, in percent.
const RANGE_PCT: i64 = 10;

/// Whole-tick PLL that discards residual phase at every edge.
///
/// Width nudges are 1% of the residual phase, truncated to whole ticks.
#[derive(Debug, Clone)]
pub struct FallbackPll {
    nominal: i32,
    min: i32,
    max: i32,
    cell: i32,
    prev: u16,
}

impl FallbackPll {
    pub fn new(cell: u16) -> Self {
        let nominal = i32::from(cell.max(1));
        let range = nominal * RANGE_PCT as i32 / 100;

        Self {
            nominal,
            min: nominal - range,
            max: nominal + range,
            cell: nominal,
            prev: 0,
        }
    }
}

impl Recovery for FallbackPll {
    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse> {
        let mut curr = i32::from(edge.sample.wrapping_sub(self.prev));

        if curr < self.cell / 2 {
            return Left(Runt);
        }
        self.prev = edge.sample;

        let mut zeros = 0;
        loop {
            curr -= self.cell;
            if curr <= self.cell / 2 {
                break;
            }
            zeros += 1;
        }

        log.event(edge.timestamp, PhaseError::Ticks(curr));

        self.cell += if zeros <= LOCKED_MAX_ZEROS {
            curr / 100
        } else {
            (self.nominal - self.cell) / 100
        };

        if self.cell > self.max || self.cell < self.min {
            self.cell = self.cell.clamp(self.min, self.max);
            debug!(cell = self.cell, "bitcell width clamped");
        }

        Right(Pulse { zeros })
    }
}

/// Fixed-point PLL that carries part of the residual phase to the next edge.
///
/// Runts are merged forward: their interval accumulates into the next edge.
#[derive(Debug, Clone)]
pub struct DefaultPll {
    nominal: i64,
    min: i64,
    max: i64,
    clock: i64,
    ticks: i64,
    prev: u16,
}

impl DefaultPll {
    /// Width nudge, in percent of the residual phase or of the distance to
    /// nominal.
    pub const PERIOD_ADJ_PCT: i64 = 5;
    /// Share of the residual phase corrected at each edge, in percent.
    pub const PHASE_ADJ_PCT: i64 = 60;

    pub fn new(cell: u16) -> Self {
        let nominal = i64::from(cell.max(1)) << FRACTIONAL_BITS;

        Self {
            nominal,
            min: nominal * (100 - RANGE_PCT) / 100,
            max: nominal * (100 + RANGE_PCT) / 100,
            clock: nominal,
            ticks: 0,
            prev: 0,
        }
    }
}

impl Recovery for DefaultPll {
    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse> {
        self.ticks += i64::from(edge.sample.wrapping_sub(self.prev)) << FRACTIONAL_BITS;
        self.prev = edge.sample;

        if self.ticks < self.clock / 2 {
            return Left(Runt);
        }

        let mut zeros = 0;
        loop {
            self.ticks -= self.clock;
            if self.ticks < self.clock / 2 {
                break;
            }
            zeros += 1;
        }

        log.event(edge.timestamp, PhaseError::from_fixed(self.ticks as i32));

        self.clock += if zeros <= LOCKED_MAX_ZEROS {
            self.ticks * Self::PERIOD_ADJ_PCT / 100
        } else {
            (self.nominal - self.clock) * Self::PERIOD_ADJ_PCT / 100
        };

        if self.clock > self.max || self.clock < self.min {
            self.clock = self.clock.clamp(self.min, self.max);
            debug!(clock = self.clock, "bitcell width clamped");
        }

        self.ticks = self.ticks * (100 - Self::PHASE_ADJ_PCT) / 100;

        Right(Pulse { zeros })
    }
}
