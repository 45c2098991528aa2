//! Clock recovery algorithms.
//!
//! Every algorithm consumes flux transition timestamps one at a time and
//! answers with either a [`Runt`] (the edge is discarded and nothing is
//! emitted) or a [`Pulse`]: some number of empty bitcells followed by the
//! bitcell holding the edge. [`Decisions`] expands this into a lazy sequence of
//! bit decisions, and [`decode`] packs that sequence into a [`Track`].
//!
//! # Architecture
//!
//! Algorithms share a single contract, [`Recovery`], and differ only in their
//! control law: how the bitcell width and phase react to where an edge lands.
//! Algorithms that track the bitcell grid in 16.16 fixed point share the
//! [`Window`] helper, which holds the left edges of the previous and current
//! bitcells and implements runt rejection and empty cell counting. All
//! position arithmetic wraps, so timer rollover is handled by computing
//! distances rather than comparing positions.
//!
//! State is owned by the algorithm value. Construct a fresh one for each run.

pub mod dual_loop;
pub mod fixed;
pub mod heuristic;
pub mod nco;
pub mod pi;

use core::iter::FusedIterator;

use either::Either::{self, Left, Right};
use tracing::trace;

use crate::{
    log::PhaseLog,
    pack::{BitPacker, PackError, Track, WordBuffer},
};

/// Number of fractional bits in fixed-point positions and widths.
pub const FRACTIONAL_BITS: u32 = 16;

/// One flux transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Sample clock value at the transition.
    pub sample: u16,
    /// Ticks elapsed since the first sample of the run.
    pub timestamp: u64,
}

impl Edge {
    /// The sample as a 16.16 fixed-point position, wrapping with the timer.
    pub fn fixed(&self) -> u32 {
        u32::from(self.sample) << FRACTIONAL_BITS
    }
}

/// An edge discarded as noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Runt;

/// Bitcells closed by an accepted edge: `zeros` empty cells, then a one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub zeros: u32,
}

/// A clock recovery algorithm.
pub trait Recovery {
    /// Frequency against which logged event timestamps are expressed.
    const TIMESTAMP_FREQ_HZ: u64 = 1;

    /// Process the next edge.
    ///
    /// Implementations report one event to `log` per accepted edge.
    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse>;
}

/// Left edges of the previous and current bitcells, in 16.16 fixed point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub prev_left: u32,
    pub curr_left: u32,
}

impl Window {
    /// A window placing `edge` at the centre of the current bitcell.
    pub fn centred(edge: u32, width: u32) -> Self {
        let curr_left = edge.wrapping_sub(width / 2);

        Self {
            prev_left: curr_left.wrapping_sub(width),
            curr_left,
        }
    }

    /// Whether `edge` falls before the end of the previous bitcell.
    pub fn is_runt(&self, edge: u32) -> bool {
        edge.wrapping_sub(self.prev_left) < self.curr_left.wrapping_sub(self.prev_left)
    }

    /// Move the current bitcell forward over every whole cell of `width`
    /// elapsed before `edge`, returning how many were skipped.
    ///
    /// Equivalent to repeatedly stepping while the edge is more than `width`
    /// past the current left edge.
    pub fn skip_empty(&mut self, edge: u32, width: u32) -> u32 {
        let distance = edge.wrapping_sub(self.curr_left);
        let zeros = distance.saturating_sub(1).checked_div(width).unwrap_or(0);
        self.curr_left = self.curr_left.wrapping_add(zeros.wrapping_mul(width));
        zeros
    }

    /// Signed distance of `edge` from the centre of the current bitcell.
    pub fn centre_error(&self, edge: u32, width: u32) -> i32 {
        edge.wrapping_sub(self.curr_left.wrapping_add(width / 2)) as i32
    }

    /// Make the cell after the current one current.
    pub fn advance(&mut self, width: u32) {
        self.prev_left = self.curr_left;
        self.curr_left = self.curr_left.wrapping_add(width);
    }
}

/// Proportional and integral gains, each an integer ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gains {
    pub p_mul: i64,
    pub p_div: i64,
    pub i_mul: i64,
    pub i_div: i64,
}

impl Gains {
    /// Gains from ratios, or `None` if a divisor is zero.
    pub fn new(p_mul: u32, p_div: u32, i_mul: u32, i_div: u32) -> Option<Self> {
        if p_div == 0 || i_div == 0 {
            return None;
        }

        Some(Self {
            p_mul: p_mul.into(),
            p_div: p_div.into(),
            i_mul: i_mul.into(),
            i_div: i_div.into(),
        })
    }

    /// Sum of the proportional and integral terms, each truncated. The sum
    /// saturates.
    pub fn control(&self, error: i32, integral: i32) -> i64 {
        let p_term = i64::from(error).saturating_mul(self.p_mul) / self.p_div;
        let i_term = i64::from(integral).saturating_mul(self.i_mul) / self.i_div;
        p_term.saturating_add(i_term)
    }

    /// `nominal` offset by the control output.
    pub fn steer(&self, nominal: u32, error: i32, integral: i32) -> i64 {
        i64::from(nominal).saturating_add(self.control(error, integral))
    }
}

/// Inclusive range a recovered period or rate is held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: u32,
}

impl Limits {
    /// Any non-zero value.
    pub const UNBOUNDED: Self = Self {
        min: 1,
        max: u32::MAX,
    };

    /// Within `pct` percent either side of `nominal`.
    pub fn percent(nominal: u32, pct: u32) -> Self {
        let nominal = u64::from(nominal);
        let min = nominal * u64::from(100u32.saturating_sub(pct)) / 100;
        let max = nominal * (100 + u64::from(pct)) / 100;

        Self {
            min: (min as u32).max(1),
            max: max.min(u64::from(u32::MAX)) as u32,
        }
    }

    /// Bring `value` into range.
    pub fn clamp(&self, value: i64) -> u32 {
        value.clamp(i64::from(self.min), i64::from(self.max)) as u32
    }
}

/// Lazy sequence of bit decisions recovered from a sequence of samples.
///
/// Each accepted edge yields its empty cells as `false`, then `true` for its
/// own cell. Runts yield nothing.
#[derive(Debug)]
pub struct Decisions<'a, R, L> {
    recovery: R,
    samples: core::slice::Iter<'a, u16>,
    log: L,
    prev: Option<u16>,
    timestamp: u64,
    zeros: u32,
    one: bool,
}

impl<'a, R: Recovery, L: PhaseLog> Decisions<'a, R, L> {
    /// Begin recovering bitcells from `samples`.
    pub fn new(recovery: R, samples: &'a [u16], mut log: L) -> Self {
        log.set_timestamp_freq(R::TIMESTAMP_FREQ_HZ);

        Self {
            recovery,
            samples: samples.iter(),
            log,
            prev: None,
            timestamp: 0,
            zeros: 0,
            one: false,
        }
    }

    /// Release the algorithm state and the log.
    pub fn into_parts(self) -> (R, L) {
        (self.recovery, self.log)
    }
}

impl<R: Recovery, L: PhaseLog> Iterator for Decisions<'_, R, L> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        loop {
            if self.zeros != 0 {
                self.zeros -= 1;
                return Some(false);
            }

            if self.one {
                self.one = false;
                return Some(true);
            }

            let &sample = self.samples.next()?;

            if let Some(prev) = self.prev {
                self.timestamp += u64::from(sample.wrapping_sub(prev));
            }
            self.prev = Some(sample);

            let edge = Edge {
                sample,
                timestamp: self.timestamp,
            };

            match self.recovery.edge(edge, &mut self.log) {
                Left(Runt) => trace!(sample, timestamp = self.timestamp, "runt"),
                Right(Pulse { zeros }) => {
                    self.zeros = zeros;
                    self.one = true;
                }
            }
        }
    }
}

impl<R: Recovery, L: PhaseLog> FusedIterator for Decisions<'_, R, L> {}

/// Recover the bitcells of `samples` and pack them into `buffer`.
///
/// Fails if the bitcells do not fit in the buffer.
pub fn decode<R: Recovery>(
    recovery: R,
    samples: &[u16],
    buffer: WordBuffer,
    log: impl PhaseLog,
) -> Result<Track, PackError> {
    let mut packer = BitPacker::new(buffer);
    packer.extend(Decisions::new(recovery, samples, log))?;
    Ok(packer.finish())
}
