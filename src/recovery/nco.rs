//! Numerically controlled oscillator loops.
//!
//! Rather than steering the bitcell width directly, these loops steer a rate
//! relative to the sample clock (1.0 in 16.16 fixed point), and derive the
//! bitcell width by scaling the nominal width with it.

use either::Either::{self, Left, Right};
use tracing::debug;

use crate::{
    SAMPLE_CLOCK_HZ,
    log::{PhaseError, PhaseLog},
};

use super::{Edge, FRACTIONAL_BITS, Gains, Limits, Pulse, Recovery, Runt, Window};

/// Unity rate.
const NOMINAL_RATE: u32 = 1 << FRACTIONAL_BITS;

/// Loop gains tuned at a 72 MHz sample clock, with a damping factor of one.
///
/// For natural frequency `f_n`, `w_n * Ts = 2π f_n / 72 MHz`; the proportional
/// gain is `2 w_n Ts` and the integral gain `(w_n Ts)²`, each rounded to a
/// power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// `f_n` = 178 kHz.
    Nco178k,
    /// `f_n` = 358 kHz.
    Nco358k,
    /// `f_n` = 715 kHz.
    Nco715k,
}

impl Preset {
    pub fn gains(self) -> Gains {
        let (p_div, i_div) = match self {
            Self::Nco178k => (32, 4096),
            Self::Nco358k => (16, 1024),
            Self::Nco715k => (8, 256),
        };

        Gains {
            p_mul: 1,
            p_div,
            i_mul: 1,
            i_div,
        }
    }
}

/// Oscillator whose phase step scales the bitcell width.
///
/// Phase error is measured in sample ticks. The next cell begins where the
/// current one ends under the step in effect before the update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStep {
    ticks: u32,
    gains: Gains,
    limits: Limits,
    step: u32,
    integral: i32,
    window: Option<Window>,
}

impl PhaseStep {
    /// Create a loop around a nominal width of `cell` ticks.
    ///
    /// Without `limits`, the phase step is only kept non-zero.
    pub fn new(cell: u16, gains: Gains, limits: Option<Limits>) -> Self {
        Self {
            ticks: u32::from(cell.max(1)),
            gains,
            limits: limits.unwrap_or(Limits::UNBOUNDED),
            step: NOMINAL_RATE,
            integral: 0,
            window: None,
        }
    }

    /// A loop with fixed preset gains and no limits.
    pub fn preset(cell: u16, preset: Preset) -> Self {
        Self::new(cell, preset.gains(), None)
    }

    /// Current phase step, relative to unity in 16.16 fixed point.
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Accumulated phase error.
    pub fn integral(&self) -> i32 {
        self.integral
    }

    /// Current bitcell window, once the first edge has been seen.
    pub fn window(&self) -> Option<Window> {
        self.window
    }
}

impl Recovery for PhaseStep {
    const TIMESTAMP_FREQ_HZ: u64 = SAMPLE_CLOCK_HZ;

    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse> {
        let width = self.step.wrapping_mul(self.ticks);
        let position = edge.fixed();

        let window = self.window.get_or_insert_with(|| {
            debug!(sample = edge.sample, "first edge");
            Window::centred(position, width)
        });

        if window.is_runt(position) {
            return Left(Runt);
        }

        let zeros = window.skip_empty(position, width);
        let distance = position.wrapping_sub(window.curr_left) as i32;
        let error = distance.wrapping_sub(width as i32 / 2) / self.ticks as i32;

        log.event(edge.timestamp, PhaseError::Ticks(error));

        window.advance(width);

        self.integral = self.integral.saturating_add(error);
        self.step = self.limits.clamp(self.gains.steer(NOMINAL_RATE, error, self.integral));

        Right(Pulse { zeros })
    }
}

/// Oscillator tracking edges in its own time base, with its period held
/// within ±1/8 of the sample clock.
///
/// The first edge is placed in the middle of the tenth bitcell, so a run opens
/// with nine zeros. The next cell begins one updated period after the left
/// edge of the cell holding the last edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    ticks: u16,
    gains: Gains,
    period: u32,
    integral: i32,
    prev_sample: u16,
    prev_left: u32,
    prev_edge: u32,
    primed: bool,
}

impl Period {
    /// Cells between the start of the run and the first edge.
    pub const LEAD_IN_CELLS: u16 = 10;

    /// Range the period is held to.
    pub const LIMITS: Limits = Limits {
        min: NOMINAL_RATE - NOMINAL_RATE / 8,
        max: NOMINAL_RATE + NOMINAL_RATE / 8,
    };

    pub fn new(cell: u16, gains: Gains) -> Self {
        Self {
            ticks: cell.max(1),
            gains,
            period: NOMINAL_RATE,
            integral: 0,
            prev_sample: 0,
            prev_left: 0,
            prev_edge: 0,
            primed: false,
        }
    }

    /// Current period, relative to the sample clock in 16.16 fixed point.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Accumulated phase error.
    pub fn integral(&self) -> i32 {
        self.integral
    }

    /// Window the next edge is measured against, in the oscillator's time
    /// base, once the first edge has been seen.
    pub fn window(&self) -> Option<Window> {
        self.primed.then(|| Window {
            prev_left: self.prev_left,
            curr_left: self.prev_left.wrapping_add(self.width()),
        })
    }

    fn width(&self) -> u32 {
        u32::from(self.ticks).wrapping_mul(self.period)
    }
}

impl Recovery for Period {
    const TIMESTAMP_FREQ_HZ: u64 = SAMPLE_CLOCK_HZ;

    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse> {
        let width = self.width();

        if !self.primed {
            debug!(sample = edge.sample, "first edge");
            self.prev_sample = edge
                .sample
                .wrapping_sub(Self::LEAD_IN_CELLS.wrapping_mul(self.ticks));
            self.prev_left = 0;
            self.prev_edge = width / 2;
            self.primed = true;
        }

        // Edges are tracked relative to the last accepted one, so that the
        // oscillator's time base wraps independently of the sample clock.
        let duration = edge.sample.wrapping_sub(self.prev_sample);
        let position = self
            .prev_edge
            .wrapping_add(u32::from(duration) * NOMINAL_RATE);

        let mut window = Window {
            prev_left: self.prev_left,
            curr_left: self.prev_left.wrapping_add(width),
        };

        if window.is_runt(position) {
            return Left(Runt);
        }

        let zeros = window.skip_empty(position, width);
        let error = window.centre_error(position, width);

        log.event(edge.timestamp, PhaseError::from_fixed(error));

        self.integral = self.integral.saturating_add(error);
        self.period = Self::LIMITS.clamp(self.gains.steer(NOMINAL_RATE, error, self.integral));

        self.prev_left = window.curr_left;
        self.prev_edge = position;
        self.prev_sample = edge.sample;

        Right(Pulse { zeros })
    }
}
