//! Fixed-width bitcell recovery, without feedback.

use either::Either::{self, Left, Right};

use crate::log::{PhaseError, PhaseLog};

use super::{Edge, Pulse, Recovery, Runt};

/// FlashFloppy v3.41: a constant bitcell with a hysteresis window.
///
/// An interval longer than one and a half cells sheds whole cells as zeros
/// until it fits the window. Every edge is accepted.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    cell: u32,
    window: u32,
    prev: u16,
}

impl Hysteresis {
    pub fn new(cell: u16) -> Self {
        let cell = u32::from(cell.max(1));

        Self {
            cell,
            window: cell + (cell >> 1),
            prev: 0,
        }
    }
}

impl Recovery for Hysteresis {
    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse> {
        let mut curr = u32::from(edge.sample.wrapping_sub(self.prev));
        self.prev = edge.sample;

        let mut zeros = 0;
        while curr > self.window {
            curr -= self.cell;
            zeros += 1;
        }

        log.event(
            edge.timestamp,
            PhaseError::Ticks(curr as i32 - self.cell as i32),
        );

        Right(Pulse { zeros })
    }
}

/// FlashFloppy master: a constant bitcell that merges runts forward.
///
/// An edge arriving within half a cell of the last accepted edge is ignored,
/// and the interval to the next edge is measured from the last accepted one.
#[derive(Debug, Clone)]
pub struct RuntMerge {
    cell: i32,
    prev: u16,
}

impl RuntMerge {
    pub fn new(cell: u16) -> Self {
        Self {
            cell: i32::from(cell.max(1)),
            prev: 0,
        }
    }
}

impl Recovery for RuntMerge {
    fn edge(&mut self, edge: Edge, log: &mut impl PhaseLog) -> Either<Runt, Pulse> {
        let mut curr = i32::from(edge.sample.wrapping_sub(self.prev)) - (self.cell >> 1);

        if curr < 0 {
            return Left(Runt);
        }
        self.prev = edge.sample;

        let mut zeros = 0;
        loop {
            curr -= self.cell;
            if curr <= 0 {
                break;
            }
            zeros += 1;
        }

        log.event(edge.timestamp, PhaseError::Ticks(curr + (self.cell >> 1)));

        Right(Pulse { zeros })
    }
}
