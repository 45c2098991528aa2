//! Diagnostics sink for phase detector output.
//!
//! Recovery algorithms report one event per decoded one bit: the time of the
//! edge and its signed distance from where the algorithm expected it. Events
//! never influence decoding; the default sink `()` discards them.

use core::fmt;

/// Signed phase detector output for one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseError {
    /// Whole units of the algorithm's own time base.
    Ticks(i32),
    /// Fractional sample clock ticks.
    Fraction(f64),
}

impl PhaseError {
    /// Convert a 16.16 fixed-point tick distance to fractional ticks.
    pub fn from_fixed(error: i32) -> Self {
        Self::Fraction(f64::from(error) / 65536.0)
    }
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ticks(t) => write!(f, "{t}"),
            Self::Fraction(t) => write!(f, "{t:.6}"),
        }
    }
}

/// Receive phase detector events from a decode run.
///
/// The default implementation of each method ignores its input.
#[allow(unused_variables)]
pub trait PhaseLog {
    /// Set the frequency used to convert event timestamps to seconds.
    ///
    /// Timestamps are reported in ticks until this is called.
    fn set_timestamp_freq(&mut self, hz: u64) {}
    /// Record the phase error of the edge at `timestamp` ticks since the first
    /// sample.
    fn event(&mut self, timestamp: u64, error: PhaseError) {}
}

impl PhaseLog for () {}

impl<L: PhaseLog + ?Sized> PhaseLog for &mut L {
    fn set_timestamp_freq(&mut self, hz: u64) {
        (**self).set_timestamp_freq(hz);
    }

    fn event(&mut self, timestamp: u64, error: PhaseError) {
        (**self).event(timestamp, error);
    }
}

#[cfg(feature = "std")]
pub use csv_log::CsvLog;

#[cfg(feature = "std")]
mod csv_log {
    use std::{io::Write, string::ToString};

    use super::{PhaseError, PhaseLog};

    /// Write events as CSV rows under a `Timestamp,Phase Error` header.
    ///
    /// Write failures are held until [`CsvLog::finish`], so a broken log never
    /// interrupts decoding.
    ///
    /// _Requires Cargo feature `std`._
    pub struct CsvLog<W: Write> {
        writer: csv::Writer<W>,
        timestamp_freq_hz: u64,
        error: Option<csv::Error>,
    }

    impl<W: Write> CsvLog<W> {
        /// Start a log on a writer, emitting the header row.
        pub fn new(w: W) -> Result<Self, csv::Error> {
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(w);
            writer.write_record(["Timestamp", "Phase Error"])?;

            Ok(Self {
                writer,
                timestamp_freq_hz: 1,
                error: None,
            })
        }

        /// Flush the log, returning the first error seen while writing.
        pub fn finish(mut self) -> Result<W, csv::Error> {
            if let Some(err) = self.error.take() {
                return Err(err);
            }

            self.writer.flush()?;
            self.writer
                .into_inner()
                .map_err(|e| csv::Error::from(e.into_error()))
        }
    }

    impl<W: Write> PhaseLog for CsvLog<W> {
        fn set_timestamp_freq(&mut self, hz: u64) {
            self.timestamp_freq_hz = hz.max(1);
        }

        fn event(&mut self, timestamp: u64, error: PhaseError) {
            if self.error.is_some() {
                return;
            }

            let seconds = timestamp as f64 / self.timestamp_freq_hz as f64;
            let row = [std::format!("{seconds:.6}"), error.to_string()];

            if let Err(err) = self.writer.write_record(&row) {
                self.error = Some(err);
            }
        }
    }
}
