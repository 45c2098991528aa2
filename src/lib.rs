#![no_std]

//! Clock recovery for floppy disk write streams, and serialization of the
//! recovered bitcells into HFE track images.
//!
//! A floppy emulator samples the write data line and records the timer value
//! of every flux transition. Fluxcell turns such a sequence of timestamps back
//! into the bitcells the host controller meant to write, using one of a family
//! of interchangeable clock recovery algorithms, and lays the result out as a
//! single-track HFE image.
//!
//! Most users should begin with [`registry`], which selects an algorithm by
//! name and binds its gain parameters, and the helpers in `convert`. The
//! algorithms themselves live in [`recovery`] and can be driven directly.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable file conversion and the CSV diagnostics log (default).
//! - `cli`: build the `flux2hfe` command line tool.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
pub mod convert;
pub mod hfe;
pub mod log;
pub mod pack;
pub mod params;
pub mod recovery;
pub mod registry;
pub mod samples;

/// Frequency of the sample clock timestamping each flux transition.
pub const SAMPLE_CLOCK_HZ: u64 = 72_000_000;

/// Nominal bitcell width, in sample clock ticks, for a data rate in kbps.
///
/// Each data bit occupies two bitcells on the medium.
pub fn bitcell_ticks(bitrate_kbps: u16) -> u16 {
    (36_000 / u32::from(bitrate_kbps.max(1))).max(1) as u16
}
