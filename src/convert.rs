//! Conversion of flux sample files into image files.
//!
//! _Requires Cargo feature `std`._

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    vec::Vec,
};

use thiserror::Error;
use tracing::{info, instrument};

use crate::{
    bitcell_ticks,
    hfe::{self, ImageError},
    log::{CsvLog, PhaseLog},
    pack::{PackError, WordBuffer},
    registry::{Config, SelectionError},
    samples,
};

/// Suffix stripped from sample file names when naming outputs.
pub const SAMPLES_SUFFIX: &str = ".ff_samples";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Read a file of little-endian samples.
pub fn read_samples(path: impl AsRef<Path>) -> Result<Vec<u16>, Error> {
    Ok(samples::from_le_bytes(&fs::read(path)?))
}

/// Decode `samples` at a data rate and lay out the image.
///
/// Returns `None` if no bitcells were recovered.
pub fn convert(
    config: &Config,
    bitrate_kbps: u16,
    samples: &[u16],
    log: impl PhaseLog,
) -> Result<Option<Vec<u8>>, Error> {
    let cell = bitcell_ticks(bitrate_kbps);
    let track = config.decode(cell, samples, WordBuffer::default(), log)?;

    if track.bit_count == 0 {
        return Ok(None);
    }

    Ok(Some(hfe::serialize(&track, bitrate_kbps)?))
}

/// Paths written by a file conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outputs {
    pub image: PathBuf,
    pub data_log: PathBuf,
}

impl Outputs {
    /// Name outputs `<stem>.<kbps>_<algorithm>.{hfe,csv}` in `out_dir`, where
    /// the stem is the sample file name less any [`SAMPLES_SUFFIX`].
    pub fn new(samples: &Path, out_dir: &Path, bitrate_kbps: u16, algorithm: &str) -> Self {
        let name = samples
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        let stem = name.strip_suffix(SAMPLES_SUFFIX).unwrap_or(&*name);

        let with_extension =
            |ext: &str| out_dir.join(std::format!("{stem}.{bitrate_kbps}_{algorithm}.{ext}"));

        Self {
            image: with_extension("hfe"),
            data_log: with_extension("csv"),
        }
    }
}

/// Convert a sample file using the algorithm selected by `algorithm`,
/// optionally logging phase errors alongside the image.
///
/// Returns the image path, or `None` if no bitcells were recovered and no
/// image was written.
#[instrument(skip_all, fields(samples = %samples.display(), algorithm = algorithm))]
pub fn convert_file(
    samples: &Path,
    out_dir: &Path,
    bitrate_kbps: u16,
    algorithm: &str,
    data_log: bool,
) -> Result<Option<PathBuf>, Error> {
    let config = algorithm.parse::<Config>()?;
    let outputs = Outputs::new(samples, out_dir, bitrate_kbps, algorithm);
    let samples = read_samples(samples)?;

    info!(count = samples.len(), "read samples");

    let image = if data_log {
        let mut log = CsvLog::new(File::create(&outputs.data_log)?)?;
        let image = convert(&config, bitrate_kbps, &samples, &mut log)?;
        log.finish()?;
        image
    } else {
        convert(&config, bitrate_kbps, &samples, ())?
    };

    let Some(image) = image else {
        return Ok(None);
    };

    fs::write(&outputs.image, image)?;
    info!(path = %outputs.image.display(), "wrote image");

    Ok(Some(outputs.image))
}
