use crate::{CoreError, CoreResult, audio::wav};

use std::{panic::Location, path::Path};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavReader};
use tracing::{info, instrument};

/// Writes `source` to `destination` with its sample order reversed.
///
/// Source must be 16-bit integer mono PCM. `source` and `destination` may be
/// the same path; the destination is replaced atomically. Returns the number
/// of samples written.
#[track_caller]
#[instrument]
pub fn reverse_wav(source: &Path, destination: &Path) -> CoreResult<usize> {
    let reader = WavReader::open(source).map_err(|e| CoreError::UnsupportedFormat {
        path: source.to_path_buf(),
        reason: format!("Failed to open WAV: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let spec = reader.spec();
    if spec.channels != wav::CHANNELS
        || spec.bits_per_sample != wav::BITS_PER_SAMPLE
        || spec.sample_format != SampleFormat::Int
    {
        return Err(CoreError::UnsupportedFormat {
            path: source.to_path_buf(),
            reason: format!(
                "expected 16-bit mono PCM, found {} channel(s) at {} bits ({:?})",
                spec.channels, spec.bits_per_sample, spec.sample_format
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mut samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()
        .map_err(|e| CoreError::UnsupportedFormat {
            path: source.to_path_buf(),
            reason: format!("Failed to read samples: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    samples.reverse();
    wav::write_pcm16_wav(destination, &samples, spec.sample_rate)?;

    info!(
        sample_count = samples.len(),
        sample_rate = spec.sample_rate,
        "Recording reversed"
    );

    Ok(samples.len())
}
