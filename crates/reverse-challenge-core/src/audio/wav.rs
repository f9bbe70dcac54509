//! Canonical PCM WAV writing.
//!
//! Capture streams headerless PCM to disk; once the payload length is known
//! the file is rewritten behind a 44-byte header into a sibling temp file
//! that is then renamed over the original.

use crate::{CoreError, CoreResult};

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufReader, BufWriter, Read, Write},
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info, instrument};

/// Sample rate of every recording this crate produces.
pub const SAMPLE_RATE: u32 = 16_000;
/// Recordings are mono.
pub const CHANNELS: u16 = 1;
/// Recordings are signed 16-bit little-endian PCM.
pub const BITS_PER_SAMPLE: u16 = 16;
/// Size of the canonical RIFF/WAVE/fmt/data header.
pub const HEADER_LEN: usize = 44;

pub(crate) const BYTES_PER_SAMPLE: u64 = (BITS_PER_SAMPLE / 8) as u64;
const COPY_CHUNK_BYTES: usize = 64 * 1024;
const MAX_PAYLOAD_LEN: u64 = u32::MAX as u64 - 36;

/// Builds the canonical header for a mono PCM16 payload of `payload_len` bytes.
pub fn wav_header(payload_len: u32, sample_rate: u32) -> [u8; HEADER_LEN] {
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * u32::from(block_align);

    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&payload_len.saturating_add(36).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&payload_len.to_le_bytes());
    header
}

/// Milliseconds of audio held in a PCM16 mono payload.
pub fn payload_duration_ms(payload_len: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    payload_len / BYTES_PER_SAMPLE * 1000 / u64::from(sample_rate)
}

pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Rewrites the raw PCM file at `path` as a WAV, in place.
///
/// The payload is copied in fixed-size chunks so the recording is never held
/// in memory. Returns the payload length in bytes.
#[track_caller]
#[instrument]
pub(crate) fn finalize_wav(path: &Path, sample_rate: u32) -> CoreResult<u64> {
    let finalize_err = |source: io::Error| CoreError::Finalize {
        path: path.to_path_buf(),
        source,
        location: ErrorLocation::from(Location::caller()),
    };

    let payload_len = fs::metadata(path).map_err(finalize_err)?.len();
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(finalize_err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("payload of {} bytes exceeds WAV limit", payload_len),
        )));
    }

    let temp_path = temp_path_for(path);
    let header = wav_header(payload_len as u32, sample_rate);

    if let Err(e) = copy_behind_header(path, &temp_path, &header) {
        let _ = fs::remove_file(&temp_path);
        return Err(finalize_err(e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        finalize_err(e)
    })?;

    info!(path = ?path, payload_len, "WAV finalized (atomic rename)");

    Ok(payload_len)
}

fn copy_behind_header(raw_path: &Path, temp_path: &Path, header: &[u8]) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(raw_path)?);
    let mut writer = BufWriter::new(File::create(temp_path)?);

    writer.write_all(header)?;

    let mut chunk = vec![0u8; COPY_CHUNK_BYTES];
    let mut copied = 0u64;
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        writer.write_all(&chunk[..read])?;
        copied += read as u64;
    }

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    debug!(copied, "PCM payload copied behind header");

    Ok(())
}

/// Writes `samples` as a complete mono PCM16 WAV at `path` via temp-then-rename.
///
/// Encoding goes through `hound`; the payload is small enough to hold in memory.
#[track_caller]
#[instrument(skip(samples), fields(sample_count = samples.len()))]
pub fn write_pcm16_wav(path: &Path, samples: &[i16], sample_rate: u32) -> CoreResult<()> {
    let finalize_err = |source: io::Error| CoreError::Finalize {
        path: path.to_path_buf(),
        source,
        location: ErrorLocation::from(Location::caller()),
    };

    if sample_rate == 0 {
        return Err(finalize_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "sample rate is zero",
        )));
    }

    let payload_len = samples.len() as u64 * BYTES_PER_SAMPLE;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(finalize_err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("payload of {} bytes exceeds WAV limit", payload_len),
        )));
    }

    let temp_path = temp_path_for(path);
    let format = WavSpec {
        channels: CHANNELS,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let write = || -> io::Result<()> {
        let mut writer = WavWriter::create(&temp_path, format).map_err(hound_to_io)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(hound_to_io)?;
        }
        writer.finalize().map_err(hound_to_io)?;
        OpenOptions::new().write(true).open(&temp_path)?.sync_all()?;
        fs::rename(&temp_path, path)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        finalize_err(e)
    })?;

    debug!(path = ?path, "WAV written (atomic rename)");

    Ok(())
}

fn hound_to_io(error: hound::Error) -> io::Error {
    match error {
        hound::Error::IoError(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
