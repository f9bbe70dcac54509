use crate::{
    CoreError, HEADER_LEN, SAMPLE_RATE,
    audio::wav::{finalize_wav, payload_duration_ms, temp_path_for, wav_header, write_pcm16_wav},
};

use std::fs;

use hound::{SampleFormat, WavReader};

const PAYLOAD_LEN: u32 = 32_000;

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// WHAT: Header carries RIFF size = payload + 36 and data size = payload
/// WHY: Players reject WAVs whose chunk sizes disagree with the file
#[test]
fn given_payload_length_when_building_header_then_chunk_sizes_exact() {
    // Given: A one-second payload at 16kHz mono PCM16

    // When: Building the header
    let header = wav_header(PAYLOAD_LEN, SAMPLE_RATE);

    // Then: Magic tags and sizes match the canonical layout
    assert_eq!(&header[0..4], b"RIFF");
    assert_eq!(read_u32(&header, 4), PAYLOAD_LEN + 36);
    assert_eq!(&header[8..16], b"WAVEfmt ");
    assert_eq!(read_u32(&header, 24), SAMPLE_RATE);
    assert_eq!(read_u32(&header, 28), SAMPLE_RATE * 2);
    assert_eq!(&header[36..40], b"data");
    assert_eq!(read_u32(&header, 40), PAYLOAD_LEN);
}

/// WHAT: Finalizing raw PCM yields a WAV readable by an independent decoder
/// WHY: The header is written after capture, so it must match what was streamed
#[test]
#[allow(clippy::unwrap_used)]
fn given_raw_pcm_file_when_finalizing_then_hound_reads_every_sample() {
    // Given: A headerless PCM16 file of 1000 samples
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take.wav");
    let raw: Vec<u8> = (0..1000i16).flat_map(|s| s.to_le_bytes()).collect();
    fs::write(&path, &raw).unwrap();

    // When: Finalizing in place
    let payload_len = finalize_wav(&path, SAMPLE_RATE).unwrap();

    // Then: Samples survive unchanged behind a 44-byte header, no temp file left
    assert_eq!(payload_len, 2000);
    assert_eq!(fs::metadata(&path).unwrap().len(), 2000 + HEADER_LEN as u64);
    assert!(!temp_path_for(&path).exists());

    let reader = WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, SampleFormat::Int);
    let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, (0..1000i16).collect::<Vec<_>>());
}

/// WHAT: Finalizing a payload larger than one copy chunk keeps every byte
/// WHY: The copy is chunked; chunk boundaries must not drop or duplicate data
#[test]
#[allow(clippy::unwrap_used)]
fn given_payload_spanning_many_chunks_when_finalizing_then_sizes_match() {
    // Given: ~200KB of PCM, several copy chunks long
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.wav");
    let raw: Vec<u8> = (0..100_000u32)
        .flat_map(|i| ((i % 30_000) as i16).to_le_bytes())
        .collect();
    fs::write(&path, &raw).unwrap();

    // When: Finalizing
    finalize_wav(&path, SAMPLE_RATE).unwrap();

    // Then: Header sizes and payload bytes match the input exactly
    let bytes = fs::read(&path).unwrap();
    assert_eq!(read_u32(&bytes, 4), raw.len() as u32 + 36);
    assert_eq!(read_u32(&bytes, 40), raw.len() as u32);
    assert_eq!(&bytes[HEADER_LEN..], raw.as_slice());
}

/// WHAT: Finalizing a missing file reports a Finalize error
/// WHY: Failures must surface as typed errors, never a half-written WAV
#[test]
#[allow(clippy::unwrap_used)]
fn given_missing_file_when_finalizing_then_finalize_error() {
    // Given: A path with nothing behind it
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.wav");

    // When: Finalizing
    let result = finalize_wav(&path, SAMPLE_RATE);

    // Then: Finalize error and no stray files
    assert!(matches!(result, Err(CoreError::Finalize { .. })));
    assert!(!path.exists());
    assert!(!temp_path_for(&path).exists());
}

/// WHAT: Writing a complete WAV from samples replaces the target atomically
/// WHY: Reversal writes through this path and may overwrite its own source
#[test]
#[allow(clippy::unwrap_used)]
fn given_existing_file_when_writing_samples_then_replaced_with_new_audio() {
    // Given: A stale file at the destination
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    fs::write(&path, b"stale").unwrap();

    // When: Writing 320 samples at 8kHz
    let samples = vec![-1200i16; 320];
    write_pcm16_wav(&path, &samples, 8_000).unwrap();

    // Then: Decoder sees the new samples at the requested rate
    let reader = WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 8_000);
    assert_eq!(reader.duration(), 320);
    assert!(!temp_path_for(&path).exists());
}

/// WHAT: Sample-written WAVs carry the same canonical header as finalized ones
/// WHY: Reversed clips and recordings must be read the same way downstream
#[test]
#[allow(clippy::unwrap_used)]
fn given_samples_when_writing_wav_then_canonical_header_and_le_payload() {
    // Given: Three samples at the recording rate
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");

    // When: Writing them
    write_pcm16_wav(&path, &[1, -2, 300], SAMPLE_RATE).unwrap();

    // Then: 44-byte canonical header followed by the little-endian payload
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), HEADER_LEN + 6);
    assert_eq!(bytes[..HEADER_LEN], wav_header(6, SAMPLE_RATE));
    assert_eq!(bytes[HEADER_LEN..], [1, 0, 0xFE, 0xFF, 0x2C, 0x01]);
}

/// WHAT: A zero sample rate is refused before anything is written
/// WHY: A rate of zero has no meaningful byte rate or duration
#[test]
#[allow(clippy::unwrap_used)]
fn given_zero_sample_rate_when_writing_wav_then_finalize_error_and_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");

    let result = write_pcm16_wav(&path, &[1, 2], 0);

    assert!(matches!(result, Err(CoreError::Finalize { .. })));
    assert!(!path.exists());
    assert!(!temp_path_for(&path).exists());
}

/// WHAT: Payload byte counts convert to milliseconds at the recording rate
/// WHY: Attempt durations fed to the scorer are derived from the payload
#[test]
fn given_payload_bytes_when_computing_duration_then_milliseconds_returned() {
    assert_eq!(payload_duration_ms(32_000, SAMPLE_RATE), 1_000);
    assert_eq!(payload_duration_ms(3_200, SAMPLE_RATE), 100);
    assert_eq!(payload_duration_ms(0, SAMPLE_RATE), 0);
    assert_eq!(payload_duration_ms(32_000, 0), 0);
}
