use crate::audio::resampler::StreamResampler;

// Test constants
const INPUT_SAMPLE_RATE: u32 = 48000;
const OUTPUT_SAMPLE_RATE: u32 = 16000;
const ONE_SECOND_INPUT_SAMPLES: usize = INPUT_SAMPLE_RATE as usize;
const ONE_SECOND_OUTPUT_SAMPLES: usize = OUTPUT_SAMPLE_RATE as usize;
const LENGTH_TOLERANCE: usize = 100;
const TEST_SIGNAL_AMPLITUDE: f32 = 0.5;
const DEVICE_BUFFER: usize = 480;
const TONE_FREQUENCY_FACTOR: f32 = 0.1;
const MAX_AMPLITUDE: f32 = 1.5;

/// WHAT: One second pushed in device-sized buffers yields one second at 16kHz
/// WHY: Capture feeds the resampler incrementally; nothing may be lost at the end
#[test]
#[allow(clippy::unwrap_used)]
fn given_48khz_buffers_when_streaming_to_16khz_then_total_length_matches_duration() {
    // Given: Resampler configured for 48kHz -> 16kHz
    let mut resampler = StreamResampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();
    let input = vec![TEST_SIGNAL_AMPLITUDE; ONE_SECOND_INPUT_SAMPLES];

    // When: Pushing 10ms buffers then flushing
    let mut output = Vec::new();
    for buffer in input.chunks(DEVICE_BUFFER) {
        output.extend(resampler.push(buffer).unwrap());
    }
    output.extend(resampler.finish().unwrap());

    // Then: Output is approximately 1 second at 16kHz and finite
    assert!(
        output.len().abs_diff(ONE_SECOND_OUTPUT_SAMPLES) < LENGTH_TOLERANCE,
        "Expected ~{} samples, got {}",
        ONE_SECOND_OUTPUT_SAMPLES,
        output.len()
    );
    assert!(output.iter().all(|&s| s.is_finite())); // No NaN/Inf
}

/// WHAT: Empty input produces no output, even after flushing
/// WHY: Edge case handling for a session stopped before any audio arrived
#[test]
#[allow(clippy::unwrap_used)]
fn given_empty_samples_when_streaming_then_empty_output() {
    // Given: Resampler and empty input
    let mut resampler = StreamResampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();

    // When: Pushing nothing and flushing
    let pushed = resampler.push(&[]).unwrap();
    let flushed = resampler.finish().unwrap();

    // Then: Both are empty
    assert!(pushed.is_empty());
    assert!(flushed.is_empty());
}

/// WHAT: Input shorter than one FFT chunk is held until the chunk fills
/// WHY: Device buffers are far smaller than the resampler's chunk size
#[test]
#[allow(clippy::unwrap_used)]
fn given_partial_chunk_when_pushing_then_output_deferred_until_chunk_complete() {
    // Given: A fresh resampler
    let mut resampler = StreamResampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();

    // When: Pushing 500 then 600 samples
    let first = resampler.push(&[TEST_SIGNAL_AMPLITUDE; 500]).unwrap();
    let second = resampler.push(&[TEST_SIGNAL_AMPLITUDE; 600]).unwrap();

    // Then: Only the push that completed a chunk produced output
    assert!(first.is_empty());
    assert!(!second.is_empty());
}

/// WHAT: Resampling a tone keeps samples bounded
/// WHY: Validates that audio quality is maintained through resampling
#[test]
#[allow(clippy::unwrap_used)]
fn given_tone_signal_when_streaming_then_output_bounded() {
    // Given: Resampler and a simple tone signal
    let mut resampler = StreamResampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();
    let input: Vec<f32> = (0..ONE_SECOND_INPUT_SAMPLES / 10)
        .map(|i| (i as f32 * TONE_FREQUENCY_FACTOR).sin())
        .collect();

    // When: Resampling the signal
    let mut output = resampler.push(&input).unwrap();
    output.extend(resampler.finish().unwrap());

    // Then: Output has the expected length and all samples are finite
    assert!(output.len().abs_diff(ONE_SECOND_OUTPUT_SAMPLES / 10) < LENGTH_TOLERANCE);
    assert!(
        output
            .iter()
            .all(|&s| s.is_finite() && s.abs() <= MAX_AMPLITUDE)
    );
}
