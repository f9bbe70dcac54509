use crate::{CoreError, CoreResult};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

const CHUNK_SIZE: usize = 1024;

/// Incremental mono resampler fed with arbitrarily sized capture buffers.
///
/// Input is queued until a full FFT chunk is available; `finish` pads and
/// flushes whatever remains so nothing captured is dropped.
pub struct StreamResampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    pending: Vec<f32>,
    consumed: u64,
    produced: u64,
}

impl StreamResampler {
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32) -> CoreResult<Self> {
        let sub_chunks = 2;

        let resampler = Fft::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            CHUNK_SIZE,
            sub_chunks,
            1,
            FixedSync::Input,
        )
        .map_err(|e| CoreError::Resampling {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(input_rate, output_rate, chunk_size = CHUNK_SIZE, "Resampler initialized");

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
            consumed: 0,
            produced: 0,
        })
    }

    /// Queues `samples` and returns every output sample that is ready.
    #[track_caller]
    pub fn push(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        self.pending.extend_from_slice(samples);
        self.consumed += samples.len() as u64;

        let mut output = Vec::new();
        let mut offset = 0;
        while self.pending.len() - offset >= CHUNK_SIZE {
            let chunk = self.pending[offset..offset + CHUNK_SIZE].to_vec();
            self.process_chunk(&chunk, &mut output)?;
            offset += CHUNK_SIZE;
        }
        self.pending.drain(..offset);

        Ok(output)
    }

    /// Flushes the queued tail, trimming padding so the total output length
    /// matches the input duration.
    #[track_caller]
    pub fn finish(&mut self) -> CoreResult<Vec<f32>> {
        let mut output = Vec::new();

        if !self.pending.is_empty() {
            let mut chunk = std::mem::take(&mut self.pending);
            chunk.resize(CHUNK_SIZE, 0.0);
            self.process_chunk(&chunk, &mut output)?;
        }

        let expected =
            self.consumed * u64::from(self.output_rate) / u64::from(self.input_rate);
        let already = self.produced - output.len() as u64;
        let keep = expected.saturating_sub(already).min(output.len() as u64) as usize;
        output.truncate(keep);

        debug!(
            consumed = self.consumed,
            expected_output = expected,
            "Resampler flushed"
        );

        Ok(output)
    }

    #[track_caller]
    fn process_chunk(&mut self, chunk: &[f32], output: &mut Vec<f32>) -> CoreResult<()> {
        let input_adapter = InterleavedSlice::new(chunk, 1, CHUNK_SIZE).map_err(|e| {
            CoreError::Resampling {
                reason: format!("Failed to create input adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let output_frames = self.resampler.output_frames_max();
        let mut output_chunk = vec![0.0f32; output_frames];

        let mut output_adapter = InterleavedSlice::new_mut(&mut output_chunk, 1, output_frames)
            .map_err(|e| CoreError::Resampling {
                reason: format!("Failed to create output adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let (_input_frames, written) = self
            .resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| CoreError::Resampling {
                reason: format!("Resampling failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        output.extend_from_slice(&output_chunk[..written]);
        self.produced += written as u64;

        Ok(())
    }
}
