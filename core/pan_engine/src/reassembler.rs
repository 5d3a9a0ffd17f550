use rayon::prelude::*;

use crate::{
    buffer::AudioBuffer,
    constants::{DEFAULT_CHUNK_SIZE, OUTPUT_CHANNELS},
    error::StructuralError,
    executor::{PannedResult, WorkerPool},
    progress::ProgressTracker,
};

/// Restores temporal order and stitches panned segments into one buffer.
///
/// Concatenation runs in chunks of `chunk_size` segments on the worker pool,
/// then the chunk buffers are joined in order. The chunk size only affects
/// throughput; the output is identical to a plain sequential concatenation.
#[derive(Debug, Clone, Copy)]
pub struct Reassembler {
    chunk_size: usize,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Reassembler {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn reassemble(
        &self,
        pool: &WorkerPool,
        mut results: Vec<PannedResult>,
        expected: usize,
        sample_rate: u32,
        progress: &ProgressTracker<'_>,
    ) -> Result<AudioBuffer, StructuralError> {
        results.sort_by_key(|r| r.index);
        verify_dense(&results, expected)?;

        let chunk_size = self.chunk_size;
        let partials: Vec<Vec<f32>> = pool.install(|| {
            results
                .par_chunks(chunk_size)
                .map(|chunk| {
                    let partial = concat(chunk);
                    progress.advance(chunk.len());
                    partial
                })
                .collect()
        });

        log::debug!(
            "joined {} segments from {} chunks of up to {}",
            results.len(),
            partials.len(),
            chunk_size
        );

        let mut samples = Vec::with_capacity(partials.iter().map(Vec::len).sum());
        for partial in partials {
            samples.extend_from_slice(&partial);
        }
        Ok(AudioBuffer::new(samples, sample_rate, OUTPUT_CHANNELS))
    }
}

/// Checks that sorted `results` carry exactly the indices `0..expected`.
pub fn verify_dense(results: &[PannedResult], expected: usize) -> Result<(), StructuralError> {
    let mut next = 0;
    for result in results {
        if result.index >= expected {
            return Err(StructuralError::UnexpectedSegment {
                index: result.index,
                expected,
            });
        }
        if result.index < next {
            return Err(StructuralError::DuplicateSegment {
                index: result.index,
            });
        }
        if result.index > next {
            return Err(StructuralError::MissingSegment { index: next });
        }
        next += 1;
    }
    if next < expected {
        return Err(StructuralError::MissingSegment { index: next });
    }
    Ok(())
}

fn concat(results: &[PannedResult]) -> Vec<f32> {
    let mut out = Vec::with_capacity(results.iter().map(|r| r.samples.len()).sum());
    for result in results {
        out.extend_from_slice(&result.samples);
    }
    out
}
