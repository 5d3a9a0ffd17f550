use rayon::prelude::*;

use crate::{
    buffer::Segment,
    error::{PipelineError, StructuralError, TransformError},
    pan::PanTransform,
    planner::PanDirective,
    progress::ProgressTracker,
};

/// Panned interleaved-stereo samples, tagged with the segment they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PannedResult {
    pub index: usize,
    pub samples: Vec<f32>,
}

/// Fixed pool of CPU workers shared by the pan and concatenation stages.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// `threads = None` sizes the pool to the available hardware parallelism.
    pub fn new(threads: Option<usize>) -> Result<Self, PipelineError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("pan-worker-{i}"));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads.max(1));
        }
        let pool = builder.build()?;
        log::debug!("worker pool started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub(crate) fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Pans every segment exactly once, in parallel.
    ///
    /// Results come back in completion-independent index order, but callers
    /// must not rely on that; each result carries its own index. If any
    /// segment fails, outstanding work is abandoned, every finished result
    /// is dropped and a single [`TransformError`] is returned.
    pub(crate) fn apply<T>(
        &self,
        segments: &[Segment<'_>],
        directives: &[PanDirective],
        transform: &T,
        progress: &ProgressTracker<'_>,
    ) -> Result<Vec<PannedResult>, PipelineError>
    where
        T: PanTransform + ?Sized,
    {
        if segments.len() != directives.len() {
            return Err(StructuralError::DirectiveCountMismatch {
                segments: segments.len(),
                directives: directives.len(),
            }
            .into());
        }

        let results = self.install(|| {
            segments
                .par_iter()
                .zip(directives.par_iter())
                .map(|(segment, directive)| {
                    if segment.index() != directive.index {
                        return Err(TransformError::new(
                            segment.index(),
                            format!("paired with directive for segment {}", directive.index),
                        ));
                    }
                    let samples = transform.apply(segment, directive.value)?;
                    progress.advance(1);
                    Ok(PannedResult {
                        index: segment.index(),
                        samples,
                    })
                })
                .collect::<Result<Vec<_>, TransformError>>()
        })?;

        Ok(results)
    }
}
