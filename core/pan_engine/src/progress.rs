use std::sync::{Mutex, PoisonError};

/// Receives completed-unit counts while a pipeline runs. Purely advisory.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Logs progress at every `step_percent` boundary crossed.
#[derive(Debug)]
pub struct LogProgress {
    step_percent: usize,
    last_logged: Mutex<usize>,
}

impl LogProgress {
    pub fn new(step_percent: usize) -> Self {
        Self {
            step_percent: step_percent.clamp(1, 100),
            last_logged: Mutex::new(0),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ProgressSink for LogProgress {
    fn on_progress(&self, completed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = completed * 100 / total;
        let bucket = percent / self.step_percent * self.step_percent;
        let mut last = self.last_logged.lock().unwrap_or_else(PoisonError::into_inner);
        if bucket > *last || completed == total {
            *last = bucket;
            log::info!("overall progress: {percent}% ({completed}/{total} segments)");
        }
    }
}

/// Counts completed units from many worker threads and forwards strictly
/// increasing totals to a [`ProgressSink`].
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    total: usize,
    completed: Mutex<usize>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            total,
            completed: Mutex::new(0),
        }
    }

    pub(crate) fn advance(&self, units: usize) {
        if units == 0 {
            return;
        }
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        *completed = (*completed + units).min(self.total);
        self.sink.on_progress(*completed, self.total);
    }

    pub(crate) fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}


#[cfg(test)]
mod progress_tests {
    use rayon::prelude::*;

    use super::{testing::RecordingProgress, *};

    #[test]
    fn test_tracker_reports_are_monotonic_across_threads() {
        let sink = RecordingProgress::default();
        let tracker = ProgressTracker::new(&sink, 500);

        (0..500).into_par_iter().for_each(|_| tracker.advance(1));

        let reports = sink.reports();
        assert_eq!(reports.len(), 500);
        assert!(reports.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(reports.last(), Some(&(500, 500)));
        assert_eq!(tracker.completed(), 500);
    }

    #[test]
    fn test_tracker_never_exceeds_total() {
        let sink = RecordingProgress::default();
        let tracker = ProgressTracker::new(&sink, 3);
        tracker.advance(2);
        tracker.advance(5);
        tracker.advance(0);
        assert_eq!(sink.reports(), vec![(2, 3), (3, 3)]);
    }

    #[test]
    fn test_log_progress_ignores_empty_totals() {
        let sink = LogProgress::default();
        sink.on_progress(0, 0);
        sink.on_progress(5, 10);
        assert_eq!(*sink.last_logged.lock().unwrap(), 50);
    }
}
