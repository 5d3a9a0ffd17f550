use std::ops::Range;

use crate::duration::SegmentDuration;

/// One contiguous frame range of the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSpan {
    pub index: usize,
    pub frames: Range<usize>,
}

impl SegmentSpan {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Partition of `total_frames` into fixed-duration segments.
///
/// `full_segments` whole segments come first, followed by an optional
/// shorter tail. A timeline shorter than one segment is laid out as a
/// single degenerate segment spanning everything (possibly zero frames).
/// The spans never overlap and always cover `0..total_frames`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    total_frames: usize,
    sample_rate: u32,
    duration: SegmentDuration,
    full_segments: usize,
}

impl SegmentLayout {
    pub fn new(total_frames: usize, sample_rate: u32, duration: SegmentDuration) -> Self {
        let full_segments = duration.whole_segments_in(total_frames, sample_rate);
        Self {
            total_frames,
            sample_rate,
            duration,
            full_segments,
        }
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn duration(&self) -> SegmentDuration {
        self.duration
    }

    /// Whole segments only; `0` when the timeline is shorter than one segment.
    pub fn full_segments(&self) -> usize {
        self.full_segments
    }

    /// True when frames remain after the last whole segment.
    pub fn has_tail(&self) -> bool {
        self.full_segments > 0 && self.tail_start() < self.total_frames
    }

    /// True when the whole timeline is a single sub-segment span.
    pub fn is_degenerate(&self) -> bool {
        self.full_segments == 0
    }

    /// Number of spans, tail included. Never zero.
    pub fn len(&self) -> usize {
        if self.is_degenerate() {
            1
        } else {
            self.full_segments + usize::from(self.has_tail())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_frames == 0
    }

    fn tail_start(&self) -> usize {
        self.duration.boundary(self.full_segments, self.sample_rate)
    }

    pub fn span(&self, index: usize) -> Option<SegmentSpan> {
        if index >= self.len() {
            return None;
        }
        if self.is_degenerate() {
            return Some(SegmentSpan {
                index,
                frames: 0..self.total_frames,
            });
        }

        let start = self.duration.boundary(index, self.sample_rate);
        let end = if index + 1 == self.len() {
            self.total_frames
        } else {
            self.duration.boundary(index + 1, self.sample_rate)
        };

        Some(SegmentSpan {
            index,
            frames: start..end,
        })
    }

    pub fn spans(&self) -> impl Iterator<Item = SegmentSpan> + '_ {
        (0..self.len()).filter_map(|index| self.span(index))
    }
}
