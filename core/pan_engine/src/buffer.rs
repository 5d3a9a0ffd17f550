use timeline::{SegmentLayout, SegmentSpan};

/// Decoded PCM audio: interleaved `f32` frames with a fixed sample rate
/// and channel count.
///
/// Sample rate and channel count never change once the buffer exists;
/// every [`Segment`] borrowed from it shares them.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn new(mut samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % usize::from(channels);
        samples.truncate(whole);
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self::new(Vec::new(), sample_rate, channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / u64::from(self.sample_rate)
    }

    /// Averages all channels into a single one, for analysis.
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = usize::from(self.channels);
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Borrows one read-only [`Segment`] per span of `layout`.
    pub fn segments(&self, layout: &SegmentLayout) -> Vec<Segment<'_>> {
        layout.spans().map(|span| self.segment(&span)).collect()
    }

    fn segment(&self, span: &SegmentSpan) -> Segment<'_> {
        let channels = usize::from(self.channels);
        let start = (span.frames.start * channels).min(self.samples.len());
        let end = (span.frames.end * channels).min(self.samples.len());
        Segment {
            index: span.index,
            samples: &self.samples[start..end],
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// A read-only window onto an [`AudioBuffer`], tagged with its position
/// in the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<'a> {
    index: usize,
    samples: &'a [f32],
    sample_rate: u32,
    channels: u16,
}

impl<'a> Segment<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 * 1000.0 / f64::from(self.sample_rate)
    }
}
