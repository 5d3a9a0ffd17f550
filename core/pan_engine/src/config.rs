use crate::{
    constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MP3_BITRATE_KBPS, DYNAMIC_SEGMENT_MS, FIXED_SEGMENT_MS},
    pan::PanLaw,
};

/// Tuning knobs for a [`crate::pipeline::Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Segment length in the fixed-waveform mode.
    pub fixed_segment_ms: u32,
    /// Segment length in the onset-driven mode.
    pub dynamic_segment_ms: u32,
    /// Segments per reassembly chunk.
    pub chunk_size: usize,
    /// `None` uses every available core.
    pub worker_threads: Option<usize>,
    pub pan_law: PanLaw,
    pub mp3_bitrate_kbps: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fixed_segment_ms: FIXED_SEGMENT_MS,
            dynamic_segment_ms: DYNAMIC_SEGMENT_MS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            worker_threads: None,
            pan_law: PanLaw::default(),
            mp3_bitrate_kbps: DEFAULT_MP3_BITRATE_KBPS,
        }
    }
}

impl PipelineConfig {
    pub fn with_fixed_segment_ms(mut self, ms: u32) -> Self {
        self.fixed_segment_ms = ms.max(1);
        self
    }

    pub fn with_dynamic_segment_ms(mut self, ms: u32) -> Self {
        self.dynamic_segment_ms = ms.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads.max(1));
        self
    }

    pub fn with_pan_law(mut self, law: PanLaw) -> Self {
        self.pan_law = law;
        self
    }

    pub fn with_mp3_bitrate(mut self, kbps: u32) -> Self {
        self.mp3_bitrate_kbps = kbps;
        self
    }
}
