/// Tolerance used when comparing rendered samples in tests.
pub const AUDIO_SAMPLE_EPSILON: f32 = 1e-6;

pub const DEFAULT_PANNING_FREQUENCY: u32 = 8;
pub const DEFAULT_AMPLITUDE: f32 = 1.2;

/// Segment length for the fixed-waveform mode, in milliseconds.
pub const FIXED_SEGMENT_MS: u32 = 50;
/// Segment length for the onset-driven mode, in milliseconds.
pub const DYNAMIC_SEGMENT_MS: u32 = 20;

/// Segments concatenated per reassembly task.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Onset-driven pans never go further than this, so neither channel mutes.
pub const DYNAMIC_PAN_LIMIT: f32 = 0.9;

pub const DEFAULT_MP3_BITRATE_KBPS: u32 = 192;

/// Output is always interleaved stereo.
pub const OUTPUT_CHANNELS: u16 = 2;
