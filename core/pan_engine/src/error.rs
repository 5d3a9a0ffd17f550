use std::path::PathBuf;

use thiserror::Error;

/// Input bytes could not be turned into samples.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognised or corrupt audio container: {0}")]
    UnsupportedFormat(String),

    #[error("no decodable audio track found")]
    NoAudioTrack,

    #[error("audio track does not declare a sample rate")]
    UnknownSampleRate,

    #[error("only mono or stereo input is supported, got {0} channels")]
    UnsupportedChannels(usize),

    #[error("failed to create decoder: {0}")]
    Codec(String),

    #[error("failed to read packet: {0}")]
    Packet(String),
}

/// The panned result set does not form a dense `0..N` index range.
///
/// This never happens with well-behaved collaborators; it points at a bug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("segment {index} is missing from the result set")]
    MissingSegment { index: usize },

    #[error("segment {index} appears more than once in the result set")]
    DuplicateSegment { index: usize },

    #[error("segment {index} is outside the expected range 0..{expected}")]
    UnexpectedSegment { index: usize, expected: usize },

    #[error("planned {directives} pan directives for {segments} segments")]
    DirectiveCountMismatch { segments: usize, directives: usize },
}

/// Panning a single segment failed; the whole invocation is abandoned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to pan segment {index}: {reason}")]
pub struct TransformError {
    pub index: usize,
    pub reason: String,
}

impl TransformError {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Samples could not be written to the requested output format.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("wav encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("mp3 encoding failed: {0}")]
    Mp3(String),

    #[error("cannot encode {0} channels")]
    UnsupportedChannels(u16),
}

/// Single failure surfaced by a pipeline invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
