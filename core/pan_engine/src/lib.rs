pub mod buffer;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod executor;
pub mod onset;
pub mod pan;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod reassembler;
pub mod waveform;

pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, create_8d_audio, create_dynamic_8d_audio};
