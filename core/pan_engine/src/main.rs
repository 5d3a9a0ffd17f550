use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, ValueEnum};
use pan_engine::{
    Pipeline,
    config::PipelineConfig,
    constants::{DEFAULT_AMPLITUDE, DEFAULT_MP3_BITRATE_KBPS, DEFAULT_PANNING_FREQUENCY},
    pan::PanLaw,
    pipeline::PanRequest,
    progress::LogProgress,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Triangle-wave sweeps at a fixed rate
    Fixed,
    /// Sine sweeps that speed up on onsets
    Dynamic,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Law {
    Linear,
    Boost,
}

impl From<Law> for PanLaw {
    fn from(value: Law) -> Self {
        match value {
            Law::Linear => Self::Linear,
            Law::Boost => Self::Boost,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pan8d", about = "Render a spatialised (8D) stereo mix of an audio file")]
struct Args {
    /// Input audio file (wav, mp3, flac, ogg, m4a, aiff)
    input: PathBuf,

    /// Output file; `.wav` writes 16-bit WAV, anything else MP3
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Fixed)]
    mode: Mode,

    /// Full left-right sweeps across the clip (fixed mode)
    #[arg(long, default_value_t = DEFAULT_PANNING_FREQUENCY)]
    panning_frequency: u32,

    /// Sweep amplitude; values above 1 hold the extremes longer (fixed mode)
    #[arg(long, default_value_t = DEFAULT_AMPLITUDE)]
    amplitude: f32,

    /// Override the segment length in milliseconds
    #[arg(long)]
    segment_ms: Option<u32>,

    /// Segments per reassembly chunk
    #[arg(long, env = "PAN8D_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Worker threads (default: all cores)
    #[arg(long, env = "PAN8D_THREADS")]
    threads: Option<usize>,

    #[arg(long, value_enum, default_value_t = Law::Linear)]
    pan_law: Law,

    #[arg(long, default_value_t = DEFAULT_MP3_BITRATE_KBPS)]
    bitrate: u32,

    /// Log filter, e.g. `debug` or `pan_engine=trace`
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default()
            .with_pan_law(self.pan_law.into())
            .with_mp3_bitrate(self.bitrate);
        if let Some(ms) = self.segment_ms {
            config = match self.mode {
                Mode::Fixed => config.with_fixed_segment_ms(ms),
                Mode::Dynamic => config.with_dynamic_segment_ms(ms),
            };
        }
        if let Some(chunk_size) = self.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        if let Some(threads) = self.threads {
            config = config.with_worker_threads(threads);
        }
        config
    }

    fn request(&self) -> PanRequest {
        match self.mode {
            Mode::Fixed => PanRequest::Fixed {
                frequency: self.panning_frequency,
                amplitude: self.amplitude,
            },
            Mode::Dynamic => PanRequest::Dynamic,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .format_timestamp_millis()
        .init();

    let pipeline = match Pipeline::new(args.config()) {
        Ok(pipeline) => pipeline.with_progress(Arc::new(LogProgress::default())),
        Err(e) => {
            log::error!("failed to start pipeline: {e}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.process_file(&args.input, &args.output, args.request()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("error processing {}: {e}", args.input.display());
            ExitCode::FAILURE
        }
    }
}
