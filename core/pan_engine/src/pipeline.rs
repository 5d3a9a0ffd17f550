//! End-to-end spatialisation: decode, segment, plan, pan, reassemble, encode.
//!
//! A run moves strictly forward through [`PipelineStage`]s. Any error moves it
//! to [`PipelineStage::Failed`] and is returned as a single [`PipelineError`];
//! nothing is written to the output path unless every stage succeeded.

use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use timeline::SegmentLayout;
use uuid::Uuid;

use crate::{
    buffer::AudioBuffer,
    codec::{self, OutputFormat},
    config::PipelineConfig,
    constants::{DEFAULT_AMPLITUDE, DEFAULT_PANNING_FREQUENCY},
    error::{PipelineError, Result},
    executor::WorkerPool,
    onset::{OnsetStrength, SpectralFluxOnset},
    pan::{PanTransform, StereoPanner},
    planner::{PanMode, SegmentPlanner},
    progress::{LogProgress, NoProgress, ProgressSink, ProgressTracker},
    reassembler::Reassembler,
};

/// Identifies one pipeline invocation in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // first group is plenty to tell concurrent runs apart in logs
        let full = self.0.to_string();
        f.write_str(full.split('-').next().unwrap_or(&full))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Decoded,
    Segmented,
    Planned,
    Transforming,
    Reassembled,
    Encoded,
    Failed,
}

/// What the caller asked for, before the input has been decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanRequest {
    Fixed { frequency: u32, amplitude: f32 },
    /// Onset-driven; the envelope is computed from the decoded input.
    Dynamic,
}

impl Default for PanRequest {
    fn default() -> Self {
        Self::Fixed {
            frequency: DEFAULT_PANNING_FREQUENCY,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

struct Run {
    id: RunId,
    stage: Option<PipelineStage>,
}

impl Run {
    fn start() -> Self {
        Self {
            id: RunId::new(),
            stage: None,
        }
    }

    fn enter(&mut self, next: PipelineStage) {
        debug_assert!(self.stage.is_none_or(|current| current < next));
        log::debug!("[{}] {:?} -> {:?}", self.id, self.stage, next);
        self.stage = Some(next);
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        log::error!("[{}] failed during {:?}: {err}", self.id, self.stage);
        self.stage = Some(PipelineStage::Failed);
        err
    }
}

/// Reusable spatialisation pipeline with injected collaborators.
pub struct Pipeline {
    config: PipelineConfig,
    pool: WorkerPool,
    reassembler: Reassembler,
    transform: Box<dyn PanTransform>,
    onsets: Box<dyn OnsetStrength>,
    progress: Arc<dyn ProgressSink>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("reassembler", &self.reassembler)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.worker_threads)?;
        Ok(Self {
            reassembler: Reassembler::new(config.chunk_size),
            transform: Box::new(StereoPanner::new(config.pan_law)),
            onsets: Box::new(SpectralFluxOnset::default()),
            progress: Arc::new(NoProgress),
            pool,
            config,
        })
    }

    pub fn with_transform(mut self, transform: impl PanTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    pub fn with_onset_strength(mut self, onsets: impl OnsetStrength + 'static) -> Self {
        self.onsets = Box::new(onsets);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolves a request against decoded audio.
    pub fn mode_for(&self, request: PanRequest, buffer: &AudioBuffer) -> PanMode {
        match request {
            PanRequest::Fixed {
                frequency,
                amplitude,
            } => PanMode::FixedWaveform {
                frequency,
                amplitude,
            },
            PanRequest::Dynamic => {
                let envelope = self
                    .onsets
                    .onset_strength(&buffer.to_mono(), buffer.sample_rate());
                PanMode::OnsetDriven {
                    envelope: Arc::new(envelope),
                }
            }
        }
    }

    /// Spatialises decoded audio. The result is always stereo.
    pub fn render(&self, buffer: &AudioBuffer, mode: &PanMode) -> Result<AudioBuffer> {
        let mut run = Run::start();
        run.enter(PipelineStage::Decoded);
        self.render_in(&mut run, buffer, mode)
            .map_err(|err| run.fail(err))
    }

    fn render_in(&self, run: &mut Run, buffer: &AudioBuffer, mode: &PanMode) -> Result<AudioBuffer> {
        let layout = SegmentLayout::new(
            buffer.frames(),
            buffer.sample_rate(),
            mode.segment_duration(&self.config),
        );
        let segments = buffer.segments(&layout);
        run.enter(PipelineStage::Segmented);
        log::info!(
            "[{}] {} mode: {} segments of {} ms ({} ms of audio)",
            run.id,
            mode.name(),
            segments.len(),
            layout.duration().as_millis(),
            buffer.duration_ms()
        );

        let directives = SegmentPlanner::plan(mode, &layout);
        run.enter(PipelineStage::Planned);

        // pan and concatenation each count once per segment
        let progress = ProgressTracker::new(self.progress.as_ref(), segments.len() * 2);

        run.enter(PipelineStage::Transforming);
        let results = self
            .pool
            .apply(&segments, &directives, self.transform.as_ref(), &progress)?;

        let output = self.reassembler.reassemble(
            &self.pool,
            results,
            segments.len(),
            buffer.sample_rate(),
            &progress,
        )?;
        run.enter(PipelineStage::Reassembled);
        Ok(output)
    }

    /// Decodes `bytes`, spatialises them and encodes the result.
    pub fn process(
        &self,
        bytes: Vec<u8>,
        extension: Option<&str>,
        request: PanRequest,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        let mut run = Run::start();
        self.process_in(&mut run, bytes, extension, request, format)
            .map_err(|err| run.fail(err))
    }

    fn process_in(
        &self,
        run: &mut Run,
        bytes: Vec<u8>,
        extension: Option<&str>,
        request: PanRequest,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        let buffer = codec::decode(bytes, extension)?;
        run.enter(PipelineStage::Decoded);

        let mode = self.mode_for(request, &buffer);
        let rendered = self.render_in(run, &buffer, &mode)?;
        drop(buffer);

        let encoded = codec::encode(&rendered, format)?;
        run.enter(PipelineStage::Encoded);
        Ok(encoded)
    }

    /// Reads `input`, spatialises it and writes `output`. The output format
    /// follows the output extension (`.wav`, otherwise MP3).
    pub fn process_file(&self, input: &Path, output: &Path, request: PanRequest) -> Result<()> {
        log::info!("spatialising {} -> {}", input.display(), output.display());
        let bytes = fs::read(input).map_err(|e| PipelineError::io(input, e))?;
        let extension = input.extension().and_then(|ext| ext.to_str());
        let format = OutputFormat::for_path(output, self.config.mp3_bitrate_kbps);

        let encoded = self.process(bytes, extension, request, format)?;
        write_atomically(output, &encoded)?;
        log::info!("wrote {} ({} bytes)", output.display(), encoded.len());
        Ok(())
    }

    pub fn create_8d_audio(
        &self,
        input: &Path,
        output: &Path,
        panning_frequency: u32,
        amplitude: f32,
    ) -> Result<()> {
        self.process_file(
            input,
            output,
            PanRequest::Fixed {
                frequency: panning_frequency,
                amplitude,
            },
        )
    }

    pub fn create_dynamic_8d_audio(&self, input: &Path, output: &Path) -> Result<()> {
        self.process_file(input, output, PanRequest::Dynamic)
    }
}

/// Writes next to `path` first so a failed write never leaves a truncated file.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    fs::write(&partial, bytes).map_err(|e| PipelineError::io(&partial, e))?;
    fs::rename(&partial, path).map_err(|e| {
        let _ = fs::remove_file(&partial);
        PipelineError::io(path, e)
    })
}

fn default_pipeline() -> Result<Pipeline> {
    Ok(Pipeline::new(PipelineConfig::default())?.with_progress(Arc::new(LogProgress::default())))
}

/// Fixed-waveform spatialisation of `input` into `output`, with default settings.
pub fn create_8d_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    panning_frequency: u32,
    amplitude: f32,
) -> Result<()> {
    default_pipeline()?.create_8d_audio(
        input.as_ref(),
        output.as_ref(),
        panning_frequency,
        amplitude,
    )
}

/// Onset-driven spatialisation of `input` into `output`, with default settings.
pub fn create_dynamic_8d_audio(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<()> {
    default_pipeline()?.create_dynamic_8d_audio(input.as_ref(), output.as_ref())
}

#[cfg(test)]
mod pipeline_tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use hound::WavSpec;

    use super::*;
    use crate::{
        buffer::Segment,
        constants::AUDIO_SAMPLE_EPSILON,
        error::{DecodeError, TransformError},
        onset::OnsetEnvelope,
        progress::testing::RecordingProgress,
        waveform::triangle,
    };

    const RATE: u32 = 8_000;

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default().with_worker_threads(4)).unwrap()
    }

    fn silence(ms: u64) -> AudioBuffer {
        AudioBuffer::new(vec![0.0; (ms * u64::from(RATE) / 1000) as usize], RATE, 1)
    }

    fn noise(ms: u64, channels: u16) -> AudioBuffer {
        let len = (ms * u64::from(RATE) / 1000) as usize * usize::from(channels);
        let mut state = 0x2545_f491_u32;
        let samples = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();
        AudioBuffer::new(samples, RATE, channels)
    }

    fn fixed(frequency: u32, amplitude: f32) -> PanMode {
        PanMode::FixedWaveform {
            frequency,
            amplitude,
        }
    }

    /// Pans like the default panner and remembers every `(index, pan)` it saw.
    #[derive(Default)]
    struct RecordingTransform {
        seen: Arc<Mutex<Vec<(usize, f32)>>>,
    }

    impl PanTransform for RecordingTransform {
        fn apply(&self, segment: &Segment<'_>, pan: f32) -> Result<Vec<f32>, TransformError> {
            self.seen.lock().unwrap().push((segment.index(), pan));
            StereoPanner::default().apply(segment, pan)
        }
    }

    struct FailingAt {
        index: usize,
        calls: Arc<AtomicUsize>,
    }

    impl PanTransform for FailingAt {
        fn apply(&self, segment: &Segment<'_>, pan: f32) -> Result<Vec<f32>, TransformError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if segment.index() == self.index {
                return Err(TransformError::new(segment.index(), "injected failure"));
            }
            StereoPanner::default().apply(segment, pan)
        }
    }

    fn sorted(seen: &Mutex<Vec<(usize, f32)>>) -> Vec<(usize, f32)> {
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_by_key(|(index, _)| *index);
        seen
    }

    #[test]
    fn test_silent_second_follows_triangle_sequence() {
        let recorder = RecordingTransform::default();
        let seen = Arc::clone(&recorder.seen);
        let pipeline = pipeline().with_transform(recorder);

        let output = pipeline.render(&silence(1_000), &fixed(8, 1.0)).unwrap();

        assert_eq!(output.channels(), 2);
        assert_eq!(output.frames(), 8_000);
        assert!(output.samples().iter().all(|&s| s == 0.0));

        let seen = sorted(&seen);
        assert_eq!(seen.len(), 20);
        assert_eq!(seen[0], (0, 1.0));
        for (index, pan) in seen {
            let expected = triangle(index as f64 * 8.0 / 20.0, 1.0);
            assert!((pan - expected).abs() < AUDIO_SAMPLE_EPSILON, "segment {index}");
        }
    }

    #[test]
    fn test_empty_input_renders_empty_output() {
        let recorder = RecordingTransform::default();
        let seen = Arc::clone(&recorder.seen);
        let pipeline = pipeline().with_transform(recorder);

        let output = pipeline.render(&AudioBuffer::empty(RATE, 1), &fixed(8, 1.2)).unwrap();

        assert_eq!(output.frames(), 0);
        assert_eq!(sorted(&seen), vec![(0, 1.0)]);
    }

    #[test]
    fn test_one_failing_segment_fails_the_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline().with_transform(FailingAt {
            index: 13,
            calls: Arc::clone(&calls),
        });

        let result = pipeline.render(&noise(1_000, 1), &fixed(8, 1.2));

        match result {
            Err(PipelineError::Transform(e)) => assert_eq!(e.index, 13),
            other => panic!("expected a transform error, got {other:?}"),
        }
        let calls = calls.load(Ordering::SeqCst);
        assert!((1..=20).contains(&calls), "{calls} transform calls");
    }

    #[test]
    fn test_output_is_independent_of_scheduling() {
        let input = noise(2_345, 2);
        let mode = fixed(8, 1.2);
        let reference = Pipeline::new(PipelineConfig::default().with_worker_threads(1))
            .unwrap()
            .render(&input, &mode)
            .unwrap();

        for (threads, chunk) in [(2, 1), (8, 100), (3, 7)] {
            let config = PipelineConfig::default()
                .with_worker_threads(threads)
                .with_chunk_size(chunk);
            let output = Pipeline::new(config).unwrap().render(&input, &mode).unwrap();
            assert_eq!(output, reference, "threads={threads} chunk={chunk}");
        }
    }

    #[test]
    fn test_render_matches_sequential_reference() {
        let input = noise(1_030, 1);
        let output = pipeline().render(&input, &fixed(3, 1.5)).unwrap();

        // 1030ms at 50ms: 20 whole segments of 400 frames plus a 240 frame tail
        let mut expected = Vec::new();
        for (i, chunk) in input.samples().chunks(400).enumerate() {
            let pan = triangle(i as f64 * 3.0 / 20.0, 1.5);
            let (l, r) = crate::pan::PanLaw::Linear.gains(pan);
            expected.extend(chunk.iter().flat_map(|&s| [s * l, s * r]));
        }
        assert_eq!(output.samples(), expected.as_slice());
    }

    #[test]
    fn test_dynamic_mode_tail_reuses_last_pan() {
        let recorder = RecordingTransform::default();
        let seen = Arc::clone(&recorder.seen);
        let pipeline = pipeline().with_transform(recorder);
        let mode = PanMode::OnsetDriven {
            envelope: Arc::new(OnsetEnvelope::new(vec![0.0, 2.0, 1.0, 0.5])),
        };

        // 1010ms at 20ms: 50 whole segments plus a 10ms tail
        let output = pipeline.render(&noise(1_010, 1), &mode).unwrap();
        assert_eq!(output.frames(), 8_080);

        let seen = sorted(&seen);
        assert_eq!(seen.len(), 51);
        assert_eq!(seen[50].1, seen[49].1);
        assert!(seen.iter().all(|(_, pan)| pan.abs() <= 0.9));
    }

    #[test]
    fn test_progress_counts_both_stages() {
        let sink = Arc::new(RecordingProgress::default());
        let pipeline = pipeline().with_progress(sink.clone());

        pipeline.render(&silence(500), &fixed(8, 1.2)).unwrap();

        let reports = sink.reports();
        assert_eq!(reports.last(), Some(&(20, 20)));
        assert!(reports.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_dynamic_request_analyses_the_input() {
        let pipeline = pipeline();
        let input = noise(300, 2);
        match pipeline.mode_for(PanRequest::Dynamic, &input) {
            PanMode::OnsetDriven { envelope } => assert_eq!(envelope.len(), 1 + 2_400 / 512),
            other => panic!("unexpected mode {other:?}"),
        }
    }

    fn write_wav(path: &Path, buffer: &AudioBuffer) {
        let spec = WavSpec {
            channels: buffer.channels(),
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in buffer.samples() {
            writer.write_sample((s * 16_000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_fixed_mode_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.wav");
        let output = dir.path().join("8d_input.wav");
        write_wav(&input, &noise(1_234, 1));

        pipeline().create_8d_audio(&input, &output, 8, 1.2).unwrap();

        let rendered = codec::decode(fs::read(&output).unwrap(), Some("wav")).unwrap();
        assert_eq!(rendered.channels(), 2);
        assert_eq!(rendered.sample_rate(), RATE);
        assert_eq!(rendered.frames(), 9_872);
        assert!(!dir.path().join("8d_input.wav.part").exists());
    }

    #[test]
    fn test_dynamic_mode_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.wav");
        let output = dir.path().join("dynamic.wav");
        write_wav(&input, &noise(777, 2));

        pipeline().create_dynamic_8d_audio(&input, &output).unwrap();

        let rendered = codec::decode(fs::read(&output).unwrap(), Some("wav")).unwrap();
        assert_eq!(rendered.channels(), 2);
        assert_eq!(rendered.frames(), 6_216);
    }

    #[test]
    fn test_invalid_input_is_a_decode_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("test.txt");
        let output = dir.path().join("out.mp3");
        fs::write(&input, b"Not an audio file").unwrap();

        let err = pipeline().create_8d_audio(&input, &output, 8, 2.0).unwrap_err();

        assert!(matches!(err, PipelineError::Decode(DecodeError::UnsupportedFormat(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_8d_audio(dir.path().join("nope.wav"), dir.path().join("out.wav"), 8, 1.2)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_run_ids_are_short_and_distinct() {
        let (a, b) = (RunId::new(), RunId::new());
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 8);
    }
}
