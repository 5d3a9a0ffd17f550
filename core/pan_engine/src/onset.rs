//! Onset-strength analysis for the onset-driven panning mode.
//!
//! The envelope is computed once per input, then shared read-only by every
//! segment's pan computation.

use std::f32::consts::PI;
use std::f64::consts::TAU;

use rustfft::{FftPlanner, num_complex::Complex};

use crate::constants::DYNAMIC_PAN_LIMIT;

/// One non-negative energy value per analysis frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnsetEnvelope {
    values: Vec<f32>,
    peak: f32,
}

impl OnsetEnvelope {
    /// Negative and non-finite values are replaced with `0.0`.
    pub fn new(values: Vec<f32>) -> Self {
        let values: Vec<f32> = values
            .into_iter()
            .map(|v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
            .collect();
        let peak = values.iter().copied().fold(0.0, f32::max);
        Self { values, peak }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Envelope frame that lines up with `segment` out of `segment_count`,
    /// by proportional rescale. Clamped to the last frame.
    pub fn frame_for_segment(&self, segment: usize, segment_count: usize) -> Option<usize> {
        if self.values.is_empty() || segment_count == 0 {
            return None;
        }
        let scaled = segment as u128 * self.values.len() as u128 / segment_count as u128;
        Some((scaled as usize).min(self.values.len() - 1))
    }

    pub fn strength_for_segment(&self, segment: usize, segment_count: usize) -> f32 {
        self.frame_for_segment(segment, segment_count)
            .map_or(0.0, |frame| self.values[frame])
    }

    /// `1 + strength / peak`; exactly `1` for a silent envelope.
    pub fn speed_factor(&self, strength: f32) -> f64 {
        if self.peak > 0.0 {
            1.0 + f64::from(strength) / f64::from(self.peak)
        } else {
            1.0
        }
    }

    /// Sinusoidal pan for `segment`, sped up by local onset strength and
    /// limited to `±DYNAMIC_PAN_LIMIT`.
    pub fn smooth_pan(&self, segment: usize, segment_count: usize) -> f32 {
        if segment_count == 0 {
            return 0.0;
        }
        let strength = self.strength_for_segment(segment, segment_count);
        let position = segment as f64 / segment_count as f64;
        let pan = (TAU * position * self.speed_factor(strength)).sin() as f32;
        pan.clamp(-DYNAMIC_PAN_LIMIT, DYNAMIC_PAN_LIMIT)
    }
}

/// Source of onset-strength envelopes.
pub trait OnsetStrength: Send + Sync {
    /// `samples` is a single (mono) channel.
    fn onset_strength(&self, samples: &[f32], sample_rate: u32) -> OnsetEnvelope;
}

/// Spectral-flux onset detector.
///
/// Centred STFT frames, Hann window, log-power spectrum floored `top_db`
/// below its peak, then the mean positive difference between consecutive
/// frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralFluxOnset {
    pub fft_size: usize,
    pub hop_length: usize,
    pub top_db: f32,
}

impl Default for SpectralFluxOnset {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_length: 512,
            top_db: 80.0,
        }
    }
}

impl SpectralFluxOnset {
    fn frame_count(&self, samples: usize) -> usize {
        1 + samples / self.hop_length.max(1)
    }

    fn log_power_frames(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let fft_size = self.fft_size.max(2);
        let hop = self.hop_length.max(1);
        let pad = fft_size / 2;
        let bins = fft_size / 2 + 1;

        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let mut scratch = vec![Complex::new(0.0, 0.0); fft_size];

        let mut frames = Vec::with_capacity(self.frame_count(samples.len()));
        for frame in 0..self.frame_count(samples.len()) {
            let origin = frame * hop;
            for (i, slot) in scratch.iter_mut().enumerate() {
                // centred framing: sample index relative to the zero-padded signal
                let sample = (origin + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * window[i], 0.0);
            }
            fft.process(&mut scratch);

            frames.push(
                scratch[..bins]
                    .iter()
                    .map(|c| 10.0 * c.norm_sqr().max(1e-10).log10())
                    .collect::<Vec<f32>>(),
            );
        }

        let peak = frames
            .iter()
            .flatten()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - self.top_db;
        for value in frames.iter_mut().flatten() {
            *value = value.max(floor);
        }
        frames
    }
}

impl OnsetStrength for SpectralFluxOnset {
    fn onset_strength(&self, samples: &[f32], _sample_rate: u32) -> OnsetEnvelope {
        let spectra = self.log_power_frames(samples);
        let mut flux = Vec::with_capacity(spectra.len());
        flux.push(0.0);
        for pair in spectra.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let rise: f32 = next
                .iter()
                .zip(prev)
                .map(|(n, p)| (n - p).max(0.0))
                .sum();
            flux.push(rise / next.len() as f32);
        }
        flux.truncate(spectra.len());

        log::debug!(
            "computed onset envelope: {} frames from {} samples",
            flux.len(),
            samples.len()
        );
        OnsetEnvelope::new(flux)
    }
}
