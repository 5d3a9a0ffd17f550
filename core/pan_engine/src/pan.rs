use crate::{buffer::Segment, error::TransformError};

/// Per-channel gain curve used to place a segment in the stereo field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanLaw {
    /// Unity at centre; the far channel fades linearly to silence.
    #[default]
    Linear,
    /// Near channel boosted by up to +3 dB, far channel cut to silence.
    Boost,
}

impl PanLaw {
    /// `(left, right)` gains for a pan in `[-1, 1]`.
    pub fn gains(self, pan: f32) -> (f32, f32) {
        let pan = if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) };
        match self {
            Self::Linear => {
                let left = if pan > 0.0 { 1.0 - pan } else { 1.0 };
                let right = if pan < 0.0 { 1.0 + pan } else { 1.0 };
                (left, right)
            }
            Self::Boost => {
                let boost = 2.0f32.powf(pan.abs());
                let near = boost.sqrt();
                let far = (2.0 - boost).max(0.0);
                if pan < 0.0 { (near, far) } else { (far, near) }
            }
        }
    }
}

/// Pans one segment. Must not depend on any other segment.
pub trait PanTransform: Send + Sync {
    /// Returns interleaved stereo samples for `segment` placed at `pan`.
    fn apply(&self, segment: &Segment<'_>, pan: f32) -> Result<Vec<f32>, TransformError>;
}

/// Gain-based stereo panner; mono input is spread to both channels first.
#[derive(Debug, Clone, Copy, Default)]
pub struct StereoPanner {
    law: PanLaw,
}

impl StereoPanner {
    pub fn new(law: PanLaw) -> Self {
        Self { law }
    }

    pub fn law(&self) -> PanLaw {
        self.law
    }
}

impl PanTransform for StereoPanner {
    fn apply(&self, segment: &Segment<'_>, pan: f32) -> Result<Vec<f32>, TransformError> {
        let (gain_l, gain_r) = self.law.gains(pan);
        let samples = segment.samples();

        match segment.channels() {
            1 => Ok(samples
                .iter()
                .flat_map(|&s| [s * gain_l, s * gain_r])
                .collect()),
            2 => Ok(samples
                .chunks_exact(2)
                .flat_map(|frame| [frame[0] * gain_l, frame[1] * gain_r])
                .collect()),
            channels => Err(TransformError::new(
                segment.index(),
                format!("cannot pan {channels}-channel audio"),
            )),
        }
    }
}

#[cfg(test)]
mod stereo_panner_tests {
    use timeline::{SegmentDuration, SegmentLayout};

    use super::*;
    use crate::{buffer::AudioBuffer, constants::AUDIO_SAMPLE_EPSILON};

    fn pan_whole(buffer: &AudioBuffer, panner: StereoPanner, pan: f32) -> Vec<f32> {
        let layout = SegmentLayout::new(
            buffer.frames(),
            buffer.sample_rate(),
            SegmentDuration::from_millis(10_000),
        );
        let segments = buffer.segments(&layout);
        panner.apply(&segments[0], pan).unwrap()
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < AUDIO_SAMPLE_EPSILON
    }

    #[test]
    fn test_linear_centre_is_unity() {
        assert_eq!(PanLaw::Linear.gains(0.0), (1.0, 1.0));
    }

    #[test]
    fn test_linear_hard_left_mutes_right() {
        assert_eq!(PanLaw::Linear.gains(-1.0), (1.0, 0.0));
        assert_eq!(PanLaw::Linear.gains(1.0), (0.0, 1.0));
    }

    #[test]
    fn test_linear_clamps_out_of_range_pan() {
        assert_eq!(PanLaw::Linear.gains(-3.0), (1.0, 0.0));
        assert_eq!(PanLaw::Linear.gains(f32::NAN), (1.0, 1.0));
    }

    #[test]
    fn test_boost_law_shape() {
        let (l, r) = PanLaw::Boost.gains(0.0);
        assert!(close(l, 1.0) && close(r, 1.0));

        let (l, r) = PanLaw::Boost.gains(-1.0);
        assert!(close(l, std::f32::consts::SQRT_2));
        assert!(close(r, 0.0));

        let (l, r) = PanLaw::Boost.gains(0.5);
        assert!(close(r, 2.0f32.powf(0.25)));
        assert!(close(l, 2.0 - 2.0f32.sqrt()));
    }

    #[test]
    fn test_mono_segment_becomes_stereo() {
        let buffer = AudioBuffer::new(vec![0.5, -0.5], 1_000, 1);
        let out = pan_whole(&buffer, StereoPanner::default(), 0.5);
        assert_eq!(out, vec![0.25, 0.5, -0.25, -0.5]);
    }

    #[test]
    fn test_stereo_segment_keeps_channels_apart() {
        let buffer = AudioBuffer::new(vec![0.2, 0.4, 0.6, 0.8], 1_000, 2);
        let out = pan_whole(&buffer, StereoPanner::default(), -0.5);
        let expected = [0.2, 0.2, 0.6, 0.4];
        assert!(out.iter().zip(expected).all(|(a, b)| close(*a, b)));
    }

    #[test]
    fn test_surround_input_is_rejected() {
        let buffer = AudioBuffer::new(vec![0.0; 12], 1_000, 3);
        let layout = SegmentLayout::new(4, 1_000, SegmentDuration::from_millis(10_000));
        let segments = buffer.segments(&layout);
        let err = StereoPanner::default().apply(&segments[0], 0.0).unwrap_err();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn test_source_segment_is_untouched() {
        let buffer = AudioBuffer::new(vec![1.0, 1.0, 1.0], 1_000, 1);
        let before = buffer.clone();
        let _ = pan_whole(&buffer, StereoPanner::new(PanLaw::Boost), 1.0);
        assert_eq!(buffer, before);
    }
}
