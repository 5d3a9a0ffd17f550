use std::sync::Arc;

use timeline::{SegmentDuration, SegmentLayout};

use crate::{config::PipelineConfig, onset::OnsetEnvelope, waveform::triangle};

/// How pan positions are derived across the timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PanMode {
    /// `frequency` full triangle sweeps across the clip.
    FixedWaveform { frequency: u32, amplitude: f32 },
    /// Sine sweep whose speed follows the onset-strength envelope.
    OnsetDriven { envelope: Arc<OnsetEnvelope> },
}

impl PanMode {
    pub fn segment_duration(&self, config: &PipelineConfig) -> SegmentDuration {
        match self {
            Self::FixedWaveform { .. } => SegmentDuration::from_millis(config.fixed_segment_ms),
            Self::OnsetDriven { .. } => SegmentDuration::from_millis(config.dynamic_segment_ms),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FixedWaveform { .. } => "fixed",
            Self::OnsetDriven { .. } => "dynamic",
        }
    }
}

/// Pan position for one segment. `-1.0` = left, `0.0` = centre, `1.0` = right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanDirective {
    pub index: usize,
    pub value: f32,
}

/// Triangle pans for `segment_count` whole segments plus, when `with_tail`,
/// the trailing partial segment at index `segment_count`.
pub fn plan_fixed(
    segment_count: usize,
    with_tail: bool,
    frequency: u32,
    amplitude: f32,
) -> Vec<PanDirective> {
    if segment_count == 0 {
        return vec![PanDirective {
            index: 0,
            value: triangle(0.0, amplitude),
        }];
    }

    let total = segment_count + usize::from(with_tail);
    (0..total)
        .map(|index| {
            let phase = index as f64 * f64::from(frequency) / segment_count as f64;
            PanDirective {
                index,
                value: triangle(phase, amplitude),
            }
        })
        .collect()
}

/// Onset-driven pans for `segment_count` whole segments.
pub fn plan_dynamic(envelope: &OnsetEnvelope, segment_count: usize) -> Vec<PanDirective> {
    (0..segment_count)
        .map(|index| PanDirective {
            index,
            value: envelope.smooth_pan(index, segment_count),
        })
        .collect()
}

/// Maps a [`PanMode`] onto one directive per span of a [`SegmentLayout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentPlanner;

impl SegmentPlanner {
    pub fn plan(mode: &PanMode, layout: &SegmentLayout) -> Vec<PanDirective> {
        let whole = layout.full_segments();
        let directives = match mode {
            PanMode::FixedWaveform {
                frequency,
                amplitude,
            } => plan_fixed(whole, layout.has_tail(), *frequency, *amplitude),
            PanMode::OnsetDriven { envelope } if whole == 0 => vec![PanDirective {
                index: 0,
                value: envelope.smooth_pan(0, 1),
            }],
            PanMode::OnsetDriven { envelope } => {
                let mut directives = plan_dynamic(envelope, whole);
                // the tail keeps the last whole segment's position
                if let Some(last) = directives.last().copied().filter(|_| layout.has_tail()) {
                    directives.push(PanDirective {
                        index: whole,
                        value: last.value,
                    });
                }
                directives
            }
        };

        log::debug!(
            "planned {} {} pan directives ({} whole segments)",
            directives.len(),
            mode.name(),
            whole
        );
        directives
    }
}
