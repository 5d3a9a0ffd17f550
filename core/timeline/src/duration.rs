/// Nominal length of one panning segment, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentDuration(u32);

impl SegmentDuration {
    /// Zero-length segments are meaningless; they are raised to 1 ms.
    pub const fn from_millis(ms: u32) -> Self {
        if ms == 0 { Self(1) } else { Self(ms) }
    }

    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Frame offset of `ms` milliseconds at `sample_rate`, floored.
    pub fn frames_at(ms: u64, sample_rate: u32) -> usize {
        (u128::from(ms) * u128::from(sample_rate) / 1000) as usize
    }

    /// Frame offset at which segment `index` starts.
    pub fn boundary(self, index: usize, sample_rate: u32) -> usize {
        Self::frames_at(index as u64 * u64::from(self.0), sample_rate)
    }

    /// Number of whole segments that fit in `total_frames`
    /// (`floor(duration_ms / segment_ms)`, computed without rounding loss).
    pub fn whole_segments_in(self, total_frames: usize, sample_rate: u32) -> usize {
        if sample_rate == 0 {
            return 0;
        }
        let numerator = total_frames as u128 * 1000;
        let denominator = u128::from(self.0) * u128::from(sample_rate);
        (numerator / denominator) as usize
    }
}

impl Default for SegmentDuration {
    fn default() -> Self {
        Self(50)
    }
}
