//! Boundary between encoded audio bytes and in-memory sample buffers.

use std::path::Path;

pub mod decode;
pub mod encode;

pub use decode::decode;
pub use encode::encode;

use crate::constants::DEFAULT_MP3_BITRATE_KBPS;

/// Container and sample encoding for rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp3 { bitrate_kbps: u32 },
    /// 16-bit integer PCM.
    Wav16,
    /// 32-bit float PCM.
    WavFloat,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Mp3 {
            bitrate_kbps: DEFAULT_MP3_BITRATE_KBPS,
        }
    }
}

impl OutputFormat {
    /// `.wav` selects 16-bit WAV; any other extension gets MP3.
    pub fn for_path(path: &Path, mp3_bitrate_kbps: u32) -> Self {
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if is_wav {
            Self::Wav16
        } else {
            Self::Mp3 {
                bitrate_kbps: mp3_bitrate_kbps,
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 { .. } => "mp3",
            Self::Wav16 | Self::WavFloat => "wav",
        }
    }
}

#[cfg(test)]
mod output_format_tests {
    use super::*;

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(OutputFormat::for_path(Path::new("out.WAV"), 128), OutputFormat::Wav16);
        assert_eq!(
            OutputFormat::for_path(Path::new("out.mp3"), 128),
            OutputFormat::Mp3 { bitrate_kbps: 128 }
        );
        assert_eq!(
            OutputFormat::for_path(Path::new("no_extension"), 320),
            OutputFormat::Mp3 { bitrate_kbps: 320 }
        );
    }

    #[test]
    fn test_default_is_mp3() {
        assert_eq!(OutputFormat::default().extension(), "mp3");
    }
}
