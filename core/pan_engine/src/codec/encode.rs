use std::io::Cursor;

use mp3lame_encoder::{Bitrate, Builder, DualPcm, FlushNoGap, Quality};

use crate::{buffer::AudioBuffer, codec::OutputFormat, error::EncodeError};

/// Encodes `buffer` into a complete file image in `format`.
pub fn encode(buffer: &AudioBuffer, format: OutputFormat) -> Result<Vec<u8>, EncodeError> {
    let bytes = match format {
        OutputFormat::Mp3 { bitrate_kbps } => encode_mp3(buffer, bitrate_kbps)?,
        OutputFormat::Wav16 => encode_wav(buffer, false)?,
        OutputFormat::WavFloat => encode_wav(buffer, true)?,
    };
    log::debug!(
        "encoded {} frames as {} ({} bytes)",
        buffer.frames(),
        format.extension(),
        bytes.len()
    );
    Ok(bytes)
}

fn encode_wav(buffer: &AudioBuffer, float: bool) -> Result<Vec<u8>, EncodeError> {
    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: if float { 32 } else { 16 },
        sample_format: if float {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };

    let mut output = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut output), spec)?;
    for &sample in buffer.samples() {
        if float {
            writer.write_sample(sample)?;
        } else {
            writer.write_sample(to_i16(sample))?;
        }
    }
    writer.finalize()?;
    Ok(output)
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

fn lame_bitrate(kbps: u32) -> Bitrate {
    match kbps {
        0..=111 => Bitrate::Kbps96,
        112..=127 => Bitrate::Kbps112,
        128..=159 => Bitrate::Kbps128,
        160..=191 => Bitrate::Kbps160,
        192..=223 => Bitrate::Kbps192,
        224..=255 => Bitrate::Kbps224,
        256..=319 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}

fn encode_mp3(buffer: &AudioBuffer, bitrate_kbps: u32) -> Result<Vec<u8>, EncodeError> {
    let (left, right): (Vec<i16>, Vec<i16>) = match buffer.channels() {
        1 => buffer
            .samples()
            .iter()
            .map(|&s| (to_i16(s), to_i16(s)))
            .unzip(),
        2 => buffer
            .samples()
            .chunks_exact(2)
            .map(|frame| (to_i16(frame[0]), to_i16(frame[1])))
            .unzip(),
        channels => return Err(EncodeError::UnsupportedChannels(channels)),
    };

    let mut builder =
        Builder::new().ok_or_else(|| EncodeError::Mp3("LAME encoder init failed".to_owned()))?;
    builder
        .set_num_channels(2)
        .map_err(|e| EncodeError::Mp3(format!("set channels: {e:?}")))?;
    builder
        .set_sample_rate(buffer.sample_rate())
        .map_err(|e| EncodeError::Mp3(format!("set sample rate: {e:?}")))?;
    builder
        .set_brate(lame_bitrate(bitrate_kbps))
        .map_err(|e| EncodeError::Mp3(format!("set bitrate: {e:?}")))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| EncodeError::Mp3(format!("set quality: {e:?}")))?;
    let mut encoder = builder
        .build()
        .map_err(|e| EncodeError::Mp3(format!("build: {e:?}")))?;

    let mut output: Vec<u8> =
        Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(left.len()));
    let encoded = encoder
        .encode(
            DualPcm {
                left: &left,
                right: &right,
            },
            output.spare_capacity_mut(),
        )
        .map_err(|e| EncodeError::Mp3(format!("encode: {e:?}")))?;
    // SAFETY: the encoder initialised exactly `encoded` bytes of spare capacity.
    unsafe {
        output.set_len(encoded);
    }

    output.reserve(7200);
    let flushed = encoder
        .flush::<FlushNoGap>(output.spare_capacity_mut())
        .map_err(|e| EncodeError::Mp3(format!("flush: {e:?}")))?;
    // SAFETY: the encoder initialised exactly `flushed` bytes past the current length.
    unsafe {
        output.set_len(output.len() + flushed);
    }

    Ok(output)
}
