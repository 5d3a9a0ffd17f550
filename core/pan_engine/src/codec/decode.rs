use std::io::Cursor;

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};

use crate::{buffer::AudioBuffer, error::DecodeError};

/// Decodes a complete encoded file held in memory.
///
/// `extension` is a format hint such as `"mp3"`; content sniffing is used
/// when it is absent or wrong. Only mono and stereo input is accepted.
/// Corrupt packets inside an otherwise readable stream are skipped.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioBuffer, DecodeError> {
    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(bytes)),
        MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let mut channels = codec_params.channels.map(|c| c.count());
    check_channels(channels)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut skipped = 0usize;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(DecodeError::Packet(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let decoded_channels = spec.channels.count();
                if *channels.get_or_insert(decoded_channels) != decoded_channels {
                    return Err(DecodeError::Codec(format!(
                        "channel count changed mid-stream to {decoded_channels}"
                    )));
                }
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                skipped += 1;
                log::warn!("skipping undecodable packet: {e}");
            }
            Err(e) => return Err(DecodeError::Codec(e.to_string())),
        }
    }

    check_channels(channels)?;
    let channels = channels.unwrap_or(1);

    let buffer = AudioBuffer::new(samples, sample_rate, channels as u16);
    log::debug!(
        "decoded {} frames @ {} Hz, {} channel(s), {} packet(s) skipped",
        buffer.frames(),
        sample_rate,
        channels,
        skipped
    );
    Ok(buffer)
}

fn check_channels(channels: Option<usize>) -> Result<(), DecodeError> {
    match channels {
        Some(count @ (0 | 3..)) => Err(DecodeError::UnsupportedChannels(count)),
        _ => Ok(()),
    }
}
