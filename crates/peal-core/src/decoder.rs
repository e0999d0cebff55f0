//! Encoded-container decoding (Symphonia)
//!
//! Turns an encoded byte stream (wav, flac, mp3, ogg/vorbis) into the raw
//! 16-bit interleaved PCM payload a clip stores. Canonical PCM WAV streams
//! take a fast path through [`crate::wav`]; everything else is probed and
//! fully decoded up front — Peal clips are always fully buffered.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

use crate::types::{Channels, ClipFormat};
use crate::wav;

/// Decoding errors
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Container/codec not recognized by the probe
    #[error("Unsupported or invalid audio format: {0}")]
    UnsupportedFormat(String),

    /// Container recognized but holds no decodable audio track
    #[error("No audio track found")]
    NoAudioTrack,

    /// Track is missing a sample rate declaration
    #[error("Unknown sample rate")]
    UnknownSampleRate,

    /// More channels than the engine supports
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(u16),

    /// Stream decoded to zero frames
    #[error("Stream contains no audio data")]
    EmptyStream,

    /// Canonical PCM container failed to parse
    #[error("Container error: {0}")]
    Container(#[from] wav::WavError),
}

/// Result type for decoding operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Decoded audio ready for clip construction
#[derive(Debug)]
pub struct DecodedAudio {
    /// Raw 16-bit little-endian interleaved PCM
    pub data: Vec<u8>,
    /// Format of the payload
    pub format: ClipFormat,
}

/// Decode an encoded byte stream into raw PCM plus format metadata.
///
/// `extension` is an optional container hint (e.g. "mp3") passed through to
/// the probe; decoding works without it.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> DecodeResult<DecodedAudio> {
    // Canonical PCM WAV doesn't need a codec pass
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        if let Ok((data, format)) = wav::decode(&bytes) {
            return Ok(DecodedAudio { data, format });
        }
        // Non-canonical WAV (float, 24-bit, ...) falls through to symphonia
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .filter(|&rate| rate > 0)
        .ok_or(DecodeError::UnknownSampleRate)?;

    let channel_count = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(2);
    let channels = Channels::from_count(channel_count)
        .ok_or(DecodeError::UnsupportedChannelCount(channel_count))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<i16> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Error decoding packet: {}", e);
                continue;
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::EmptyStream);
    }

    Ok(DecodedAudio {
        data: bytemuck::cast_slice(&samples).to_vec(),
        format: ClipFormat::new(sample_rate, channels),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav;

    #[test]
    fn test_decode_canonical_wav_fast_path() {
        let samples: Vec<i16> = (0..100).map(|i| i as i16).collect();
        let encoded = wav::encode_samples(&samples, 44100, Channels::Stereo).unwrap();

        let decoded = decode(encoded, Some("wav")).expect("decode failed");
        assert_eq!(decoded.data, bytemuck::cast_slice::<i16, u8>(&samples));
        assert_eq!(decoded.format.sample_rate, 44100);
        assert_eq!(decoded.format.channels, Channels::Stereo);
    }

    #[test]
    fn test_decode_garbage_is_unsupported() {
        let result = decode(vec![0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0], None);
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(_))));
    }
}
