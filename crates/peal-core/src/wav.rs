//! Minimal PCM RIFF/WAVE container handling
//!
//! Peal stores clips as raw PCM plus a [`ClipFormat`]; this module synthesizes
//! the self-describing container around a raw payload (for recording-style
//! input and export) and parses one back. Only canonical 16-bit PCM is
//! supported — compressed containers go through [`crate::decoder`] instead.

use thiserror::Error;

use crate::types::{Channels, ClipFormat, BITS_PER_SAMPLE};

/// Size of the synthesized header: RIFF(12) + fmt(24) + data header(8)
pub const HEADER_LEN: usize = 44;

/// Largest payload a RIFF container can carry: the chunk size fields are
/// 32-bit, and the outer field stores 36 + data length
pub const MAX_DATA_LEN: usize = (u32::MAX - 36) as usize;

/// WAVE format tag for integer PCM
const FORMAT_TAG_PCM: u16 = 1;

/// Container parsing errors
#[derive(Error, Debug)]
pub enum WavError {
    /// Stream does not start with a RIFF/WAVE signature
    #[error("Not a RIFF/WAVE stream")]
    NotRiff,

    /// A required chunk is absent
    #[error("Missing required chunk: {0}")]
    MissingChunk(&'static str),

    /// Stream ended inside a declared chunk
    #[error("Truncated stream: {0}")]
    Truncated(&'static str),

    /// Format tag is not integer PCM
    #[error("Unsupported format tag: {0}")]
    UnsupportedFormatTag(u16),

    /// Bit depth other than 16
    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    /// Channel count other than mono/stereo
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(u16),

    /// Declared sample rate of zero
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Payload too large for the container's 32-bit size fields
    #[error("Payload of {0} bytes exceeds the container size limit")]
    PayloadTooLarge(usize),
}

/// Result type for container operations
pub type WavResult<T> = Result<T, WavError>;

/// Synthesize a canonical little-endian PCM container around raw samples.
///
/// Layout: "RIFF", total-size-minus-8, "WAVE", a 16-byte "fmt " sub-chunk
/// (tag=1, channels, rate, byte rate, block align, 16 bits), then the "data"
/// sub-chunk carrying `samples` verbatim. Payloads over [`MAX_DATA_LEN`]
/// cannot be represented in the 32-bit size fields and are rejected.
pub fn encode(samples: &[u8], sample_rate: u32, channels: Channels) -> WavResult<Vec<u8>> {
    check_payload_len(samples.len())?;
    let format = ClipFormat::new(sample_rate, channels);
    let mut out = Vec::with_capacity(HEADER_LEN + samples.len());

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + samples.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_TAG_PCM.to_le_bytes());
    out.extend_from_slice(&channels.count().to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&format.byte_rate().to_le_bytes());
    out.extend_from_slice(&format.block_align().to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    out.extend_from_slice(samples);

    Ok(out)
}

/// Synthesize a container from 16-bit samples instead of raw bytes
pub fn encode_samples(samples: &[i16], sample_rate: u32, channels: Channels) -> WavResult<Vec<u8>> {
    encode(bytemuck::cast_slice(samples), sample_rate, channels)
}

fn check_payload_len(len: usize) -> WavResult<()> {
    if len > MAX_DATA_LEN {
        return Err(WavError::PayloadTooLarge(len));
    }
    Ok(())
}

/// Parse a canonical PCM container, returning the raw sample bytes and format.
///
/// Walks the chunk list the same way regardless of chunk order and skips
/// unknown chunks (word-aligned), so streams with extra metadata chunks parse
/// fine as long as `fmt ` and `data` are present.
pub fn decode(bytes: &[u8]) -> WavResult<(Vec<u8>, ClipFormat)> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(WavError::NotRiff);
    }

    let mut format: Option<ClipFormat> = None;
    let mut data: Option<Vec<u8>> = None;
    let mut pos = 12;

    while pos + 8 <= bytes.len() {
        let chunk_id = &bytes[pos..pos + 4];
        let chunk_size = read_u32(bytes, pos + 4) as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > bytes.len() {
                    return Err(WavError::Truncated("fmt "));
                }
                format = Some(parse_fmt(&bytes[body..body + 16])?);
            }
            b"data" => {
                if body + chunk_size > bytes.len() {
                    return Err(WavError::Truncated("data"));
                }
                data = Some(bytes[body..body + chunk_size].to_vec());
            }
            _ => {}
        }

        // Advance past the chunk, padding to a word boundary
        pos = body + chunk_size + (chunk_size & 1);
    }

    let format = format.ok_or(WavError::MissingChunk("fmt "))?;
    let data = data.ok_or(WavError::MissingChunk("data"))?;
    Ok((data, format))
}

/// Parse the 16-byte PCM portion of a fmt chunk
fn parse_fmt(fmt: &[u8]) -> WavResult<ClipFormat> {
    let format_tag = read_u16(fmt, 0);
    if format_tag != FORMAT_TAG_PCM {
        return Err(WavError::UnsupportedFormatTag(format_tag));
    }

    let channel_count = read_u16(fmt, 2);
    let channels = Channels::from_count(channel_count)
        .ok_or(WavError::UnsupportedChannelCount(channel_count))?;

    let sample_rate = read_u32(fmt, 4);
    if sample_rate == 0 {
        return Err(WavError::InvalidSampleRate(0));
    }

    let bits_per_sample = read_u16(fmt, 14);
    if bits_per_sample != BITS_PER_SAMPLE {
        return Err(WavError::UnsupportedBitDepth(bits_per_sample));
    }

    Ok(ClipFormat::new(sample_rate, channels))
}

#[inline]
fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
