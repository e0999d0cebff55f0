//! Common types for Peal
//!
//! Fundamental format and state types shared by the clip, instance pool and
//! voice backend layers.

/// Bit depth of all clip payloads. Clips are stored as 16-bit little-endian
/// PCM regardless of the source container's depth.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Default sample rate for synthesized raw-PCM clips (CD rate)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Channel layout of a clip payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Channels {
    Mono = 1,
    Stereo = 2,
}

impl Channels {
    /// Convert from a raw channel count (1 or 2)
    pub fn from_count(count: u16) -> Option<Self> {
        match count {
            1 => Some(Channels::Mono),
            2 => Some(Channels::Stereo),
            _ => None,
        }
    }

    /// Number of channels as an integer
    #[inline]
    pub fn count(&self) -> u16 {
        *self as u16
    }
}

/// Format metadata describing a clip's raw PCM payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipFormat {
    /// Sample rate in Hz (e.g. 44100, 48000)
    pub sample_rate: u32,
    /// Channel layout (mono or stereo)
    pub channels: Channels,
    /// Bits per sample (always 16, kept explicit for the container header)
    pub bits_per_sample: u16,
}

impl ClipFormat {
    /// Create a format descriptor at the fixed 16-bit depth
    pub fn new(sample_rate: u32, channels: Channels) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }

    /// Bytes per sample frame: (bits / 8) * channels
    #[inline]
    pub fn block_align(&self) -> u16 {
        (self.bits_per_sample / 8) * self.channels.count()
    }

    /// Bytes consumed per second of playback: sample_rate * block_align
    #[inline]
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Playback duration of `payload_len` bytes of PCM in this format
    pub fn duration(&self, payload_len: usize) -> std::time::Duration {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(payload_len as f64 / byte_rate as f64)
    }
}

/// State reported by a backend voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Lifecycle state of a playback instance
///
/// `Available` instances are pool-owned and hold no mid-playback voice;
/// `Stopped` instances are waiting to be swept back into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceState {
    #[default]
    Available,
    Playing,
    Paused,
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_format_derived_fields() {
        let fmt = ClipFormat::new(44100, Channels::Stereo);
        assert_eq!(fmt.block_align(), 4);
        assert_eq!(fmt.byte_rate(), 44100 * 4);

        let mono = ClipFormat::new(22050, Channels::Mono);
        assert_eq!(mono.block_align(), 2);
        assert_eq!(mono.byte_rate(), 44100);
    }

    #[test]
    fn test_duration_from_payload() {
        let fmt = ClipFormat::new(44100, Channels::Stereo);
        // One second of stereo 16-bit audio
        let dur = fmt.duration(44100 * 4);
        assert_eq!(dur.as_millis(), 1000);

        assert_eq!(fmt.duration(0), std::time::Duration::ZERO);
    }

    #[test]
    fn test_channels_from_count() {
        assert_eq!(Channels::from_count(1), Some(Channels::Mono));
        assert_eq!(Channels::from_count(2), Some(Channels::Stereo));
        assert_eq!(Channels::from_count(6), None);
    }
}
