//! CPAL voice backend implementation
//!
//! Each voice owns one CPAL output stream fed from the clip's shared PCM
//! payload. The stream runs for the lifetime of the voice and emits silence
//! whenever the voice is stopped or paused, so transport changes never tear
//! streams down.
//!
//! The audio callback reads transport state from atomics and takes a short
//! mutex only to reach the bound buffer; the control thread holds that mutex
//! only inside `start()`.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use crate::types::{ClipFormat, VoiceState};

use super::backend::{Voice, VoiceBackend};
use super::error::{AudioError, AudioResult};

const STATE_STOPPED: u8 = 0;
const STATE_PLAYING: u8 = 1;
const STATE_PAUSED: u8 = 2;

/// CPAL-backed voice factory
///
/// Negotiates the output device and stream configuration once at
/// construction; every voice created afterwards uses the same device.
pub struct CpalVoiceBackend {
    device: cpal::Device,
    config: StreamConfig,
    /// Master bus gain as f32 bits, shared with every voice callback
    master_volume: Arc<AtomicU32>,
}

impl CpalVoiceBackend {
    /// Open the default output device and negotiate a stream configuration
    pub fn new() -> AudioResult<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevices)?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let config = get_output_config(&device)?;
        log::info!(
            "Audio config: {} channels, {}Hz",
            config.channels,
            config.sample_rate.0
        );

        Ok(Self {
            device,
            config,
            master_volume: Arc::new(AtomicU32::new(1.0f32.to_bits())),
        })
    }

    /// Sample rate of the negotiated output stream
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

impl VoiceBackend for CpalVoiceBackend {
    fn create_voice(&self, format: &ClipFormat) -> AudioResult<Box<dyn Voice>> {
        let shared = Arc::new(VoiceShared {
            control: Mutex::new(VoiceControl {
                data: None,
                looped: false,
            }),
            position: AtomicU64::new(0f64.to_bits()),
            state: AtomicU8::new(STATE_STOPPED),
            volume: AtomicU32::new(1.0f32.to_bits()),
            pitch: AtomicU32::new(0.0f32.to_bits()),
            pan: AtomicU32::new(0.0f32.to_bits()),
            master: Arc::clone(&self.master_volume),
            clip_rate: format.sample_rate,
            clip_channels: format.channels.count(),
            out_rate: self.config.sample_rate.0,
            out_channels: self.config.channels as usize,
        });

        let stream = build_voice_stream(&self.device, &self.config, Arc::clone(&shared))?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        Ok(Box::new(CpalVoice {
            shared,
            _stream: stream,
        }))
    }

    fn set_master_volume(&self, volume: f32) {
        self.master_volume.store(volume.to_bits(), Ordering::Relaxed);
    }
}

/// Buffer binding, changed only by `Voice::start`
struct VoiceControl {
    data: Option<Arc<[u8]>>,
    looped: bool,
}

/// State shared between the control thread and the audio callback
struct VoiceShared {
    control: Mutex<VoiceControl>,
    /// Playhead in clip frames, f64 bits (written by the callback)
    position: AtomicU64,
    state: AtomicU8,
    volume: AtomicU32,
    pitch: AtomicU32,
    pan: AtomicU32,
    master: Arc<AtomicU32>,
    clip_rate: u32,
    clip_channels: u16,
    out_rate: u32,
    out_channels: usize,
}

impl VoiceShared {
    #[inline]
    fn load_f32(atomic: &AtomicU32) -> f32 {
        f32::from_bits(atomic.load(Ordering::Relaxed))
    }
}

/// A single CPAL output stream bound to one playback instance
struct CpalVoice {
    shared: Arc<VoiceShared>,
    /// Keeps the stream alive; dropped with the voice
    _stream: Stream,
}

impl Voice for CpalVoice {
    fn start(&mut self, data: Arc<[u8]>, looped: bool) -> AudioResult<()> {
        {
            let mut control = self
                .shared
                .control
                .lock()
                .map_err(|_| AudioError::BackendUnavailable("voice state poisoned".to_string()))?;
            control.data = Some(data);
            control.looped = looped;
        }
        self.shared.position.store(0f64.to_bits(), Ordering::Relaxed);
        self.shared.state.store(STATE_PLAYING, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.state.store(STATE_STOPPED, Ordering::Relaxed);
    }

    fn pause(&mut self) {
        // Only pause an actively playing voice
        let _ = self.shared.state.compare_exchange(
            STATE_PLAYING,
            STATE_PAUSED,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    fn resume(&mut self) {
        let _ = self.shared.state.compare_exchange(
            STATE_PAUSED,
            STATE_PLAYING,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    fn state(&self) -> VoiceState {
        match self.shared.state.load(Ordering::Relaxed) {
            STATE_PLAYING => VoiceState::Playing,
            STATE_PAUSED => VoiceState::Paused,
            _ => VoiceState::Stopped,
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.shared
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.shared
            .pitch
            .store(pitch.clamp(-1.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn set_pan(&mut self, pan: f32) {
        self.shared
            .pan
            .store(pan.clamp(-1.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

/// Pick an f32, stereo-capable output configuration for the device
fn get_output_config(device: &cpal::Device) -> AudioResult<StreamConfig> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    if supported_configs.is_empty() {
        return Err(AudioError::ConfigError(
            "No supported output configurations".to_string(),
        ));
    }

    let best_config = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .find(|c| c.channels() >= 2)
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32)
        })
        .ok_or_else(|| {
            AudioError::UnsupportedFormat("device offers no f32 output".to_string())
        })?;

    // Prefer the device's maximum rate; clips are resampled per voice anyway
    let config = best_config.clone().with_max_sample_rate();

    Ok(StreamConfig {
        channels: config.channels(),
        sample_rate: config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    })
}

/// Build the output stream for one voice
fn build_voice_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    shared: Arc<VoiceShared>,
) -> AudioResult<Stream> {
    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                render_voice(&shared, data);
            },
            move |err| {
                log::error!("Voice stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    Ok(stream)
}

/// Fill one callback buffer from the voice's bound clip payload
fn render_voice(shared: &VoiceShared, out: &mut [f32]) {
    if shared.state.load(Ordering::Relaxed) != STATE_PLAYING {
        out.fill(0.0);
        return;
    }

    let control = match shared.control.lock() {
        Ok(guard) => guard,
        Err(_) => {
            out.fill(0.0);
            return;
        }
    };
    let data = match control.data.as_ref() {
        Some(data) => data,
        None => {
            out.fill(0.0);
            return;
        }
    };

    let block_align = shared.clip_channels as usize * 2;
    let total_frames = data.len() / block_align;
    if total_frames == 0 {
        shared.state.store(STATE_STOPPED, Ordering::Relaxed);
        out.fill(0.0);
        return;
    }

    let volume = VoiceShared::load_f32(&shared.volume);
    let master = f32::from_bits(shared.master.load(Ordering::Relaxed));
    let pitch = VoiceShared::load_f32(&shared.pitch);
    let pan = VoiceShared::load_f32(&shared.pan);

    // Linear pan law over a shared gain stage
    let gain = volume * master;
    let left_gain = gain * if pan > 0.0 { 1.0 - pan } else { 1.0 };
    let right_gain = gain * if pan < 0.0 { 1.0 + pan } else { 1.0 };

    // Pitch is octaves relative to native rate
    let step =
        shared.clip_rate as f64 / shared.out_rate as f64 * 2f64.powf(pitch as f64);

    let mut position = f64::from_bits(shared.position.load(Ordering::Relaxed));
    let out_channels = shared.out_channels;
    let mut finished = false;

    for frame in out.chunks_mut(out_channels) {
        if position >= total_frames as f64 {
            if control.looped {
                position %= total_frames as f64;
            } else {
                finished = true;
            }
        }
        if finished {
            frame.fill(0.0);
            continue;
        }

        let (left, right) = sample_frame(data, position, total_frames, shared.clip_channels);
        frame[0] = left * left_gain;
        if out_channels > 1 {
            frame[1] = right * right_gain;
        }
        for ch in frame.iter_mut().skip(2) {
            *ch = 0.0;
        }

        position += step;
    }

    shared.position.store(position.to_bits(), Ordering::Relaxed);
    if finished {
        shared.state.store(STATE_STOPPED, Ordering::Relaxed);
    }
}

/// Read one interpolated stereo frame from 16-bit interleaved PCM
#[inline]
fn sample_frame(data: &[u8], position: f64, total_frames: usize, channels: u16) -> (f32, f32) {
    let idx = position as usize;
    let frac = (position - idx as f64) as f32;
    let next = if idx + 1 < total_frames { idx + 1 } else { idx };

    let (l0, r0) = read_frame(data, idx, channels);
    let (l1, r1) = read_frame(data, next, channels);

    (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
}

/// Read one stereo frame, duplicating mono into both channels
#[inline]
fn read_frame(data: &[u8], frame: usize, channels: u16) -> (f32, f32) {
    const SCALE: f32 = 1.0 / 32768.0;
    let base = frame * channels as usize * 2;
    let left = i16::from_le_bytes([data[base], data[base + 1]]) as f32 * SCALE;
    if channels == 1 {
        (left, left)
    } else {
        let right = i16::from_le_bytes([data[base + 2], data[base + 3]]) as f32 * SCALE;
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_frame_mono_duplicates() {
        let data: Vec<u8> = bytemuck::cast_slice(&[1000i16, -2000i16]).to_vec();
        let (l, r) = read_frame(&data, 0, 1);
        assert_eq!(l, r);
        assert!((l - 1000.0 / 32768.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sample_frame_interpolates() {
        // Two mono frames: 0 then 32767; halfway should be ~0.5
        let data: Vec<u8> = bytemuck::cast_slice(&[0i16, 32767i16]).to_vec();
        let (l, _) = sample_frame(&data, 0.5, 2, 1);
        assert!((l - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_sample_frame_clamps_at_end() {
        let data: Vec<u8> = bytemuck::cast_slice(&[100i16, 200i16]).to_vec();
        // Last frame interpolates against itself
        let (l, _) = sample_frame(&data, 1.5, 2, 1);
        assert!((l - 200.0 / 32768.0).abs() < f32::EPSILON);
    }
}
