//! Global mixer state
//!
//! Process-wide playback knobs: master volume plus the spatialization scales
//! consumed by 3D math outside this crate. Modeled as one explicit, injectable
//! object (created by [`crate::context::AudioContext`]) instead of hidden
//! statics, so tests can construct and reset it freely.
//!
//! Values live in lock-free atomic f32 storage; reads from the facade's hot
//! path never take a lock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::audio::VoiceBackend;

/// Default speed of sound in meters per second
pub const DEFAULT_SPEED_OF_SOUND: f32 = 343.5;

/// Errors from mixer knob setters
#[derive(Error, Debug)]
pub enum MixerError {
    /// Value outside the knob's legal range; state is unchanged
    #[error("Value out of range for {param}: {value}")]
    OutOfRange { param: &'static str, value: f32 },
}

/// Result type for mixer operations
pub type MixerResult<T> = Result<T, MixerError>;

/// Process-wide mixer knobs
///
/// Defaults: master volume 1.0, distance scale 1.0, doppler scale 1.0,
/// speed of sound 343.5.
pub struct GlobalMixerState {
    master_volume: AtomicU32,
    distance_scale: AtomicU32,
    doppler_scale: AtomicU32,
    speed_of_sound: AtomicU32,
    backend: Arc<dyn VoiceBackend>,
}

impl GlobalMixerState {
    /// Create mixer state bound to a backend master bus and push the
    /// default master volume to it
    pub fn new(backend: Arc<dyn VoiceBackend>) -> Self {
        let state = Self {
            master_volume: AtomicU32::new(1.0f32.to_bits()),
            distance_scale: AtomicU32::new(1.0f32.to_bits()),
            doppler_scale: AtomicU32::new(1.0f32.to_bits()),
            speed_of_sound: AtomicU32::new(DEFAULT_SPEED_OF_SOUND.to_bits()),
            backend,
        };
        state.backend.set_master_volume(state.master_volume());
        state
    }

    /// Current master bus volume
    #[inline]
    pub fn master_volume(&self) -> f32 {
        f32::from_bits(self.master_volume.load(Ordering::Relaxed))
    }

    /// Set the master bus volume. Not clamped; values <= 0.0 mute the
    /// [`crate::clip::AudioClip::play`] gate. Pushes to the backend master
    /// bus only when the value actually changed.
    pub fn set_master_volume(&self, volume: f32) {
        let previous = f32::from_bits(
            self.master_volume
                .swap(volume.to_bits(), Ordering::Relaxed),
        );
        if previous != volume {
            self.backend.set_master_volume(volume);
        }
    }

    /// Current distance scale applied to 3D attenuation
    #[inline]
    pub fn distance_scale(&self) -> f32 {
        f32::from_bits(self.distance_scale.load(Ordering::Relaxed))
    }

    /// Set the distance scale; must be > 0
    pub fn set_distance_scale(&self, scale: f32) -> MixerResult<()> {
        if scale <= 0.0 {
            return Err(MixerError::OutOfRange {
                param: "distance_scale",
                value: scale,
            });
        }
        self.distance_scale.store(scale.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Current doppler scale applied to 3D pitch shifts
    #[inline]
    pub fn doppler_scale(&self) -> f32 {
        f32::from_bits(self.doppler_scale.load(Ordering::Relaxed))
    }

    /// Set the doppler scale; must be >= 0
    pub fn set_doppler_scale(&self, scale: f32) -> MixerResult<()> {
        if scale < 0.0 {
            return Err(MixerError::OutOfRange {
                param: "doppler_scale",
                value: scale,
            });
        }
        self.doppler_scale.store(scale.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Current speed of sound in meters per second
    #[inline]
    pub fn speed_of_sound(&self) -> f32 {
        f32::from_bits(self.speed_of_sound.load(Ordering::Relaxed))
    }

    /// Set the speed of sound (unclamped)
    pub fn set_speed_of_sound(&self, speed: f32) {
        self.speed_of_sound.store(speed.to_bits(), Ordering::Relaxed);
    }
}
