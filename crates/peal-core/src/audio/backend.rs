//! Voice backend trait for platform-specific implementations
//!
//! Defines the seam between the instance/pool layer and the platform audio
//! system. A backend is selected once at [`crate::context::AudioContext`]
//! bring-up; nothing above this trait knows which platform it runs on.
//!
//! A *voice* is one backend-native resource able to stream a single buffer
//! to the output device. Voices are created per playback instance and reused
//! across plays for the lifetime of the owning clip.

use std::sync::Arc;

use crate::types::{ClipFormat, VoiceState};

use super::error::AudioResult;

/// One backend-native playback resource.
///
/// Transport calls are non-blocking; completion is observed by polling
/// [`Voice::state`], never via callback.
pub trait Voice {
    /// Begin playback of `data` (raw PCM in the voice's bound format) from
    /// the start. Restarting an already-playing voice rewinds it.
    fn start(&mut self, data: Arc<[u8]>, looped: bool) -> AudioResult<()>;

    /// Halt playback immediately. Idempotent.
    fn stop(&mut self);

    /// Suspend playback, keeping position. No-op unless playing.
    fn pause(&mut self);

    /// Continue from the paused position. No-op unless paused.
    fn resume(&mut self);

    /// Current transport state as reported by the backend
    fn state(&self) -> VoiceState;

    /// Per-voice gain. Clamping is backend-defined.
    fn set_volume(&mut self, volume: f32);

    /// Playback rate offset in octaves (0.0 = native rate). Clamping is
    /// backend-defined.
    fn set_pitch(&mut self, pitch: f32);

    /// Stereo balance, -1.0 (left) to 1.0 (right). Clamping is
    /// backend-defined.
    fn set_pan(&mut self, pan: f32);
}

/// Factory for voices plus the process-wide master bus.
pub trait VoiceBackend {
    /// Create a voice able to play PCM in `format`.
    ///
    /// Fails with [`super::error::AudioError`] when the device cannot supply
    /// another stream; callers treat this as non-fatal and degrade to silence.
    fn create_voice(&self, format: &ClipFormat) -> AudioResult<Box<dyn Voice>>;

    /// Push a new master bus volume to the device output stage
    fn set_master_volume(&self, volume: f32);
}
