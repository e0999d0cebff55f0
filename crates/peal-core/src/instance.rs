//! Playback instance - one schedulable playback session bound to a voice
//!
//! An instance owns exactly one backend voice for its whole life. Transport
//! calls never fail for ordinary state mismatches (pausing a stopped instance
//! is a no-op); the instance only reports backend trouble at voice-creation
//! time, which happens in the pool, not here.

use std::sync::Arc;

use crate::audio::Voice;
use crate::types::{InstanceState, VoiceState};

/// One schedulable unit of playback bound to a backend voice.
///
/// State machine: `Available` → `Playing` ⇄ `Paused` → `Stopped`, then
/// recycled back to `Available` by the owning pool.
pub struct PlaybackInstance {
    /// Identity assigned by the issuing clip or pool, stable across recycles
    id: u64,
    /// Shared reference to the owning clip's payload (does not own the clip)
    data: Arc<[u8]>,
    /// The bound voice; `None` only for detached test construction
    voice: Option<Box<dyn Voice>>,
    state: InstanceState,
    volume: f32,
    pitch: f32,
    pan: f32,
    looped: bool,
}

impl PlaybackInstance {
    /// Bind a new instance to a voice and payload
    pub(crate) fn new(id: u64, data: Arc<[u8]>, voice: Box<dyn Voice>) -> Self {
        Self {
            id,
            data,
            voice: Some(voice),
            state: InstanceState::Available,
            volume: 1.0,
            pitch: 0.0,
            pan: 0.0,
            looped: false,
        }
    }

    /// Identity unique within the owning clip: pooled instances count up
    /// from zero, detached ones down from `u64::MAX`
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state, reconciled with the backend: a `Playing` instance whose
    /// voice has run out reports `Stopped` without the caller polling the
    /// backend directly.
    pub fn state(&self) -> InstanceState {
        match self.state {
            InstanceState::Playing => match self.voice.as_ref().map(|v| v.state()) {
                Some(VoiceState::Stopped) => InstanceState::Stopped,
                _ => InstanceState::Playing,
            },
            other => other,
        }
    }

    /// Set volume, pitch and pan in one call. Valid in any state; range
    /// clamping is the backend's business.
    pub fn configure(&mut self, volume: f32, pitch: f32, pan: f32) {
        self.set_volume(volume);
        self.set_pitch(pitch);
        self.set_pan(pan);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(voice) = self.voice.as_mut() {
            voice.set_volume(volume);
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
        if let Some(voice) = self.voice.as_mut() {
            voice.set_pitch(pitch);
        }
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan;
        if let Some(voice) = self.voice.as_mut() {
            voice.set_pan(pan);
        }
    }

    /// Whether the next `play()` starts the voice in looping mode
    pub fn set_looped(&mut self, looped: bool) {
        self.looped = looped;
    }

    /// Start playback from the beginning.
    ///
    /// Transitions `Available`/`Stopped` → `Playing`; a no-op while already
    /// playing or paused, and silently a no-op if no voice is bound (which
    /// pool invariants make unreachable in practice).
    pub fn play(&mut self) {
        match self.state() {
            InstanceState::Available | InstanceState::Stopped => {}
            InstanceState::Playing | InstanceState::Paused => return,
        }
        let Some(voice) = self.voice.as_mut() else {
            return;
        };
        match voice.start(Arc::clone(&self.data), self.looped) {
            Ok(()) => self.state = InstanceState::Playing,
            Err(e) => {
                log::warn!("Voice failed to start: {}", e);
                self.state = InstanceState::Stopped;
            }
        }
    }

    /// Suspend playback; no-op unless currently playing
    pub fn pause(&mut self) {
        if self.state() != InstanceState::Playing {
            return;
        }
        if let Some(voice) = self.voice.as_mut() {
            voice.pause();
        }
        self.state = InstanceState::Paused;
    }

    /// Continue from the paused position; no-op unless paused
    pub fn resume(&mut self) {
        if self.state != InstanceState::Paused {
            return;
        }
        if let Some(voice) = self.voice.as_mut() {
            voice.resume();
        }
        self.state = InstanceState::Playing;
    }

    /// Halt playback immediately, regardless of what the voice reports.
    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(voice) = self.voice.as_mut() {
            voice.stop();
        }
        self.state = InstanceState::Stopped;
    }

    /// Return the instance to the reusable state. Pool-internal: only called
    /// after the instance was observed stopped, so the voice is never
    /// mid-playback here.
    pub(crate) fn recycle(&mut self) {
        self.state = InstanceState::Available;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockBackend;
    use crate::audio::VoiceBackend;
    use crate::types::{Channels, ClipFormat};

    fn test_instance(backend: &MockBackend) -> PlaybackInstance {
        let format = ClipFormat::new(44100, Channels::Mono);
        let voice = backend.create_voice(&format).unwrap();
        let data: Arc<[u8]> = vec![0u8; 64].into();
        PlaybackInstance::new(0, data, voice)
    }

    #[test]
    fn test_play_transitions_to_playing() {
        let backend = MockBackend::new();
        let mut instance = test_instance(&backend);
        assert_eq!(instance.state(), InstanceState::Available);

        instance.play();
        assert_eq!(instance.state(), InstanceState::Playing);
        assert_eq!(backend.voice(0).starts.load(std::sync::atomic::Ordering::Relaxed), 1);

        // Playing again is a no-op, not a restart
        instance.play();
        assert_eq!(backend.voice(0).starts.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_state_reflects_backend_completion() {
        let backend = MockBackend::new();
        let mut instance = test_instance(&backend);
        instance.play();

        backend.voice(0).finish();
        assert_eq!(instance.state(), InstanceState::Stopped);
    }

    #[test]
    fn test_pause_resume_cycle() {
        let backend = MockBackend::new();
        let mut instance = test_instance(&backend);

        // Pause before playing is a no-op
        instance.pause();
        assert_eq!(instance.state(), InstanceState::Available);

        instance.play();
        instance.pause();
        assert_eq!(instance.state(), InstanceState::Paused);

        instance.resume();
        assert_eq!(instance.state(), InstanceState::Playing);

        // Resume while playing is a no-op
        instance.resume();
        assert_eq!(instance.state(), InstanceState::Playing);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let backend = MockBackend::new();
        let mut instance = test_instance(&backend);
        instance.play();

        instance.stop();
        assert_eq!(instance.state(), InstanceState::Stopped);
        instance.stop();
        assert_eq!(instance.state(), InstanceState::Stopped);

        // Pause after stop stays a no-op
        instance.pause();
        assert_eq!(instance.state(), InstanceState::Stopped);
    }

    #[test]
    fn test_replay_after_stop() {
        let backend = MockBackend::new();
        let mut instance = test_instance(&backend);

        instance.play();
        instance.stop();
        instance.play();
        assert_eq!(instance.state(), InstanceState::Playing);
        assert_eq!(backend.voice(0).starts.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn test_configure_valid_in_any_state() {
        let backend = MockBackend::new();
        let mut instance = test_instance(&backend);

        instance.configure(0.3, -0.5, 1.0);
        assert_eq!(instance.volume(), 0.3);
        assert_eq!(instance.pitch(), -0.5);
        assert_eq!(instance.pan(), 1.0);

        instance.play();
        instance.stop();
        instance.configure(0.9, 0.0, -1.0);
        assert_eq!(instance.volume(), 0.9);
    }
}
