//! Audio clip - fully buffered PCM payload plus the fire-and-forget facade
//!
//! An `AudioClip` owns an immutable PCM payload, its format metadata, and a
//! private instance pool. `play()` is the one-call entry point: it gates on
//! master volume, reclaims finished instances, and starts a configured
//! instance — the caller gets no handle back. Callers that want transport
//! control use `create_instance()` instead, which hands out an instance the
//! pool never tracks.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::audio::{AudioResult, VoiceBackend};
use crate::context::AudioContext;
use crate::decoder::{self, DecodeError};
use crate::instance::PlaybackInstance;
use crate::mixer::GlobalMixerState;
use crate::pool::InstancePool;
use crate::types::{Channels, ClipFormat};
use crate::wav;

/// Errors from clip construction
#[derive(Error, Debug)]
pub enum ClipError {
    /// The source file could not be read
    #[error("Audio resource not found: {path}")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The byte stream could not be decoded into PCM
    #[error("Failed to decode audio: {0}")]
    LoadFailure(#[from] DecodeError),

    /// Raw PCM input violates the payload rules
    #[error("Invalid PCM payload: {0}")]
    InvalidPayload(&'static str),

    /// The payload cannot be represented in a RIFF container
    #[error("Container error: {0}")]
    Container(#[from] wav::WavError),
}

/// Result type for clip construction
pub type ClipResult<T> = Result<T, ClipError>;

/// An immutable, fully buffered audio clip
pub struct AudioClip {
    name: String,
    /// Raw 16-bit little-endian interleaved PCM, shared with every instance
    data: Arc<[u8]>,
    format: ClipFormat,
    backend: Arc<dyn VoiceBackend>,
    mixer: Arc<GlobalMixerState>,
    pool: Mutex<InstancePool>,
    /// Ids for instances handed out by `create_instance`, separate from the
    /// pool's numbering
    detached_created: AtomicU64,
    disposed: AtomicBool,
}

impl AudioClip {
    /// Build a clip from a raw 16-bit PCM payload.
    ///
    /// The payload is stored verbatim; it must be non-empty and a whole
    /// number of sample frames.
    pub fn from_pcm(
        context: &AudioContext,
        name: impl Into<String>,
        samples: Vec<u8>,
        sample_rate: u32,
        channels: Channels,
    ) -> ClipResult<Self> {
        if samples.is_empty() {
            return Err(ClipError::InvalidPayload("empty sample buffer"));
        }
        if sample_rate == 0 {
            return Err(ClipError::InvalidPayload("sample rate must be positive"));
        }
        let format = ClipFormat::new(sample_rate, channels);
        if samples.len() % format.block_align() as usize != 0 {
            return Err(ClipError::InvalidPayload(
                "buffer length is not frame aligned",
            ));
        }
        Ok(Self::bind(context, name.into(), samples.into(), format))
    }

    /// Decode an in-memory container (wav, flac, mp3, ogg) into a clip.
    /// `extension` is an optional container hint for the probe.
    pub fn from_encoded(
        context: &AudioContext,
        name: impl Into<String>,
        bytes: Vec<u8>,
        extension: Option<&str>,
    ) -> ClipResult<Self> {
        let decoded = decoder::decode(bytes, extension)?;
        Ok(Self::bind(
            context,
            name.into(),
            decoded.data.into(),
            decoded.format,
        ))
    }

    /// Load and decode a container from disk. The clip is named after the
    /// file stem.
    pub fn from_file(context: &AudioContext, path: impl AsRef<Path>) -> ClipResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ClipError::NotFound {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("clip")
            .to_string();
        let decoded = decoder::decode(bytes, path.extension().and_then(|ext| ext.to_str()))?;
        Ok(Self::bind(context, name, decoded.data.into(), decoded.format))
    }

    fn bind(context: &AudioContext, name: String, data: Arc<[u8]>, format: ClipFormat) -> Self {
        log::debug!(
            "Clip '{}': {} bytes, {} Hz, {} channel(s)",
            name,
            data.len(),
            format.sample_rate,
            format.channels.count()
        );
        Self {
            name,
            data,
            format,
            backend: Arc::clone(context.backend()),
            mixer: Arc::clone(context.mixer()),
            pool: Mutex::new(InstancePool::new()),
            detached_created: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    /// Fire-and-forget playback at the given volume, pitch and pan.
    ///
    /// Returns `Ok(true)` when a playback attempt was issued, `Ok(false)`
    /// when the master-volume mute gate or disposal suppressed it (in which
    /// case no instance is touched or created), and `Err` only when the
    /// backend could not create a voice for a grown pool.
    pub fn play(&self, volume: f32, pitch: f32, pan: f32) -> AudioResult<bool> {
        if self.disposed.load(Ordering::Relaxed) {
            return Ok(false);
        }
        if self.mixer.master_volume() <= 0.0 {
            return Ok(false);
        }

        let mut instance = self.pool_guard().acquire(|id| {
            let voice = self.backend.create_voice(&self.format)?;
            Ok(PlaybackInstance::new(id, Arc::clone(&self.data), voice))
        })?;

        // Voice start happens outside the pool lock
        instance.set_looped(false);
        instance.configure(volume, pitch, pan);
        instance.play();
        self.pool_guard().commit(instance);
        Ok(true)
    }

    /// Fire-and-forget playback at full volume, natural pitch, centered
    pub fn play_default(&self) -> AudioResult<bool> {
        self.play(1.0, 0.0, 0.0)
    }

    /// Stop every pooled instance still playing. Stopped instances are
    /// reclaimed on the next `play()`.
    pub fn stop_all(&self) {
        self.pool_guard().stop_all();
    }

    /// Hand out a caller-owned instance bound to a fresh voice. Detached
    /// instances are never tracked or reclaimed by the clip's pool; the
    /// caller drives their full lifecycle.
    pub fn create_instance(&self) -> AudioResult<PlaybackInstance> {
        let voice = self.backend.create_voice(&self.format)?;
        // Detached ids grow downward from u64::MAX so they can never collide
        // with the pool's numbering
        let id = u64::MAX - self.detached_created.fetch_add(1, Ordering::Relaxed);
        Ok(PlaybackInstance::new(id, Arc::clone(&self.data), voice))
    }

    /// Synthesize the self-describing RIFF container around the raw payload.
    /// Fails only when the payload exceeds the container's 32-bit size limit.
    pub fn to_wav(&self) -> ClipResult<Vec<u8>> {
        Ok(wav::encode(
            &self.data,
            self.format.sample_rate,
            self.format.channels,
        )?)
    }

    /// Mark the clip unusable: later `play()` calls return `Ok(false)`.
    /// Instances already playing keep their payload reference and play out.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Relaxed);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ClipFormat {
        self.format
    }

    /// Playback duration of the full payload
    pub fn duration(&self) -> Duration {
        self.format.duration(self.data.len())
    }

    /// A panicked lock holder cannot leave the pool's sets inconsistent
    /// (acquire restores the invariant on entry), so recover from poisoning.
    fn pool_guard(&self) -> MutexGuard<'_, InstancePool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockBackend;
    use crate::types::{InstanceState, VoiceState};

    fn test_context() -> (Arc<MockBackend>, AudioContext) {
        let backend = Arc::new(MockBackend::new());
        let context = AudioContext::new(Arc::clone(&backend) as Arc<dyn VoiceBackend>);
        (backend, context)
    }

    fn test_clip(context: &AudioContext) -> AudioClip {
        // 100 stereo frames of silence at CD rate
        AudioClip::from_pcm(context, "beep", vec![0u8; 400], 44100, Channels::Stereo)
            .expect("clip construction failed")
    }

    #[test]
    fn test_play_starts_a_voice() {
        let (backend, context) = test_context();
        let clip = test_clip(&context);

        assert_eq!(clip.play(0.8, 0.0, 0.0).unwrap(), true);
        assert_eq!(backend.created_count(), 1);
        assert_eq!(backend.voice(0).state(), VoiceState::Playing);
    }

    #[test]
    fn test_mute_gate_skips_pool_entirely() {
        let (backend, context) = test_context();
        let clip = test_clip(&context);
        context.mixer().set_master_volume(0.0);

        assert_eq!(clip.play_default().unwrap(), false);
        assert_eq!(backend.created_count(), 0);
        assert_eq!(clip.pool_guard().created_count(), 0);

        // Raising the volume re-enables playback
        context.mixer().set_master_volume(0.7);
        assert_eq!(clip.play_default().unwrap(), true);
    }

    #[test]
    fn test_facade_reuses_finished_instance() {
        let (backend, context) = test_context();
        let clip = test_clip(&context);

        clip.play_default().unwrap();
        backend.voice(0).finish();
        clip.play_default().unwrap();

        // Second play swept, drained and restarted the same instance
        assert_eq!(backend.created_count(), 1);
        assert_eq!(
            backend.voice(0).starts.load(Ordering::Relaxed),
            2
        );
        assert_eq!(clip.pool_guard().created_count(), 1);
    }

    #[test]
    fn test_overlapping_plays_use_distinct_voices() {
        let (backend, context) = test_context();
        let clip = test_clip(&context);

        clip.play_default().unwrap();
        clip.play_default().unwrap();
        assert_eq!(backend.created_count(), 2);
        assert_eq!(backend.voice(0).state(), VoiceState::Playing);
        assert_eq!(backend.voice(1).state(), VoiceState::Playing);
    }

    #[test]
    fn test_dispose_suppresses_later_plays() {
        let (backend, context) = test_context();
        let clip = test_clip(&context);

        clip.play_default().unwrap();
        assert!(!clip.is_disposed());
        clip.dispose();
        assert!(clip.is_disposed());

        // Already-playing instance keeps playing
        assert_eq!(backend.voice(0).state(), VoiceState::Playing);
        // Later plays are silent no-ops, not errors
        assert_eq!(clip.play_default().unwrap(), false);
        assert_eq!(backend.created_count(), 1);
    }

    #[test]
    fn test_voice_creation_failure_propagates() {
        let (backend, context) = test_context();
        let clip = test_clip(&context);
        backend.fail_creation.store(true, Ordering::Relaxed);

        assert!(clip.play_default().is_err());
    }

    #[test]
    fn test_create_instance_is_not_pooled() {
        let (backend, context) = test_context();
        let clip = test_clip(&context);

        let mut instance = clip.create_instance().unwrap();
        instance.play();
        assert_eq!(instance.state(), InstanceState::Playing);

        assert_eq!(backend.created_count(), 1);
        assert_eq!(clip.pool_guard().created_count(), 0);

        // A pooled play never reclaims the detached instance's voice
        backend.voice(0).finish();
        clip.play_default().unwrap();
        assert_eq!(clip.pool_guard().created_count(), 1);
    }

    #[test]
    fn test_stop_all_silences_pooled_instances() {
        let (backend, context) = test_context();
        let clip = test_clip(&context);

        clip.play_default().unwrap();
        clip.play_default().unwrap();
        clip.stop_all();
        assert_eq!(backend.voice(0).state(), VoiceState::Stopped);
        assert_eq!(backend.voice(1).state(), VoiceState::Stopped);
    }

    #[test]
    fn test_from_pcm_validation() {
        let (_, context) = test_context();
        assert!(matches!(
            AudioClip::from_pcm(&context, "empty", vec![], 44100, Channels::Mono),
            Err(ClipError::InvalidPayload(_))
        ));
        // 3 bytes cannot be whole stereo 16-bit frames
        assert!(matches!(
            AudioClip::from_pcm(&context, "ragged", vec![0u8; 3], 44100, Channels::Stereo),
            Err(ClipError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_from_pcm_rejects_zero_sample_rate() {
        // A rate-0 clip would never advance its playhead, so its instances
        // could never be observed stopped and reclaimed
        let (_, context) = test_context();
        assert!(matches!(
            AudioClip::from_pcm(&context, "bad", vec![0u8; 4], 0, Channels::Mono),
            Err(ClipError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_detached_ids_never_collide_with_pooled() {
        let (_, context) = test_context();
        let clip = test_clip(&context);

        clip.play_default().unwrap();
        let detached = clip.create_instance().unwrap();
        let also_detached = clip.create_instance().unwrap();

        assert_eq!(detached.id(), u64::MAX);
        assert_eq!(also_detached.id(), u64::MAX - 1);
        // Pooled ids count up from zero
        assert_eq!(clip.pool_guard().created_count(), 1);
    }

    #[test]
    fn test_duration_from_payload() {
        let (_, context) = test_context();
        // Half a second of mono 16-bit at CD rate
        let clip =
            AudioClip::from_pcm(&context, "tick", vec![0u8; 44100], 44100, Channels::Mono)
                .unwrap();
        assert_eq!(clip.duration().as_millis(), 500);
    }

    #[test]
    fn test_to_wav_round_trips_through_decoder() {
        let (_, context) = test_context();
        let samples: Vec<u8> = (0..64u8).collect();
        let clip =
            AudioClip::from_pcm(&context, "probe", samples.clone(), 22050, Channels::Stereo)
                .unwrap();

        let container = clip.to_wav().expect("container synthesis failed");
        assert_eq!(&container[0..4], b"RIFF");
        assert_eq!(container.len(), wav::HEADER_LEN + samples.len());

        let reloaded =
            AudioClip::from_encoded(&context, "probe2", container, Some("wav")).unwrap();
        assert_eq!(reloaded.format(), clip.format());
        assert_eq!(reloaded.duration(), clip.duration());
    }

    #[test]
    fn test_from_file_missing_path() {
        let (_, context) = test_context();
        let result = AudioClip::from_file(&context, "/nonexistent/beep.wav");
        assert!(matches!(result, Err(ClipError::NotFound { .. })));
    }

    #[test]
    fn test_from_encoded_garbage_is_load_failure() {
        let (_, context) = test_context();
        let result = AudioClip::from_encoded(&context, "junk", vec![0u8; 16], None);
        assert!(matches!(result, Err(ClipError::LoadFailure(_))));
    }
}
