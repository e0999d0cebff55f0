//! Audio system bring-up
//!
//! One `AudioContext` per process is the intended shape: it selects the
//! voice backend once and owns the shared mixer state every clip reads.
//! Device failure at bring-up surfaces as an error; callers that want the
//! degrade-to-silence behavior keep running without a context and skip
//! clip construction.

use std::sync::Arc;

use crate::audio::{AudioResult, CpalVoiceBackend, VoiceBackend};
use crate::mixer::GlobalMixerState;

/// Owner of the backend handle and the global mixer state
pub struct AudioContext {
    backend: Arc<dyn VoiceBackend>,
    mixer: Arc<GlobalMixerState>,
}

impl AudioContext {
    /// Build a context around an already-constructed backend.
    ///
    /// Creating the mixer pushes the default master volume to the backend's
    /// master bus.
    pub fn new(backend: Arc<dyn VoiceBackend>) -> Self {
        let mixer = Arc::new(GlobalMixerState::new(Arc::clone(&backend)));
        Self { backend, mixer }
    }

    /// Bring up the default platform output device through CPAL
    pub fn with_default_backend() -> AudioResult<Self> {
        let backend = CpalVoiceBackend::new()?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// The voice factory clips create their voices through
    pub fn backend(&self) -> &Arc<dyn VoiceBackend> {
        &self.backend
    }

    /// Process-wide mixer knobs
    pub fn mixer(&self) -> &Arc<GlobalMixerState> {
        &self.mixer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockBackend;

    #[test]
    fn test_new_pushes_default_master_volume() {
        let backend = Arc::new(MockBackend::new());
        let context = AudioContext::new(Arc::clone(&backend) as Arc<dyn VoiceBackend>);

        assert_eq!(backend.master_pushes.lock().unwrap().as_slice(), &[1.0]);
        assert_eq!(context.mixer().master_volume(), 1.0);
    }
}
