//! Audio backend abstraction
//!
//! This module contains the voice backend seam and its platform
//! implementation:
//! - `backend`: the `Voice`/`VoiceBackend` traits the engine talks to
//! - `cpal_backend`: CPAL implementation (one output stream per voice)
//! - `error`: backend error types

pub mod backend;
pub mod cpal_backend;
pub mod error;

pub use backend::{Voice, VoiceBackend};
pub use cpal_backend::CpalVoiceBackend;
pub use error::{AudioError, AudioResult};
