//! Peal Core - fire-and-forget audio clip playback engine

pub mod audio;
pub mod clip;
pub mod context;
pub mod decoder;
pub mod instance;
pub mod mixer;
pub mod pool;
pub mod types;
pub mod wav;

pub use clip::{AudioClip, ClipError, ClipResult};
pub use context::AudioContext;
pub use instance::PlaybackInstance;
pub use mixer::GlobalMixerState;
pub use types::*;
