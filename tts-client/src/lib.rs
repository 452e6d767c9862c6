//! Speech synthesis backends for the epub-narrator workspace
//!
//! Provides a single request type and backend trait over:
//! - edge-tts (Microsoft neural voices, subprocess)
//! - gTTS (Google Translate voices, subprocess)
//! - an in-memory mock for tests

pub mod backend;
pub mod error;
pub mod providers;

pub use backend::{SynthesisBackend, SynthesisRequest};
pub use error::{Result, TtsError};
pub use providers::{BackendKind, EdgeTtsBackend, GttsBackend, MockBackend, create_backend};
