//! Synthesis backend implementations

mod edge_tts;
mod gtts;
pub mod mock;

pub use edge_tts::EdgeTtsBackend;
pub use gtts::GttsBackend;
pub use mock::MockBackend;

use std::fmt;
use std::str::FromStr;

use crate::backend::SynthesisBackend;
use crate::error::{Result, TtsError};

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    EdgeTts,
    Gtts,
}

impl BackendKind {
    /// Name used on the command line and in the config file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EdgeTts => "edge-tts",
            Self::Gtts => "gtts",
        }
    }

    /// Whether the backend understands voice, rate, pitch and volume
    pub fn supports_voice_overrides(&self) -> bool {
        matches!(self, Self::EdgeTts)
    }
}

impl FromStr for BackendKind {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "edge-tts" | "edge_tts" | "edge" => Ok(Self::EdgeTts),
            "gtts" | "google" => Ok(Self::Gtts),
            _ => Err(TtsError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create a backend instance, locating its executable on PATH.
///
/// `lang` and `tld` are only used by gTTS.
pub fn create_backend(kind: BackendKind, lang: &str, tld: &str) -> Result<Box<dyn SynthesisBackend>> {
    match kind {
        BackendKind::EdgeTts => Ok(Box::new(EdgeTtsBackend::new(None)?)),
        BackendKind::Gtts => Ok(Box::new(GttsBackend::new(lang, tld, None)?)),
    }
}
