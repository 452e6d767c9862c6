use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;

/// One text-to-speech job: a piece of text, how to voice it, and where to
/// write the audio.
///
/// `rate`, `pitch` and `volume` are forwarded verbatim. `None` means the
/// caller never set them and the backend must not receive the parameter
/// at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub rate: Option<String>,
    pub pitch: Option<String>,
    pub volume: Option<String>,
    pub output_path: PathBuf,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>, output_path: PathBuf) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            rate: None,
            pitch: None,
            volume: None,
            output_path,
        }
    }

    pub fn with_rate(mut self, rate: Option<String>) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_pitch(mut self, pitch: Option<String>) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_volume(mut self, volume: Option<String>) -> Self {
        self.volume = volume;
        self
    }
}

/// Trait for speech synthesis backends
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Synthesize the request's text and write the audio payload to its
    /// output path, replacing any existing file.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<()>;

    /// Get the backend name for display
    fn name(&self) -> &'static str;
}
