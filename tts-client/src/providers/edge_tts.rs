//! edge-tts backend
//!
//! Runs the `edge-tts` command line tool as a subprocess.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use crate::backend::{SynthesisBackend, SynthesisRequest};
use crate::error::{Result, TtsError};

/// Backend that shells out to `edge-tts`
pub struct EdgeTtsBackend {
    cli_path: PathBuf,
}

impl EdgeTtsBackend {
    /// Create a new edge-tts backend
    ///
    /// Returns an error if the `edge-tts` executable is not found.
    pub fn new(cli_path: Option<PathBuf>) -> Result<Self> {
        let cli_path = match cli_path {
            Some(path) => {
                if !path.exists() {
                    return Err(TtsError::BackendUnavailable(format!(
                        "edge-tts not found at specified path: {}",
                        path.display()
                    )));
                }
                path
            }
            None => which::which("edge-tts").map_err(|_| {
                TtsError::BackendUnavailable(
                    "edge-tts not found. Install it with: pip install edge-tts".into(),
                )
            })?,
        };

        Ok(Self { cli_path })
    }

    /// Build the argument list for one request.
    ///
    /// Values are joined with `=` so that signed values such as `-10%` are
    /// not mistaken for flags.
    pub fn build_args(request: &SynthesisRequest) -> Vec<String> {
        let mut args = vec![format!("--voice={}", request.voice)];

        if let Some(rate) = &request.rate {
            args.push(format!("--rate={}", rate));
        }
        if let Some(pitch) = &request.pitch {
            args.push(format!("--pitch={}", pitch));
        }
        if let Some(volume) = &request.volume {
            args.push(format!("--volume={}", volume));
        }

        args.push(format!("--text={}", request.text));
        args.push(format!("--write-media={}", request.output_path.display()));
        args
    }
}

#[async_trait]
impl SynthesisBackend for EdgeTtsBackend {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<()> {
        if request.text.trim().is_empty() {
            return Err(TtsError::InvalidRequest(format!(
                "empty text for {}",
                request.output_path.display()
            )));
        }

        log::debug!(
            "edge-tts: {} chars -> {}",
            request.text.chars().count(),
            request.output_path.display()
        );

        // Dropping the request (a failed sibling under fail-fast) kills the child
        let output = Command::new(&self.cli_path)
            .args(Self::build_args(request))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TtsError::BackendFailed {
                backend: self.name().to_string(),
                message: format!("Failed to execute: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TtsError::BackendFailed {
                backend: self.name().to_string(),
                message: format!("Command failed: {}", stderr.trim()),
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "edge-tts"
    }
}
