//! gTTS backend
//!
//! Runs `gtts-cli` as a subprocess, feeding the text through stdin. gTTS
//! picks its voice from the language and top-level domain only.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::backend::{SynthesisBackend, SynthesisRequest};
use crate::error::{Result, TtsError};

/// Backend that shells out to `gtts-cli`
pub struct GttsBackend {
    cli_path: PathBuf,
    lang: String,
    tld: String,
}

impl GttsBackend {
    /// Create a new gTTS backend
    ///
    /// Returns an error if the `gtts-cli` executable is not found.
    pub fn new(lang: &str, tld: &str, cli_path: Option<PathBuf>) -> Result<Self> {
        let cli_path = match cli_path {
            Some(path) => {
                if !path.exists() {
                    return Err(TtsError::BackendUnavailable(format!(
                        "gtts-cli not found at specified path: {}",
                        path.display()
                    )));
                }
                path
            }
            None => which::which("gtts-cli").map_err(|_| {
                TtsError::BackendUnavailable(
                    "gtts-cli not found. Install it with: pip install gTTS".into(),
                )
            })?,
        };

        Ok(Self {
            cli_path,
            lang: lang.to_string(),
            tld: tld.to_string(),
        })
    }

    /// Build the argument list for one request. The text itself goes to stdin.
    pub fn build_args(&self, request: &SynthesisRequest) -> Vec<String> {
        vec![
            format!("--lang={}", self.lang),
            format!("--tld={}", self.tld),
            format!("--output={}", request.output_path.display()),
            "-".to_string(),
        ]
    }
}

#[async_trait]
impl SynthesisBackend for GttsBackend {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<()> {
        if request.text.trim().is_empty() {
            return Err(TtsError::InvalidRequest(format!(
                "empty text for {}",
                request.output_path.display()
            )));
        }

        log::debug!(
            "gtts: {} chars -> {} (voice {} ignored)",
            request.text.chars().count(),
            request.output_path.display(),
            request.voice
        );

        let mut child = Command::new(&self.cli_path)
            .args(self.build_args(request))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TtsError::BackendFailed {
                backend: self.name().to_string(),
                message: format!("Failed to spawn: {}", e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.text.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;

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
        "gTTS"
    }
}
