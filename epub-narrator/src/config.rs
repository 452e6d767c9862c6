//! epub-narrator configuration management.

use crate::pipeline::DEFAULT_OUTPUT_DIR;
use crate::text::segmenter::DEFAULT_MAX_CHARS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tts_client::BackendKind;

const DEFAULT_VOICE: &str = "en-US-JennyNeural";
const DEFAULT_LANG: &str = "en";
const DEFAULT_TLD: &str = "com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarratorConfig {
    /// Synthesis backend: "edge-tts" or "gtts"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Voice identifier passed to edge-tts
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speaking rate adjustment, e.g. "+10%"
    #[serde(default)]
    pub rate: Option<String>,

    /// Pitch adjustment, e.g. "-5Hz"
    #[serde(default)]
    pub pitch: Option<String>,

    /// Volume adjustment, e.g. "+20%"
    #[serde(default)]
    pub volume: Option<String>,

    /// Folder receiving the audio files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum segment length in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// gTTS language
    #[serde(default = "default_lang")]
    pub lang: String,

    /// gTTS top-level domain (accent)
    #[serde(default = "default_tld")]
    pub tld: String,

    /// Abort a chapter's batch on its first failed segment
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_backend() -> String {
    BackendKind::EdgeTts.as_str().to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

fn default_tld() -> String {
    DEFAULT_TLD.to_string()
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            voice: default_voice(),
            rate: None,
            pitch: None,
            volume: None,
            output_dir: default_output_dir(),
            max_chars: default_max_chars(),
            lang: default_lang(),
            tld: default_tld(),
            fail_fast: false,
        }
    }
}

impl NarratorConfig {
    /// Get the config file path: ~/.config/cli-programs/epub-narrator.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".config")
            .join("cli-programs")
            .join("epub-narrator.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, returning default if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: NarratorConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save config to `path`, creating parent folders
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// The configured backend, parsed
    pub fn backend_kind(&self) -> Result<BackendKind> {
        Ok(self.backend.parse()?)
    }
}
