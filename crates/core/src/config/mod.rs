use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{CartError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stacks: StackConfig,
    pub editor: EditorConfig,
}

impl AppConfig {
    /// Parses a JSON document. Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| CartError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<()> {
        if self.stacks.names.is_empty() {
            return Err(CartError::Config(
                "stacks.names must list at least one stack".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.stacks.names {
            if name.trim().is_empty() {
                return Err(CartError::Config("stack names must not be blank".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(CartError::Config(format!("duplicate stack name `{name}`")));
            }
        }

        if self.stacks.fallback_title.trim().is_empty() {
            return Err(CartError::Config(
                "stacks.fallback_title must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration for the cart stacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Stack identifiers, in hotkey order.
    pub names: Vec<String>,
    /// Title used when a cart would otherwise be left without one.
    pub fallback_title: String,
    /// MIME type prefixes accepted by ingestion.
    pub audio_mime_prefixes: Vec<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            names: ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect(),
            fallback_title: "Untitled".to_string(),
            audio_mime_prefixes: vec!["audio/".to_string()],
        }
    }
}

impl StackConfig {
    /// Returns `true` when the MIME type names an audio source.
    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        let mime = mime_type.trim().to_ascii_lowercase();
        self.audio_mime_prefixes
            .iter()
            .any(|prefix| mime.starts_with(&prefix.to_ascii_lowercase()))
    }
}

/// Configuration specific to the waveform editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Appended to the source name when a selection becomes a new cart.
    pub clip_suffix: String,
    pub clip_mime_type: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            clip_suffix: " (clip)".to_string(),
            clip_mime_type: "audio/wav".to_string(),
        }
    }
}
