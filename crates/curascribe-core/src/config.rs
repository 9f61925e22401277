use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CuraScribeError, Result};

/// Top-level configuration for CuraScribe.
///
/// Loaded from `~/.curascribe/config.toml` by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CuraScribeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub dictation: DictationConfig,
}

impl CuraScribeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CuraScribeConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CuraScribeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Voice dictation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictationConfig {
    /// BCP 47 language tag handed to the speech recognizer.
    pub language: String,
    /// Keep capturing after the first final result.
    pub continuous: bool,
    /// Ask the recognizer for non-final results as well.
    pub interim_results: bool,
    /// Attributes consulted, in order, to identify a focused field.
    pub identifier_attributes: Vec<String>,
    /// Form-builder prefixes stripped, in order, from the identifier.
    pub field_prefixes: Vec<String>,
    /// Emit an info notification once listening has started.
    pub announce_listening: bool,
    /// Store field that receives continuous transcript capture.
    pub transcript_field: String,
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: false,
            interim_results: false,
            identifier_attributes: vec![
                "id".to_string(),
                "name".to_string(),
                "data-field".to_string(),
            ],
            field_prefixes: vec!["form_item_".to_string(), "form_".to_string()],
            announce_listening: true,
            transcript_field: "transcript".to_string(),
        }
    }
}
