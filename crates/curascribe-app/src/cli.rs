//! CLI argument definitions for the CuraScribe dictation runner.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use curascribe_dictation::SelectionRange;
use std::path::PathBuf;

/// CuraScribe: replay dictated transcripts into a form field.
#[derive(Parser, Debug)]
#[command(name = "curascribe", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Element identifier of the dictated field, as a form builder renders it.
    #[arg(short = 'f', long = "field", default_value = "form_item_notes")]
    pub field: String,

    /// Initial field value.
    #[arg(long = "value", default_value = "")]
    pub value: String,

    /// Caret position in chars. Defaults to the end of the value.
    #[arg(long = "caret")]
    pub caret: Option<usize>,

    /// End of the selected range. Defaults to the caret.
    #[arg(long = "selection-end")]
    pub selection_end: Option<usize>,

    /// Use a multi-line text area instead of a text input.
    #[arg(long = "textarea")]
    pub textarea: bool,

    /// Write straight to the field instead of through a form store.
    #[arg(long = "no-store")]
    pub no_store: bool,

    /// Capture all transcripts in one continuous session into the
    /// configured transcript field instead of the focused field.
    #[arg(long = "transcript")]
    pub transcript: bool,

    /// Finish with a session that fails with this recognizer error code.
    #[arg(long = "fail-with")]
    pub fail_with: Option<String>,

    /// Transcripts to dictate, one session each.
    pub transcripts: Vec<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CURASCRIBE_CONFIG env var > ~/.curascribe/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CURASCRIBE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Initial selection of the dictated field.
    pub fn selection(&self) -> SelectionRange {
        let caret = self.caret.unwrap_or_else(|| self.value.chars().count());
        SelectionRange::new(caret, self.selection_end.unwrap_or(caret))
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".curascribe").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".curascribe").join("config.toml");
    }
    PathBuf::from("config.toml")
}
