//! Error types for the dictation subsystem.

use curascribe_core::error::CuraScribeError;
use curascribe_core::types::{Notification, Severity};

use crate::state::DictationState;

/// Errors from starting, running, or stopping a dictation session.
///
/// Every variant is terminal for the current session only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DictationError {
    #[error("No editable field has been focused")]
    NoActiveField,
    #[error("Speech recognition is not available on this platform")]
    Unsupported,
    #[error("A dictation session is already active")]
    SessionActive,
    #[error("No form store to capture the transcript into")]
    NoTranscriptStore,
    #[error("Failed to start speech recognition: {0}")]
    StartFailed(String),
    #[error("Microphone permission denied ({code})")]
    PermissionDenied { code: String },
    #[error("No speech detected ({code})")]
    NoSpeechDetected { code: String },
    #[error("Speech recognition service error ({code})")]
    RecognitionService { code: String },
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(DictationState, DictationState),
    #[error("Session lock poisoned: {0}")]
    Lock(String),
}

impl DictationError {
    /// Classify a raw recognizer error code, keeping the code itself.
    pub fn from_platform_code(code: &str) -> Self {
        let code = code.to_string();
        match code.as_str() {
            "not-allowed" | "service-not-allowed" => DictationError::PermissionDenied { code },
            "no-speech" => DictationError::NoSpeechDetected { code },
            _ => DictationError::RecognitionService { code },
        }
    }

    /// Raw platform code for recognition-level failures.
    pub fn platform_code(&self) -> Option<&str> {
        match self {
            DictationError::PermissionDenied { code }
            | DictationError::NoSpeechDetected { code }
            | DictationError::RecognitionService { code } => Some(code),
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DictationError::NoActiveField
            | DictationError::NoSpeechDetected { .. }
            | DictationError::SessionActive => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            DictationError::NoActiveField => "Please click on an input field first".to_string(),
            DictationError::Unsupported => {
                "Speech recognition is not supported in your browser".to_string()
            }
            DictationError::SessionActive => "Voice input is already listening".to_string(),
            DictationError::StartFailed(_) => "Failed to start voice recognition".to_string(),
            DictationError::NoTranscriptStore => {
                "Transcript capture is not available on this form".to_string()
            }
            DictationError::PermissionDenied { code } => format!(
                "Microphone access denied ({}). Please allow microphone permissions.",
                code
            ),
            DictationError::NoSpeechDetected { code } => {
                format!("No speech detected ({}). Please try again.", code)
            }
            DictationError::RecognitionService { code } => {
                format!("Speech recognition error: {}", code)
            }
            other => other.to_string(),
        }
    }

    pub fn notification(&self) -> Notification {
        Notification {
            severity: self.severity(),
            message: self.user_message(),
        }
    }
}

impl From<DictationError> for CuraScribeError {
    fn from(err: DictationError) -> Self {
        CuraScribeError::Dictation(err.to_string())
    }
}
