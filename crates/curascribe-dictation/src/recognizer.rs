//! Platform speech recognition collaborator.
//!
//! A recognizer captures speech on its own thread and reports back through
//! a [`SessionSink`]. Events are tagged with the session they belong to so
//! the controller can drop anything that arrives after a session ended.

use curascribe_core::config::DictationConfig;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Settings handed to the recognizer when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self::from(&DictationConfig::default())
    }
}

impl From<&DictationConfig> for RecognitionConfig {
    fn from(config: &DictationConfig) -> Self {
        Self {
            language: config.language.clone(),
            continuous: config.continuous,
            interim_results: config.interim_results,
        }
    }
}

/// One entry of a recognizer result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSegment {
    pub transcript: String,
    pub is_final: bool,
}

impl ResultSegment {
    pub fn final_text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }
}

/// Callback payloads from the recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A recognized utterance. Only final results are written to fields.
    Result { transcript: String, is_final: bool },
    /// The whole result list of a continuous session. Entries before
    /// `result_index` were already delivered by an earlier event.
    Results {
        result_index: usize,
        segments: Vec<ResultSegment>,
    },
    /// The recognizer failed with a raw platform error code.
    Error { code: String },
    /// The recognizer stopped capturing.
    End,
}

impl RecognitionEvent {
    pub fn final_result(transcript: impl Into<String>) -> Self {
        RecognitionEvent::Result {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    pub fn results(result_index: usize, segments: Vec<ResultSegment>) -> Self {
        RecognitionEvent::Results {
            result_index,
            segments,
        }
    }

    pub fn error(code: impl Into<String>) -> Self {
        RecognitionEvent::Error { code: code.into() }
    }
}

/// A recognizer event tagged with its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub event: RecognitionEvent,
}

/// Sending half shared by every session of one controller.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl RecognitionSink {
    /// Sink bound to a single session.
    pub fn for_session(&self, session_id: Uuid) -> SessionSink {
        SessionSink {
            session_id,
            tx: self.tx.clone(),
        }
    }
}

/// Sink handed to the recognizer for one session.
#[derive(Debug, Clone)]
pub struct SessionSink {
    session_id: Uuid,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionSink {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Deliver an event. Returns `false` once the controller side is gone.
    pub fn send(&self, event: RecognitionEvent) -> bool {
        self.tx
            .send(SessionEvent {
                session_id: self.session_id,
                event,
            })
            .is_ok()
    }
}

/// Create the event channel between recognizers and a controller.
pub fn recognition_channel() -> (RecognitionSink, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RecognitionSink { tx }, rx)
}

/// Platform speech recognition capability.
///
/// `start` must return promptly; results, errors and the end of capture are
/// reported later through the sink.
pub trait SpeechRecognizer: Send + Sync {
    fn start(&self, config: &RecognitionConfig, sink: SessionSink) -> Result<(), String>;

    /// Stop capturing; a pending final result may still be delivered before `End`.
    fn stop(&self);

    /// Stop capturing and discard anything not yet delivered.
    fn abort(&self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_dictation_config() {
        let mut dictation = DictationConfig::default();
        dictation.language = "en-GB".to_string();
        dictation.continuous = true;

        let config = RecognitionConfig::from(&dictation);
        assert_eq!(config.language, "en-GB");
        assert!(config.continuous);
        assert!(!config.interim_results);
        assert_eq!(RecognitionConfig::default().language, "en-US");
    }

    #[test]
    fn test_session_sink_tags_events() {
        let (sink, mut rx) = recognition_channel();
        let id = Uuid::new_v4();
        let session = sink.for_session(id);
        assert_eq!(session.session_id(), id);

        assert!(session.send(RecognitionEvent::final_result("hello")));
        assert!(session.send(RecognitionEvent::End));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.session_id, id);
        assert_eq!(first.event, RecognitionEvent::final_result("hello"));
        assert_eq!(rx.try_recv().unwrap().event, RecognitionEvent::End);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (sink, rx) = recognition_channel();
        drop(rx);
        assert!(!sink.for_session(Uuid::new_v4()).send(RecognitionEvent::End));
    }
}
