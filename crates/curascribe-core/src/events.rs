use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// Domain events emitted by the dictation controller.
///
/// Consumers subscribe through a `tokio::sync::broadcast` channel; the
/// controller never blocks on or fails because of a missing subscriber.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DomainEvent {
    /// Speech capture started for a focused field.
    DictationStarted {
        session_id: Uuid,
        field_name: Option<String>,
        timestamp: Timestamp,
    },

    /// A final transcript was merged into the target field.
    TextInserted {
        session_id: Uuid,
        field_name: Option<String>,
        chars: usize,
        caret: usize,
        timestamp: Timestamp,
    },

    /// The recognizer reported an error; the session was reset.
    DictationFailed {
        session_id: Uuid,
        code: String,
        timestamp: Timestamp,
    },

    /// The session ended normally.
    DictationEnded {
        session_id: Uuid,
        inserts: usize,
        duration_secs: f64,
        timestamp: Timestamp,
    },

    /// The session was cancelled by the user; pending results were discarded.
    DictationCancelled {
        session_id: Uuid,
        timestamp: Timestamp,
    },
}

impl DomainEvent {
    /// Session the event belongs to.
    pub fn session_id(&self) -> Uuid {
        match self {
            DomainEvent::DictationStarted { session_id, .. }
            | DomainEvent::TextInserted { session_id, .. }
            | DomainEvent::DictationFailed { session_id, .. }
            | DomainEvent::DictationEnded { session_id, .. }
            | DomainEvent::DictationCancelled { session_id, .. } => *session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let id = Uuid::new_v4();
        let event = DomainEvent::TextInserted {
            session_id: id,
            field_name: Some("dosage".to_string()),
            chars: 5,
            caret: 16,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "text_inserted");
        assert_eq!(json["field_name"], "dosage");
        assert_eq!(json["caret"], 16);
        assert_eq!(event.session_id(), id);
    }

    #[test]
    fn test_event_deserializes() {
        let id = Uuid::new_v4();
        let json = serde_json::json!({
            "type": "dictation_failed",
            "session_id": id,
            "code": "not-allowed",
            "timestamp": "2026-01-01T00:00:00Z",
        });
        let event: DomainEvent = serde_json::from_value(json).unwrap();
        match event {
            DomainEvent::DictationFailed { session_id, code, .. } => {
                assert_eq!(session_id, id);
                assert_eq!(code, "not-allowed");
            }
            other => panic!("Expected DictationFailed, got {:?}", other),
        }
    }
}
