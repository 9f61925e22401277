//! End-to-end dictation flows over in-memory collaborators.
//!
//! Each test wires a focus tracker, a scripted recognizer and a dictation
//! controller, focuses a field, replays recognizer events and checks what
//! ended up in the field, the form store and the notification channel.

use std::sync::Arc;

use tokio::sync::mpsc;

use curascribe_core::config::DictationConfig;
use curascribe_core::types::Severity;
use curascribe_dictation::memory::{
    MemoryField, MemoryFormStore, RecordingNotifier, ScriptedRecognizer,
};
use curascribe_dictation::{
    merge_transcript, recognition_channel, DictationController, DictationError, DictationState,
    EditableField, FieldHandle, FocusTracker, FormStore, RecognitionEvent, ResultSegment,
    SelectionRange, SessionEvent, SpeechRecognizer,
};

// =============================================================================
// Helpers
// =============================================================================

struct Rig {
    tracker: FocusTracker,
    recognizer: Arc<ScriptedRecognizer>,
    notifier: Arc<RecordingNotifier>,
    controller: DictationController,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

fn rig(store: Option<Arc<MemoryFormStore>>) -> Rig {
    let config = DictationConfig::default();
    let tracker = FocusTracker::from_config(&config);
    let recognizer = Arc::new(ScriptedRecognizer::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let (sink, rx) = recognition_channel();

    let mut controller = DictationController::new(
        config,
        tracker.handle(),
        Some(recognizer.clone() as Arc<dyn SpeechRecognizer>),
        notifier.clone(),
        sink,
    );
    if let Some(store) = store {
        controller = controller.with_form_store(store);
    }

    Rig {
        tracker,
        recognizer,
        notifier,
        controller,
        rx,
    }
}

/// Run one dictation session that yields `transcript` and ends.
async fn dictate(rig: &mut Rig, transcript: &str) {
    rig.recognizer.push_script(vec![
        RecognitionEvent::final_result(transcript),
        RecognitionEvent::End,
    ]);
    rig.controller.start().unwrap();
    rig.controller.process_pending(&mut rig.rx).await;
    assert_eq!(rig.controller.state(), DictationState::Idle);
}

// =============================================================================
// Spacing and selection replacement
// =============================================================================

#[test]
fn test_spacing_rules_across_positions() {
    let cases: Vec<(&str, usize, usize, &str, &str)> = vec![
        ("Take twice", 10, 10, "daily", "Take twice daily"),
        ("Take twice ", 11, 11, "daily", "Take twice daily"),
        ("twice daily", 0, 0, "Take", "Take twice daily"),
        (" twice daily", 0, 0, "Take", "Take twice daily"),
        ("Taketwice", 4, 4, "it", "Take it twice"),
        ("Take  twice", 5, 5, "it", "Take it twice"),
        ("", 0, 0, "daily", "daily"),
    ];

    for (current, start, end, transcript, expected) in cases {
        let insertion = merge_transcript(current, SelectionRange::new(start, end), transcript);
        assert_eq!(
            insertion.value, expected,
            "merging {:?} into {:?} at {}..{}",
            transcript, current, start, end
        );
    }
}

#[tokio::test]
async fn test_append_to_input() {
    let mut rig = rig(None);
    let memory = MemoryField::input("Take twice");
    let field: FieldHandle = memory.clone();
    rig.tracker.on_focus_in(&field);

    dictate(&mut rig, "daily").await;

    assert_eq!(memory.value(), "Take twice daily");
}

#[tokio::test]
async fn test_selection_replacement_in_textarea() {
    let mut rig = rig(None);
    let memory = MemoryField::textarea("500mg twice daily").with_selection(SelectionRange::new(6, 11));
    let field: FieldHandle = memory.clone();
    rig.tracker.on_focus_in(&field);

    dictate(&mut rig, "three times").await;

    assert_eq!(memory.value(), "500mg three times daily");
    assert_eq!(memory.selection(), SelectionRange::caret(17));
}

// =============================================================================
// No focus
// =============================================================================

#[tokio::test]
async fn test_no_focus_writes_nothing_and_warns() {
    let mut rig = rig(None);
    let untouched = MemoryField::input("untouched");

    let err = rig.controller.start().unwrap_err();
    assert_eq!(err, DictationError::NoActiveField);
    rig.controller.process_pending(&mut rig.rx).await;

    assert_eq!(untouched.value(), "untouched");
    assert_eq!(rig.controller.state(), DictationState::Idle);
    let notifications = rig.notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Warning);
    assert!(rig.recognizer.started_configs().is_empty());
}

// =============================================================================
// Caret restore and composition
// =============================================================================

#[tokio::test]
async fn test_second_dictation_composes_from_restored_caret() {
    let mut rig = rig(None);
    let memory = MemoryField::input("Take twice").with_selection(SelectionRange::caret(4));
    let field: FieldHandle = memory.clone();
    rig.tracker.on_focus_in(&field);

    dictate(&mut rig, "one tablet").await;
    assert_eq!(memory.value(), "Take one tablet twice");
    // start 4 + leading space 1 + transcript 10
    assert_eq!(memory.selection(), SelectionRange::caret(15));
    assert_eq!(
        rig.tracker.snapshot().unwrap().selection,
        SelectionRange::caret(15)
    );

    // No click back into the field between sessions.
    dictate(&mut rig, "by mouth").await;
    assert_eq!(memory.value(), "Take one tablet by mouth twice");
    assert_eq!(memory.selection(), SelectionRange::caret(24));
    assert_eq!(memory.focus_count(), 2);
}

// =============================================================================
// Store reconciliation
// =============================================================================

#[tokio::test]
async fn test_store_and_field_agree_after_insert() {
    let store = Arc::new(MemoryFormStore::deferred());
    let mut rig = rig(Some(store.clone()));
    let memory = MemoryField::textarea("").with_attribute("id", "form_item_subjective");
    let field: FieldHandle = memory.clone();
    rig.tracker.on_focus_in(&field);

    dictate(&mut rig, "Patient reports lower back pain").await;

    let stored = store.get_field_value("subjective").unwrap();
    assert_eq!(stored, "Patient reports lower back pain");
    assert_eq!(memory.value(), stored);
}

#[tokio::test]
async fn test_store_normalization_is_reflected_in_field() {
    let store = Arc::new(MemoryFormStore::new().with_normalizer(|v| v.to_uppercase()));
    let mut rig = rig(Some(store.clone()));
    let memory = MemoryField::input("").with_attribute("name", "form_icd_code");
    let field: FieldHandle = memory.clone();
    rig.tracker.on_focus_in(&field);

    dictate(&mut rig, "m54.5").await;

    assert_eq!(store.get_field_value("icd_code").as_deref(), Some("M54.5"));
    assert_eq!(memory.value(), "M54.5");
}

// =============================================================================
// Errors never write
// =============================================================================

#[tokio::test]
async fn test_recognition_error_leaves_field_identical() {
    let cases = [
        (
            "not-allowed",
            Severity::Error,
            "Microphone access denied (not-allowed). Please allow microphone permissions.",
        ),
        (
            "no-speech",
            Severity::Warning,
            "No speech detected (no-speech). Please try again.",
        ),
        (
            "network",
            Severity::Error,
            "Speech recognition error: network",
        ),
        (
            "audio-capture",
            Severity::Error,
            "Speech recognition error: audio-capture",
        ),
    ];

    for (code, severity, message) in cases {
        let mut rig = rig(None);
        let memory = MemoryField::input("BP 120/80").with_selection(SelectionRange::caret(2));
        let field: FieldHandle = memory.clone();
        rig.tracker.on_focus_in(&field);
        let before = memory.value();

        let id = rig.controller.start().unwrap();
        let result = rig
            .controller
            .handle_event(SessionEvent {
                session_id: id,
                event: RecognitionEvent::error(code),
            })
            .await;
        assert!(result.is_err());

        // Whatever the recognizer still had queued is discarded.
        rig.recognizer.emit(RecognitionEvent::final_result("late text"));
        rig.recognizer.emit(RecognitionEvent::End);
        rig.controller.process_pending(&mut rig.rx).await;

        assert_eq!(memory.value(), before, "code {}", code);
        assert_eq!(memory.focus_count(), 0);
        assert_eq!(rig.controller.state(), DictationState::Idle);
        let last = rig.notifier.notifications().pop().unwrap();
        assert_eq!(last.severity, severity, "code {}", code);
        assert_eq!(last.message, message);
        assert!(last.message.contains(code));
    }
}

#[tokio::test]
async fn test_cancelled_session_writes_nothing() {
    let mut rig = rig(None);
    let memory = MemoryField::input("Allergies: none");
    let field: FieldHandle = memory.clone();
    rig.tracker.on_focus_in(&field);

    rig.controller.start().unwrap();
    rig.controller.cancel().unwrap();
    rig.recognizer.emit(RecognitionEvent::final_result("penicillin"));
    rig.controller.process_pending(&mut rig.rx).await;

    assert_eq!(memory.value(), "Allergies: none");
    assert_eq!(rig.controller.state(), DictationState::Idle);
}

#[tokio::test]
async fn test_restart_after_error() {
    let mut rig = rig(None);
    let memory = MemoryField::input("");
    let field: FieldHandle = memory.clone();
    rig.tracker.on_focus_in(&field);

    rig.recognizer.push_script(vec![
        RecognitionEvent::error("no-speech"),
        RecognitionEvent::End,
    ]);
    rig.controller.start().unwrap();
    rig.controller.process_pending(&mut rig.rx).await;
    assert_eq!(
        rig.notifier.messages().last().map(String::as_str),
        Some("No speech detected (no-speech). Please try again.")
    );

    dictate(&mut rig, "second try").await;
    assert_eq!(memory.value(), "second try");
}

// =============================================================================
// Continuous transcript capture
// =============================================================================

#[tokio::test]
async fn test_transcript_capture_follows_growing_result_list() {
    let store = Arc::new(MemoryFormStore::new());
    let mut rig = rig(Some(store.clone()));
    let memory = MemoryField::textarea("Subjective:").with_attribute("id", "form_item_subjective");
    let field: FieldHandle = memory.clone();
    rig.tracker.on_focus_in(&field);

    rig.controller.start_transcript().unwrap();

    // Each callback carries the whole list; only entries from the index on are new.
    let utterances = ["Patient reports knee pain", "since Tuesday", "worse on stairs"];
    let mut segments = Vec::new();
    for (index, utterance) in utterances.iter().enumerate() {
        segments.push(ResultSegment::interim(*utterance));
        rig.recognizer
            .emit(RecognitionEvent::results(index, segments.clone()));
        segments[index] = ResultSegment::final_text(*utterance);
        rig.recognizer
            .emit(RecognitionEvent::results(index, segments.clone()));
    }
    rig.controller.stop().unwrap();
    rig.controller.process_pending(&mut rig.rx).await;

    assert_eq!(
        store.get_field_value("transcript").as_deref(),
        Some("Patient reports knee pain since Tuesday worse on stairs ")
    );
    // The focused field is not a target of transcript capture.
    assert_eq!(memory.value(), "Subjective:");
    assert_eq!(store.get_field_value("subjective"), None);
    assert_eq!(rig.controller.state(), DictationState::Idle);
}

#[tokio::test]
async fn test_transcript_capture_error_keeps_captured_text() {
    let store = Arc::new(MemoryFormStore::new());
    let mut rig = rig(Some(store.clone()));

    rig.controller.start_transcript().unwrap();
    rig.recognizer.emit(RecognitionEvent::results(
        0,
        vec![ResultSegment::final_text("blood pressure normal")],
    ));
    rig.recognizer.emit(RecognitionEvent::error("network"));
    rig.recognizer.emit(RecognitionEvent::results(
        1,
        vec![
            ResultSegment::final_text("blood pressure normal"),
            ResultSegment::final_text("late"),
        ],
    ));
    rig.controller.process_pending(&mut rig.rx).await;

    assert_eq!(
        store.get_field_value("transcript").as_deref(),
        Some("blood pressure normal ")
    );
    assert_eq!(rig.controller.state(), DictationState::Idle);
    assert_eq!(
        rig.notifier.messages().last().map(String::as_str),
        Some("Speech recognition error: network")
    );
}
