//! CuraScribe dictation crate - focus tracking, transcript merging, and the
//! dictation session controller.
//!
//! The [`FocusTracker`] records which editable field was focused last and
//! where its caret sat. The [`DictationController`] runs one speech capture
//! session at a time through a strict state machine (Idle -> Listening ->
//! Idle, with a transient Error state) and merges each final transcript into
//! the tracked field, either through a [`FormStore`] or directly.

pub mod accumulate;
pub mod controller;
pub mod error;
pub mod field;
pub mod memory;
pub mod merge;
pub mod notify;
pub mod recognizer;
pub mod state;
pub mod store;
pub mod tracker;

pub use accumulate::TranscriptAccumulator;
pub use controller::{DictationController, TranscriptListener};
pub use error::DictationError;
pub use field::{EditableField, FieldEvent, FieldHandle, FieldKind, SelectionRange};
pub use merge::{merge_transcript, Insertion};
pub use notify::{FanoutNotifier, Notifier, TracingNotifier};
pub use recognizer::{
    recognition_channel, RecognitionConfig, RecognitionEvent, RecognitionSink, ResultSegment,
    SessionEvent, SessionSink, SpeechRecognizer,
};
pub use state::{DictationState, StateMachine};
pub use store::{FormStore, WriteStrategy};
pub use tracker::{FieldNameResolver, FocusHandle, FocusRecord, FocusTracker};
