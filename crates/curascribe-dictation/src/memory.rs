//! In-memory collaborators.
//!
//! Stand-ins for a host's text controls, form store, speech recognizer and
//! notification channel. Used by the CLI and by tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use curascribe_core::types::Notification;

use crate::field::{EditableField, FieldEvent, FieldKind, SelectionRange};
use crate::notify::Notifier;
use crate::recognizer::{RecognitionConfig, RecognitionEvent, SessionSink, SpeechRecognizer};
use crate::store::FormStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MemoryField
// =============================================================================

#[derive(Debug, Default)]
struct FieldState {
    value: String,
    selection: SelectionRange,
    attributes: HashMap<String, String>,
    events: Vec<FieldEvent>,
    focus_count: usize,
}

/// A text control held entirely in memory.
#[derive(Debug)]
pub struct MemoryField {
    kind: FieldKind,
    state: Mutex<FieldState>,
}

impl MemoryField {
    /// New field with the caret at the end of `value`.
    pub fn new(kind: FieldKind, value: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(FieldState {
                value: value.to_string(),
                selection: SelectionRange::caret(value.chars().count()),
                ..FieldState::default()
            }),
        })
    }

    pub fn input(value: &str) -> Arc<Self> {
        Self::new(FieldKind::TextInput, value)
    }

    pub fn textarea(value: &str) -> Arc<Self> {
        Self::new(FieldKind::TextArea, value)
    }

    pub fn with_attribute(self: Arc<Self>, name: &str, value: &str) -> Arc<Self> {
        lock(&self.state)
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_selection(self: Arc<Self>, range: SelectionRange) -> Arc<Self> {
        lock(&self.state).selection = range;
        self
    }

    /// Change notifications fired so far, oldest first.
    pub fn events(&self) -> Vec<FieldEvent> {
        lock(&self.state).events.clone()
    }

    pub fn focus_count(&self) -> usize {
        lock(&self.state).focus_count
    }
}

impl EditableField for MemoryField {
    fn kind(&self) -> FieldKind {
        self.kind.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        lock(&self.state).attributes.get(name).cloned()
    }

    fn value(&self) -> String {
        lock(&self.state).value.clone()
    }

    fn set_value(&self, value: &str) {
        let mut state = lock(&self.state);
        state.value = value.to_string();
        let len = state.value.chars().count();
        state.selection = state.selection.clamp(len);
    }

    fn dispatch(&self, event: FieldEvent) {
        lock(&self.state).events.push(event);
    }

    fn selection(&self) -> SelectionRange {
        lock(&self.state).selection
    }

    fn set_selection(&self, range: SelectionRange) {
        let mut state = lock(&self.state);
        let len = state.value.chars().count();
        state.selection = range.clamp(len);
    }

    fn focus(&self) {
        lock(&self.state).focus_count += 1;
    }
}

// =============================================================================
// MemoryFormStore
// =============================================================================

type Normalizer = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A form store backed by a map.
///
/// With [`MemoryFormStore::deferred`], writes only become visible once
/// [`FormStore::settled`] has been awaited, like a store whose update
/// cycle runs asynchronously.
#[derive(Default)]
pub struct MemoryFormStore {
    values: Mutex<BTreeMap<String, String>>,
    pending: Mutex<Vec<(String, String)>>,
    validated: Mutex<Vec<String>>,
    normalizer: Option<Normalizer>,
    deferred: bool,
}

impl std::fmt::Debug for MemoryFormStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFormStore")
            .field("values", &*lock(&self.values))
            .field("deferred", &self.deferred)
            .field("has_normalizer", &self.normalizer.is_some())
            .finish()
    }
}

impl MemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose writes land on the next `settled()`.
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    /// Apply `normalizer` to every value written.
    pub fn with_normalizer(
        mut self,
        normalizer: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.normalizer = Some(Box::new(normalizer));
        self
    }

    /// Names passed to `validate_field`, oldest first.
    pub fn validated(&self) -> Vec<String> {
        lock(&self.validated).clone()
    }

    /// Copy of all committed values.
    pub fn values(&self) -> BTreeMap<String, String> {
        lock(&self.values).clone()
    }

    fn commit(&self, name: String, value: String) {
        let value = match &self.normalizer {
            Some(normalize) => normalize(&value),
            None => value,
        };
        lock(&self.values).insert(name, value);
    }
}

#[async_trait]
impl FormStore for MemoryFormStore {
    fn get_field_value(&self, name: &str) -> Option<String> {
        lock(&self.values).get(name).cloned()
    }

    fn set_field_value(&self, name: &str, value: &str) {
        if self.deferred {
            lock(&self.pending).push((name.to_string(), value.to_string()));
        } else {
            self.commit(name.to_string(), value.to_string());
        }
    }

    fn validate_field(&self, name: &str) {
        lock(&self.validated).push(name.to_string());
    }

    async fn settled(&self) {
        tokio::task::yield_now().await;
        let pending: Vec<_> = lock(&self.pending).drain(..).collect();
        for (name, value) in pending {
            self.commit(name, value);
        }
    }
}

// =============================================================================
// ScriptedRecognizer
// =============================================================================

/// A recognizer that replays queued event scripts.
///
/// Each `start` pops the next script and delivers it to the session sink.
/// If the script does not end the session, the sink stays open so tests can
/// [`emit`](ScriptedRecognizer::emit) more events or call `stop`.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    scripts: Mutex<VecDeque<Vec<RecognitionEvent>>>,
    active: Mutex<Option<SessionSink>>,
    configs: Mutex<Vec<RecognitionConfig>>,
    start_failure: Mutex<Option<String>>,
    stops: AtomicUsize,
    aborts: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the events delivered by the next `start`.
    pub fn push_script(&self, events: Vec<RecognitionEvent>) {
        lock(&self.scripts).push_back(events);
    }

    /// Make the next `start` fail with `reason`.
    pub fn fail_next_start(&self, reason: &str) {
        *lock(&self.start_failure) = Some(reason.to_string());
    }

    /// Deliver an event to the running session, if any.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        let mut active = lock(&self.active);
        let Some(sink) = active.as_ref() else {
            return false;
        };
        let ends = event == RecognitionEvent::End;
        let sent = sink.send(event);
        if ends {
            *active = None;
        }
        sent
    }

    pub fn is_capturing(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Configurations passed to `start`, oldest first.
    pub fn started_configs(&self) -> Vec<RecognitionConfig> {
        lock(&self.configs).clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(&self, config: &RecognitionConfig, sink: SessionSink) -> Result<(), String> {
        if let Some(reason) = lock(&self.start_failure).take() {
            return Err(reason);
        }
        lock(&self.configs).push(config.clone());
        *lock(&self.active) = Some(sink);

        let script = lock(&self.scripts).pop_front().unwrap_or_default();
        for event in script {
            self.emit(event);
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.emit(RecognitionEvent::End);
    }

    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.emit(RecognitionEvent::error("aborted"));
        self.emit(RecognitionEvent::End);
    }
}

// =============================================================================
// RecordingNotifier
// =============================================================================

/// Keeps every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.received).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.received)
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.received).push(notification);
    }
}
