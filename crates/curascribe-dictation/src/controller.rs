//! Dictation session controller.
//!
//! Owns the lifecycle of one capture session at a time: it validates the
//! tracked focus, starts the recognizer, merges each final transcript into
//! the target field and resets the state machine when capture ends or fails.
//! A transcript session instead appends every final segment to the
//! configured transcript field of the form store.
//!
//! Recognizer callbacks arrive as [`SessionEvent`]s on a channel and are fed
//! to [`DictationController::handle_event`], either by [`run`] on a host task
//! or by [`process_pending`] when the host drives the loop itself.
//!
//! [`run`]: DictationController::run
//! [`process_pending`]: DictationController::process_pending

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use curascribe_core::config::DictationConfig;
use curascribe_core::events::DomainEvent;
use curascribe_core::types::Notification;
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use crate::accumulate::TranscriptAccumulator;
use crate::error::DictationError;
use crate::field::SelectionRange;
use crate::merge::merge_transcript;
use crate::notify::Notifier;
use crate::recognizer::{
    RecognitionConfig, RecognitionEvent, RecognitionSink, ResultSegment, SessionEvent,
    SpeechRecognizer,
};
use crate::state::{DictationState, StateMachine};
use crate::store::{FormStore, WriteStrategy};
use crate::tracker::{FocusHandle, FocusRecord};

/// Called with every transcript that was written into a field.
pub type TranscriptListener = Box<dyn Fn(&str) + Send + Sync>;

/// Where a session's final results go.
#[derive(Debug, Clone)]
enum SessionTarget {
    /// Focus snapshot taken at start; its selection follows each insert.
    Field {
        record: FocusRecord,
        strategy: WriteStrategy,
    },
    Transcript(Arc<TranscriptAccumulator>),
}

impl SessionTarget {
    fn field_name(&self) -> Option<String> {
        match self {
            SessionTarget::Field { record, .. } => record.field_name.clone(),
            SessionTarget::Transcript(accumulator) => Some(accumulator.field().to_string()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SessionTarget::Field { strategy, .. } => strategy.label(),
            SessionTarget::Transcript(_) => "transcript",
        }
    }
}

/// Data held for the running session.
#[derive(Debug, Clone)]
struct ActiveSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    target: SessionTarget,
    stop_requested: bool,
    inserts: usize,
}

impl ActiveSession {
    fn elapsed_secs(&self) -> f64 {
        (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Runs dictation sessions against the tracked focus.
pub struct DictationController {
    config: DictationConfig,
    focus: FocusHandle,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    notifier: Arc<dyn Notifier>,
    store: Option<Arc<dyn FormStore>>,
    sink: RecognitionSink,
    state_machine: StateMachine,
    session: Mutex<Option<ActiveSession>>,
    event_tx: Option<broadcast::Sender<DomainEvent>>,
    transcript_listener: Option<TranscriptListener>,
}

impl std::fmt::Debug for DictationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictationController")
            .field("state_machine", &self.state_machine)
            .field("session", &self.session)
            .field("has_recognizer", &self.recognizer.is_some())
            .field("has_form_store", &self.store.is_some())
            .finish()
    }
}

impl DictationController {
    /// Create a controller in the Idle state.
    ///
    /// `recognizer` is `None` when the platform has no speech recognition;
    /// every start then fails with [`DictationError::Unsupported`]. `sink`
    /// is the sending half of [`recognition_channel`](crate::recognition_channel).
    pub fn new(
        config: DictationConfig,
        focus: FocusHandle,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        notifier: Arc<dyn Notifier>,
        sink: RecognitionSink,
    ) -> Self {
        Self {
            config,
            focus,
            recognizer,
            notifier,
            store: None,
            sink,
            state_machine: StateMachine::new(),
            session: Mutex::new(None),
            event_tx: None,
            transcript_listener: None,
        }
    }

    /// Write through `store` for fields with a resolvable name.
    pub fn with_form_store(mut self, store: Arc<dyn FormStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Publish domain events on `tx`.
    pub fn with_event_bus(mut self, tx: broadcast::Sender<DomainEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_transcript_listener(mut self, listener: TranscriptListener) -> Self {
        self.transcript_listener = Some(listener);
        self
    }

    pub fn state(&self) -> DictationState {
        self.state_machine.current()
    }

    pub fn is_listening(&self) -> bool {
        self.state() == DictationState::Listening
    }

    /// Listening-state signal for UI bindings.
    pub fn subscribe_state(&self) -> watch::Receiver<DictationState> {
        self.state_machine.subscribe()
    }

    pub fn current_session_id(&self) -> Result<Option<Uuid>, DictationError> {
        Ok(self.session()?.as_ref().map(|s| s.id))
    }

    /// Start a capture session for the last focused editable field.
    ///
    /// Fails without touching any field when speech recognition is missing,
    /// a session is already running, nothing editable was ever focused, or
    /// the recognizer refuses to start. Each failure is also reported to the
    /// notifier.
    pub fn start(&self) -> Result<Uuid, DictationError> {
        let result = self.try_start();
        self.report(result)
    }

    /// Start a continuous session that appends every final segment to the
    /// configured transcript field, regardless of focus.
    ///
    /// Needs a form store; fails with [`DictationError::NoTranscriptStore`]
    /// otherwise.
    pub fn start_transcript(&self) -> Result<Uuid, DictationError> {
        let result = self.try_start_transcript();
        self.report(result)
    }

    fn report<T>(&self, result: Result<T, DictationError>) -> Result<T, DictationError> {
        if let Err(ref e) = result {
            self.notifier.notify(e.notification());
        }
        result
    }

    fn ready_recognizer(&self) -> Result<&Arc<dyn SpeechRecognizer>, DictationError> {
        let recognizer = self.recognizer.as_ref().ok_or(DictationError::Unsupported)?;
        if self.state() != DictationState::Idle {
            return Err(DictationError::SessionActive);
        }
        Ok(recognizer)
    }

    fn try_start(&self) -> Result<Uuid, DictationError> {
        let recognizer = self.ready_recognizer()?;

        let record = self
            .focus
            .snapshot()
            .filter(|record| record.field.is_editable())
            .ok_or(DictationError::NoActiveField)?;

        let strategy = WriteStrategy::select(self.store.as_ref(), record.field_name.as_deref());
        self.begin(
            recognizer,
            SessionTarget::Field { record, strategy },
            RecognitionConfig::from(&self.config),
        )
    }

    fn try_start_transcript(&self) -> Result<Uuid, DictationError> {
        let recognizer = self.ready_recognizer()?;
        let store = self.store.as_ref().ok_or(DictationError::NoTranscriptStore)?;

        let accumulator = TranscriptAccumulator::from_config(Arc::clone(store), &self.config);
        let mut recognition = RecognitionConfig::from(&self.config);
        recognition.continuous = true;
        self.begin(
            recognizer,
            SessionTarget::Transcript(Arc::new(accumulator)),
            recognition,
        )
    }

    fn begin(
        &self,
        recognizer: &Arc<dyn SpeechRecognizer>,
        target: SessionTarget,
        recognition: RecognitionConfig,
    ) -> Result<Uuid, DictationError> {
        let id = Uuid::new_v4();
        let field_name = target.field_name();
        let label = target.label();

        *self.session()? = Some(ActiveSession {
            id,
            started_at: Utc::now(),
            target,
            stop_requested: false,
            inserts: 0,
        });
        if let Err(e) = self.state_machine.transition(DictationState::Listening) {
            self.clear_session();
            return Err(e);
        }

        if let Err(reason) = recognizer.start(&recognition, self.sink.for_session(id)) {
            tracing::warn!(session_id = %id, error = %reason, "Speech recognizer failed to start");
            self.clear_session();
            self.state_machine.reset();
            return Err(DictationError::StartFailed(reason));
        }

        tracing::info!(
            session_id = %id,
            field = ?field_name,
            strategy = label,
            language = %recognition.language,
            continuous = recognition.continuous,
            "Dictation session started"
        );
        if self.config.announce_listening {
            self.notifier.notify(Notification::info("Listening... Speak now"));
        }
        self.publish(DomainEvent::DictationStarted {
            session_id: id,
            field_name,
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    /// Ask the recognizer to stop.
    ///
    /// The session stays Listening until the recognizer's `End` event is
    /// handled; a final result delivered before then is still written.
    /// Calling this while Idle does nothing.
    pub fn stop(&self) -> Result<(), DictationError> {
        let id = {
            let mut guard = self.session()?;
            match guard.as_mut() {
                Some(session) if !session.stop_requested => {
                    session.stop_requested = true;
                    session.id
                }
                Some(_) => return Ok(()),
                None => {
                    tracing::debug!("Stop requested with no active dictation session");
                    return Ok(());
                }
            }
        };

        tracing::info!(session_id = %id, "Dictation stop requested");
        if let Some(recognizer) = &self.recognizer {
            recognizer.stop();
        }
        Ok(())
    }

    /// Trigger semantics for a microphone button: stop while listening,
    /// start otherwise. Returns the new session id when one was started.
    pub fn toggle(&self) -> Result<Option<Uuid>, DictationError> {
        if self.is_listening() {
            self.stop()?;
            Ok(None)
        } else {
            self.start().map(Some)
        }
    }

    /// Abort the active session immediately. Results the recognizer has
    /// not delivered yet are discarded and never written.
    pub fn cancel(&self) -> Result<(), DictationError> {
        let Some(session) = self.session()?.take() else {
            return Ok(());
        };

        self.state_machine.transition(DictationState::Idle)?;
        if let Some(recognizer) = &self.recognizer {
            recognizer.abort();
        }

        tracing::info!(session_id = %session.id, "Dictation session cancelled");
        self.publish(DomainEvent::DictationCancelled {
            session_id: session.id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Apply one recognizer event.
    ///
    /// Events for a session that is no longer active are dropped. A
    /// recognition error is reported to the notifier, resets the session and
    /// is returned as `Err`.
    pub async fn handle_event(&self, event: SessionEvent) -> Result<(), DictationError> {
        let SessionEvent { session_id, event } = event;

        if self.current_session_id()? != Some(session_id) {
            tracing::debug!(session_id = %session_id, event = ?event, "Dropping stale recognizer event");
            return Ok(());
        }

        match event {
            RecognitionEvent::Result {
                transcript,
                is_final: true,
            } => {
                self.on_results(session_id, 0, &[ResultSegment::final_text(transcript)])
                    .await
            }
            RecognitionEvent::Result { .. } => {
                tracing::trace!(session_id = %session_id, "Ignoring interim result");
                Ok(())
            }
            RecognitionEvent::Results {
                result_index,
                segments,
            } => self.on_results(session_id, result_index, &segments).await,
            RecognitionEvent::Error { code } => self.fail(session_id, &code),
            RecognitionEvent::End => self.finish(session_id),
        }
    }

    /// Handle events until the channel closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event).await {
                tracing::debug!(error = %e, "Recognizer event ended the session");
            }
        }
    }

    /// Handle every event already queued. Returns how many were handled.
    pub async fn process_pending(
        &self,
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> usize {
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            if let Err(e) = self.handle_event(event).await {
                tracing::debug!(error = %e, "Recognizer event ended the session");
            }
            handled += 1;
        }
        handled
    }

    async fn on_results(
        &self,
        session_id: Uuid,
        result_index: usize,
        segments: &[ResultSegment],
    ) -> Result<(), DictationError> {
        let target = match self.session()?.as_ref() {
            Some(s) if s.id == session_id => s.target.clone(),
            _ => return Ok(()),
        };

        match target {
            SessionTarget::Field { record, strategy } => {
                let transcript = segments
                    .iter()
                    .skip(result_index)
                    .filter(|segment| segment.is_final)
                    .map(|segment| segment.transcript.trim())
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                self.insert(session_id, record, strategy, &transcript).await
            }
            SessionTarget::Transcript(accumulator) => {
                let Some(appended) = accumulator.on_results(result_index, segments) else {
                    tracing::trace!(session_id = %session_id, "No final segments to capture");
                    return Ok(());
                };
                let caret = accumulator.value().chars().count();
                self.inserted(
                    session_id,
                    Some(accumulator.field().to_string()),
                    appended.trim(),
                    caret,
                )
            }
        }
    }

    async fn insert(
        &self,
        session_id: Uuid,
        record: FocusRecord,
        strategy: WriteStrategy,
        transcript: &str,
    ) -> Result<(), DictationError> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            tracing::debug!(session_id = %session_id, "Empty transcript, nothing to insert");
            return Ok(());
        }

        let current = strategy.read(&record.field);
        let insertion = merge_transcript(&current, record.selection, transcript);
        let caret = strategy
            .apply(&record.field, &insertion.value, insertion.caret)
            .await;

        self.focus.set_caret(&record.field, caret);
        if let Some(session) = self.session()?.as_mut().filter(|s| s.id == session_id) {
            if let SessionTarget::Field { record, .. } = &mut session.target {
                record.selection = SelectionRange::caret(caret);
            }
        }

        self.inserted(session_id, record.field_name, transcript, caret)
    }

    fn inserted(
        &self,
        session_id: Uuid,
        field_name: Option<String>,
        transcript: &str,
        caret: usize,
    ) -> Result<(), DictationError> {
        if let Some(session) = self.session()?.as_mut().filter(|s| s.id == session_id) {
            session.inserts += 1;
        }

        let chars = transcript.chars().count();
        tracing::info!(
            session_id = %session_id,
            field = ?field_name,
            chars,
            caret,
            "Transcript inserted"
        );
        if let Some(listener) = &self.transcript_listener {
            listener(transcript);
        }
        self.publish(DomainEvent::TextInserted {
            session_id,
            field_name,
            chars,
            caret,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn fail(&self, session_id: Uuid, code: &str) -> Result<(), DictationError> {
        let error = DictationError::from_platform_code(code);
        if self.take_session(session_id)?.is_none() {
            return Ok(());
        }

        self.state_machine.transition(DictationState::Error)?;
        tracing::warn!(session_id = %session_id, code = %code, "Speech recognition failed");
        self.notifier.notify(error.notification());
        self.publish(DomainEvent::DictationFailed {
            session_id,
            code: code.to_string(),
            timestamp: Utc::now(),
        });
        self.state_machine.transition(DictationState::Idle)?;
        Err(error)
    }

    fn finish(&self, session_id: Uuid) -> Result<(), DictationError> {
        let Some(session) = self.take_session(session_id)? else {
            return Ok(());
        };

        self.state_machine.transition(DictationState::Idle)?;
        let duration_secs = session.elapsed_secs();
        tracing::info!(
            session_id = %session_id,
            inserts = session.inserts,
            duration_secs,
            "Dictation session ended"
        );
        self.publish(DomainEvent::DictationEnded {
            session_id,
            inserts: session.inserts,
            duration_secs,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn take_session(&self, session_id: Uuid) -> Result<Option<ActiveSession>, DictationError> {
        let mut guard = self.session()?;
        if guard.as_ref().is_some_and(|s| s.id == session_id) {
            Ok(guard.take())
        } else {
            Ok(None)
        }
    }

    fn clear_session(&self) {
        match self.session() {
            Ok(mut guard) => *guard = None,
            Err(e) => tracing::error!(error = %e, "Could not clear dictation session"),
        }
    }

    fn session(&self) -> Result<MutexGuard<'_, Option<ActiveSession>>, DictationError> {
        self.session
            .lock()
            .map_err(|e| DictationError::Lock(e.to_string()))
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(tx) = &self.event_tx {
            // No subscribers is fine.
            let _ = tx.send(event);
        }
    }
}
