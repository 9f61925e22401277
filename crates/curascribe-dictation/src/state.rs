//! Dictation state machine with a watchable listening signal.
//!
//! Valid transitions:
//! - Idle -> Listening (capture started)
//! - Listening -> Idle (recognizer ended, or session cancelled)
//! - Listening -> Error (recognizer reported an error)
//! - Error -> Idle (automatic reset after the error is surfaced)

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::DictationError;

/// Operational state of a dictation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictationState {
    /// No session in progress. Ready to start.
    Idle,
    /// The recognizer is capturing speech.
    Listening,
    /// The recognizer failed; about to reset to Idle.
    Error,
}

impl fmt::Display for DictationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictationState::Idle => write!(f, "Idle"),
            DictationState::Listening => write!(f, "Listening"),
            DictationState::Error => write!(f, "Error"),
        }
    }
}

impl DictationState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &DictationState) -> bool {
        matches!(
            (self, target),
            (DictationState::Idle, DictationState::Listening)
                | (DictationState::Listening, DictationState::Idle)
                | (DictationState::Listening, DictationState::Error)
                | (DictationState::Error, DictationState::Idle)
        )
    }
}

/// State machine for dictation transitions.
///
/// Backed by a `watch` channel so UI code can subscribe to the current
/// state. Clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<watch::Sender<DictationState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DictationState::Idle);
        Self { state: Arc::new(tx) }
    }

    /// Returns the current state.
    pub fn current(&self) -> DictationState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<DictationState> {
        self.state.subscribe()
    }

    /// Attempt to transition to the target state.
    ///
    /// Subscribers are only woken when the transition is applied.
    pub fn transition(&self, target: DictationState) -> Result<(), DictationError> {
        let mut from = DictationState::Idle;
        let applied = self.state.send_if_modified(|state| {
            from = *state;
            if state.can_transition_to(&target) {
                *state = target;
                true
            } else {
                false
            }
        });

        if applied {
            tracing::debug!("Dictation state: {} -> {}", from, target);
            Ok(())
        } else {
            Err(DictationError::InvalidTransition(from, target))
        }
    }

    /// Force the state machine back to Idle.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if *state == DictationState::Idle {
                return false;
            }
            tracing::warn!("Dictation state machine reset to Idle from {}", *state);
            *state = DictationState::Idle;
            true
        });
    }
}
