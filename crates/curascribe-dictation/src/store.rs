//! Form store abstraction and field write strategies.
//!
//! When a form store is available and the focused field has a logical name,
//! the store is authoritative: the merged value is written there first and
//! the visible field is reconciled from it afterwards. Otherwise the value
//! is written straight to the field and its observers are notified.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::field::{FieldEvent, FieldHandle, SelectionRange};

/// Key-value view over form state.
#[async_trait]
pub trait FormStore: Send + Sync {
    fn get_field_value(&self, name: &str) -> Option<String>;

    fn set_field_value(&self, name: &str, value: &str);

    /// Mark `name` as touched and run its validators. Failures are the
    /// store's business and do not affect the write.
    fn validate_field(&self, _name: &str) {}

    /// Resolves once writes made through `set_field_value` are visible to
    /// `get_field_value`, including any normalization the store applies.
    async fn settled(&self) {
        tokio::task::yield_now().await;
    }
}

/// How a merged value reaches the target field.
///
/// Selected once when a session starts.
#[derive(Clone)]
pub enum WriteStrategy {
    /// Write through the form store, then reconcile the field from it.
    Store {
        store: Arc<dyn FormStore>,
        field_name: String,
    },
    /// Assign the field value directly and fire change notifications.
    Direct,
}

impl fmt::Debug for WriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStrategy::Store { field_name, .. } => f
                .debug_struct("Store")
                .field("field_name", field_name)
                .finish(),
            WriteStrategy::Direct => write!(f, "Direct"),
        }
    }
}

impl WriteStrategy {
    pub fn select(store: Option<&Arc<dyn FormStore>>, field_name: Option<&str>) -> Self {
        match (store, field_name) {
            (Some(store), Some(name)) => WriteStrategy::Store {
                store: Arc::clone(store),
                field_name: name.to_string(),
            },
            _ => WriteStrategy::Direct,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WriteStrategy::Store { .. } => "store",
            WriteStrategy::Direct => "direct",
        }
    }

    /// Current value of the target, as seen by this strategy.
    pub fn read(&self, field: &FieldHandle) -> String {
        match self {
            WriteStrategy::Store { store, field_name } => store
                .get_field_value(field_name)
                .unwrap_or_else(|| field.value()),
            WriteStrategy::Direct => field.value(),
        }
    }

    /// Write `value` to the target, place the caret and refocus the field.
    ///
    /// Returns the caret position actually applied, which is clamped if the
    /// store normalized the value to something shorter.
    pub async fn apply(&self, field: &FieldHandle, value: &str, caret: usize) -> usize {
        let caret = match self {
            WriteStrategy::Store { store, field_name } => {
                store.set_field_value(field_name, value);
                store.validate_field(field_name);
                store.settled().await;

                let stored = store
                    .get_field_value(field_name)
                    .unwrap_or_else(|| value.to_string());
                if field.value() != stored {
                    field.set_value(&stored);
                }
                caret.min(stored.chars().count())
            }
            WriteStrategy::Direct => {
                field.set_value(value);
                field.dispatch(FieldEvent::Input);
                field.dispatch(FieldEvent::Change);
                caret
            }
        };

        field.set_selection(SelectionRange::caret(caret));
        field.focus();
        caret
    }
}
