//! Focus and selection tracking.
//!
//! The tracker keeps a single [`FocusRecord`] describing the most recently
//! focused editable field and its caret range. It survives focus moving to
//! non-editable controls such as the microphone button, which is why the
//! controller reads it instead of the live focus.
//!
//! The record lives in a `watch` channel: the tracker publishes, and the
//! controller reads a snapshot on demand through a [`FocusHandle`].

use std::fmt;
use std::sync::Arc;

use curascribe_core::config::DictationConfig;
use tokio::sync::watch;

use crate::field::{same_field, FieldHandle, SelectionRange};

/// Derives the logical field name from a field's identifying attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNameResolver {
    attributes: Vec<String>,
    prefixes: Vec<String>,
}

impl Default for FieldNameResolver {
    fn default() -> Self {
        Self::from_config(&DictationConfig::default())
    }
}

impl FieldNameResolver {
    pub fn new(attributes: Vec<String>, prefixes: Vec<String>) -> Self {
        Self {
            attributes,
            prefixes,
        }
    }

    pub fn from_config(config: &DictationConfig) -> Self {
        Self::new(
            config.identifier_attributes.clone(),
            config.field_prefixes.clone(),
        )
    }

    /// Strip the configured prefixes, in order, from a raw identifier.
    ///
    /// Returns `None` when nothing is left.
    pub fn strip(&self, identifier: &str) -> Option<String> {
        let mut name = identifier;
        for prefix in &self.prefixes {
            if let Some(rest) = name.strip_prefix(prefix.as_str()) {
                name = rest;
            }
        }
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// Resolve the logical name of `field` from the first non-empty
    /// identifying attribute.
    pub fn resolve(&self, field: &FieldHandle) -> Option<String> {
        self.attributes
            .iter()
            .filter_map(|attr| field.attribute(attr))
            .find(|value| !value.is_empty())
            .and_then(|identifier| self.strip(&identifier))
    }
}

/// Snapshot of the last focused editable field and its caret range.
#[derive(Clone)]
pub struct FocusRecord {
    pub field: FieldHandle,
    /// Logical name used by the form store; `None` forces direct writes.
    pub field_name: Option<String>,
    pub selection: SelectionRange,
}

impl fmt::Debug for FocusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusRecord")
            .field("kind", &self.field.kind())
            .field("field_name", &self.field_name)
            .field("selection", &self.selection)
            .finish()
    }
}

/// Read access to the tracker's record, plus the one write the controller
/// is allowed to make: moving the caret after an insert.
#[derive(Clone)]
pub struct FocusHandle {
    record: Arc<watch::Sender<Option<FocusRecord>>>,
}

impl fmt::Debug for FocusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusHandle")
            .field("record", &*self.record.borrow())
            .finish()
    }
}

impl FocusHandle {
    /// Current record, if any editable field has been focused.
    pub fn snapshot(&self) -> Option<FocusRecord> {
        self.record.borrow().clone()
    }

    /// Subscribe to record updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<FocusRecord>> {
        self.record.subscribe()
    }

    /// Collapse the recorded selection to `caret` if the record still points
    /// at `field`. Returns whether the record was updated.
    pub fn set_caret(&self, field: &FieldHandle, caret: usize) -> bool {
        self.record.send_if_modified(|record| match record {
            Some(rec) if same_field(&rec.field, field) => {
                rec.selection = SelectionRange::caret(caret);
                true
            }
            _ => false,
        })
    }
}

/// Observes focus and selection events and maintains the shared record.
#[derive(Debug, Clone)]
pub struct FocusTracker {
    handle: FocusHandle,
    resolver: FieldNameResolver,
}

impl Default for FocusTracker {
    fn default() -> Self {
        Self::new(FieldNameResolver::default())
    }
}

impl FocusTracker {
    pub fn new(resolver: FieldNameResolver) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            handle: FocusHandle {
                record: Arc::new(tx),
            },
            resolver,
        }
    }

    pub fn from_config(config: &DictationConfig) -> Self {
        Self::new(FieldNameResolver::from_config(config))
    }

    /// Handle shared with the dictation controller.
    pub fn handle(&self) -> FocusHandle {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> Option<FocusRecord> {
        self.handle.snapshot()
    }

    /// A field received focus. Non-editable targets are ignored.
    pub fn on_focus_in(&self, field: &FieldHandle) {
        if !field.is_editable() {
            tracing::trace!(kind = ?field.kind(), "Ignoring focus on non-editable control");
            return;
        }
        self.replace(field);
    }

    /// The document selection changed. `active` is the currently focused
    /// control, if any.
    ///
    /// When the active control is the recorded field only the selection is
    /// refreshed; a different editable control replaces the record.
    pub fn on_selection_change(&self, active: Option<&FieldHandle>) {
        let Some(field) = active.filter(|f| f.is_editable()) else {
            return;
        };

        let refreshed = self.handle.record.send_if_modified(|record| match record {
            Some(rec) if same_field(&rec.field, field) => {
                let selection = field.selection();
                if rec.selection == selection {
                    false
                } else {
                    rec.selection = selection;
                    true
                }
            }
            _ => false,
        });

        let same = self
            .handle
            .record
            .borrow()
            .as_ref()
            .is_some_and(|rec| same_field(&rec.field, field));
        if !refreshed && !same {
            self.replace(field);
        }
    }

    fn replace(&self, field: &FieldHandle) {
        let record = FocusRecord {
            field: Arc::clone(field),
            field_name: self.resolver.resolve(field),
            selection: field.selection(),
        };
        tracing::debug!(
            field = ?record.field_name,
            selection = %record.selection,
            "Focus record updated"
        );
        self.handle.record.send_replace(Some(record));
    }
}
