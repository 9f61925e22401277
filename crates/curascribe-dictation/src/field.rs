//! Editable field abstraction.
//!
//! Hosts implement [`EditableField`] for their text controls (DOM inputs,
//! widget toolkits, test doubles). Offsets are counted in `char`s.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shared handle to an editable control.
pub type FieldHandle = Arc<dyn EditableField>;

/// Kind of control behind a field handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Single-line text input.
    TextInput,
    /// Multi-line text area.
    TextArea,
    /// Anything else that can take focus (buttons, checkboxes, ...).
    Other(String),
}

impl FieldKind {
    pub fn is_editable(&self) -> bool {
        matches!(self, FieldKind::TextInput | FieldKind::TextArea)
    }
}

/// Change notification fired at observers bound to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldEvent {
    Input,
    Change,
}

/// Caret or selection range within a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    /// Build a range, ordering the bounds so that `start <= end`.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Collapsed range (plain caret).
    pub fn caret(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Clamp both bounds to `len`.
    pub fn clamp(&self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }
}

impl fmt::Display for SelectionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A focusable control exposing a text value and a caret range.
///
/// Methods take `&self`; implementations use interior mutability so a
/// single handle can be shared between the tracker and the controller.
pub trait EditableField: Send + Sync {
    fn kind(&self) -> FieldKind;

    /// Raw attribute lookup (`id`, `name`, `data-field`, ...).
    fn attribute(&self, name: &str) -> Option<String>;

    fn value(&self) -> String;

    /// Assign the value without notifying observers.
    fn set_value(&self, value: &str);

    /// Notify observers bound to this field.
    fn dispatch(&self, event: FieldEvent);

    fn selection(&self) -> SelectionRange;

    fn set_selection(&self, range: SelectionRange);

    fn focus(&self);

    fn is_editable(&self) -> bool {
        self.kind().is_editable()
    }
}

/// Identity comparison for field handles.
pub fn same_field(a: &FieldHandle, b: &FieldHandle) -> bool {
    Arc::ptr_eq(a, b)
}
