//! Transcript merging with separator spacing.
//!
//! A transcript replaces the selected range of the current value. A single
//! space is added on each side where the neighbouring character is not
//! already a space; nothing is added at the string boundaries.

use crate::field::SelectionRange;

/// Result of merging a transcript into a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// The full new field value.
    pub value: String,
    /// Caret position just after the inserted transcript, in chars.
    pub caret: usize,
    pub leading_space: bool,
    pub trailing_space: bool,
}

/// Merge `transcript` into `current`, replacing `selection`.
///
/// Offsets are in chars. The selection is clamped to the value length, so a
/// stale selection never splits the value out of range.
pub fn merge_transcript(current: &str, selection: SelectionRange, transcript: &str) -> Insertion {
    let chars: Vec<char> = current.chars().collect();
    let SelectionRange { start, end } = selection.clamp(chars.len());

    let leading_space = start > 0 && chars[start - 1] != ' ';
    let trailing_space = end < chars.len() && chars[end] != ' ';

    let mut value = String::with_capacity(current.len() + transcript.len() + 2);
    value.extend(&chars[..start]);
    if leading_space {
        value.push(' ');
    }
    value.push_str(transcript);
    if trailing_space {
        value.push(' ');
    }
    value.extend(&chars[end..]);

    let caret = start + usize::from(leading_space) + transcript.chars().count();

    Insertion {
        value,
        caret,
        leading_space,
        trailing_space,
    }
}
