//! Continuous transcript capture into a single store field.
//!
//! Used for free-running capture such as a consultation transcript box:
//! every final segment is appended to the field followed by one space,
//! regardless of focus or caret.

use std::sync::Arc;

use curascribe_core::config::DictationConfig;

use crate::recognizer::ResultSegment;
use crate::store::FormStore;

/// Appends final recognition segments to a fixed store field.
pub struct TranscriptAccumulator {
    store: Arc<dyn FormStore>,
    field: String,
}

impl std::fmt::Debug for TranscriptAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptAccumulator")
            .field("field", &self.field)
            .finish()
    }
}

impl TranscriptAccumulator {
    pub fn new(store: Arc<dyn FormStore>, field: impl Into<String>) -> Self {
        Self {
            store,
            field: field.into(),
        }
    }

    /// Accumulator targeting the configured transcript field.
    pub fn from_config(store: Arc<dyn FormStore>, config: &DictationConfig) -> Self {
        Self::new(store, config.transcript_field.clone())
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Everything captured so far.
    pub fn value(&self) -> String {
        self.store.get_field_value(&self.field).unwrap_or_default()
    }

    /// Append the final segments at or after `result_index`.
    ///
    /// Returns the appended text, or `None` when nothing was final.
    pub fn on_results(&self, result_index: usize, segments: &[ResultSegment]) -> Option<String> {
        let appended: String = segments
            .iter()
            .skip(result_index)
            .filter(|segment| segment.is_final)
            .map(|segment| format!("{} ", segment.transcript))
            .collect();

        if appended.is_empty() {
            return None;
        }

        let mut value = self.value();
        value.push_str(&appended);
        self.store.set_field_value(&self.field, &value);
        tracing::debug!(field = %self.field, chars = appended.chars().count(), "Transcript appended");
        Some(appended)
    }

    pub fn clear(&self) {
        self.store.set_field_value(&self.field, "");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFormStore;

    fn accumulator() -> (Arc<MemoryFormStore>, TranscriptAccumulator) {
        let store = Arc::new(MemoryFormStore::new());
        let acc = TranscriptAccumulator::from_config(store.clone(), &DictationConfig::default());
        (store, acc)
    }

    #[test]
    fn test_appends_final_segments_with_trailing_space() {
        let (store, acc) = accumulator();
        assert_eq!(acc.field(), "transcript");

        let appended = acc.on_results(0, &[ResultSegment::final_text("Good morning")]);
        assert_eq!(appended.as_deref(), Some("Good morning "));

        acc.on_results(0, &[ResultSegment::final_text("how are you")]);
        assert_eq!(acc.value(), "Good morning how are you ");
        assert_eq!(
            store.get_field_value("transcript").as_deref(),
            Some("Good morning how are you ")
        );
    }

    #[test]
    fn test_skips_interim_and_already_seen_segments() {
        let (store, acc) = accumulator();
        let segments = vec![
            ResultSegment::final_text("already handled"),
            ResultSegment::final_text("knee pain"),
            ResultSegment::interim("since tues"),
        ];

        let appended = acc.on_results(1, &segments);
        assert_eq!(appended.as_deref(), Some("knee pain "));
        assert_eq!(
            store.get_field_value("transcript").as_deref(),
            Some("knee pain ")
        );
    }

    #[test]
    fn test_interim_only_leaves_store_untouched() {
        let (store, acc) = accumulator();
        assert_eq!(acc.on_results(0, &[ResultSegment::interim("um")]), None);
        assert_eq!(store.get_field_value("transcript"), None);
    }

    #[test]
    fn test_clear() {
        let (store, acc) = accumulator();
        acc.on_results(0, &[ResultSegment::final_text("text")]);
        acc.clear();
        assert_eq!(store.get_field_value("transcript").as_deref(), Some(""));
    }
}
