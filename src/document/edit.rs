//! Host editor edit events

use crate::crdt::Range;
use serde::{Deserialize, Serialize};

/// A single contiguous replacement reported by the host editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEvent {
    /// The range that got replaced
    pub range: Range,

    /// The new text for the range
    pub text: String,

    /// Length of the replaced range, as reported by the host
    #[serde(default)]
    pub range_length: usize,
}

/// What an edit event turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Point range, non-empty text
    Insertion,
    /// Non-empty range, empty text
    Deletion,
    /// Non-empty range and non-empty text
    Splice,
    /// Point range and empty text
    Noop,
}

impl EditEvent {
    pub fn new(range: Range, text: impl Into<String>, range_length: usize) -> Self {
        Self {
            range,
            text: text.into(),
            range_length,
        }
    }

    /// Insert `text` at a point range
    pub fn insert(at: Range, text: impl Into<String>) -> Self {
        Self::new(at.collapse_to_start(), text, 0)
    }

    /// Remove the text covered by `range`
    pub fn delete(range: Range, range_length: usize) -> Self {
        Self::new(range, String::new(), range_length)
    }

    pub fn kind(&self) -> EditKind {
        match (self.range.is_point(), self.text.is_empty()) {
            (true, true) => EditKind::Noop,
            (true, false) => EditKind::Insertion,
            (false, true) => EditKind::Deletion,
            (false, false) => EditKind::Splice,
        }
    }
}
