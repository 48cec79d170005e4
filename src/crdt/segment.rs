//! Segment: A run of text created by one insertion
//!
//! A segment is both the unit of text and a node of the sequence tree. Each
//! insertion creates one segment; later edits that land inside it split it
//! into fragments which all keep the insertion's [`Id`] and differ by their
//! `offset` (where the fragment sits inside the original inserted text).
//!
//! Fragments of the same insertion are chained through `next_split` in
//! offset order, so any `(id, offset)` pair can be resolved by walking the
//! chain from the first fragment.
//!
//! Every segment also remembers its [`Origin`]: the characters its
//! insertion was typed between. Concurrent insertions are ordered by
//! comparing origins, see [`super::tree::SequenceTree::insertion_point`].

use super::id::Id;
use super::range::{Point, Range};
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// Stable arena index of a segment inside a [`super::tree::SequenceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentIndex(pub(crate) usize);

impl SegmentIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// One character of an insertion, named by the insertion id and a point
/// in that insertion's own coordinates
///
/// As a left origin the mark names the character ending at `point`; as a
/// right origin the character starting there. Sentinels use
/// [`Point::ZERO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mark {
    pub id: Id,
    pub point: Point,
}

impl Mark {
    pub fn new(id: Id, point: Point) -> Self {
        Self { id, point }
    }
}

/// Neighbours of an insertion at the moment it was made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub left: Mark,
    pub right: Mark,
}

impl Origin {
    pub fn new(left: Mark, right: Mark) -> Self {
        Self { left, right }
    }

    /// Between the two sentinels
    pub fn document() -> Self {
        Self::new(Mark::new(Id::START, Point::ZERO), Mark::new(Id::END, Point::ZERO))
    }
}

/// A fragment of inserted text plus its tree links
#[derive(Debug, Clone)]
pub struct Segment {
    pub(crate) id: Id,

    /// Position of this fragment inside the original insertion text,
    /// starting at (1,1)
    pub(crate) offset: Range,

    pub(crate) text: String,

    /// Origin of the whole insertion, shared by every fragment
    pub(crate) origin: Origin,

    /// Tombstones stay in the tree with `visible == false`
    pub(crate) visible: bool,

    /// Visible extent of this fragment alone (zero when tombstoned)
    pub(crate) extent: Point,

    /// Cached extent of the whole subtree rooted here
    pub(crate) subtree_extent: Point,

    pub(crate) parent: Option<SegmentIndex>,
    pub(crate) left: Option<SegmentIndex>,
    pub(crate) right: Option<SegmentIndex>,

    /// Next fragment of the same insertion, in offset order
    pub(crate) next_split: Option<SegmentIndex>,
}

impl Segment {
    /// Create a fresh, visible segment holding a whole insertion
    pub fn new(id: Id, text: String) -> Self {
        let offset = Range::of_text(&text);
        Self::fragment(id, text, offset, true)
    }

    /// Zero-width segment used for the document start/end markers
    pub fn sentinel(id: Id) -> Self {
        Self::fragment(id, String::new(), Range::ORIGIN, true)
    }

    fn fragment(id: Id, text: String, offset: Range, visible: bool) -> Self {
        let extent = if visible {
            Point::extent_of(&text)
        } else {
            Point::ZERO
        };

        Self {
            id,
            offset,
            text,
            origin: Origin::document(),
            visible,
            extent,
            subtree_extent: extent,
            parent: None,
            left: None,
            right: None,
            next_split: None,
        }
    }

    /// Record the neighbours this insertion was made between
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Character this fragment's first character was typed after
    ///
    /// For a fragment split off the middle of an insertion that is the
    /// previous character of the same insertion.
    pub fn left_origin(&self) -> Mark {
        let start = self.offset.start();
        if start == Point::ZERO {
            self.origin.left
        } else {
            Mark::new(self.id, start)
        }
    }

    pub fn right_origin(&self) -> Mark {
        self.origin.right
    }

    pub fn offset(&self) -> Range {
        self.offset
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Extent this fragment contributes to the live document
    pub fn extent(&self) -> Point {
        self.extent
    }

    pub fn subtree_extent(&self) -> Point {
        self.subtree_extent
    }

    pub fn next_split(&self) -> Option<SegmentIndex> {
        self.next_split
    }

    /// Tombstone this fragment; the text is retained
    pub fn set_invisible(&mut self) {
        self.visible = false;
        self.extent = Point::ZERO;
    }

    /// Split this fragment at a point of its insertion's coordinate space
    ///
    /// Keeps the prefix in `self` and returns the suffix. Splitting exactly
    /// at the fragment's start or end is a no-op and returns `Ok(None)`.
    /// The returned suffix has no tree links; the tree wires it in.
    pub fn split_at(&mut self, at: Range) -> Result<Option<Segment>> {
        if !at.is_point() {
            return Err(SyncError::MalformedRange {
                range: at,
                reason: "split offset must be a point",
            });
        }
        if !self.offset.contains_point(at.start()) {
            return Err(SyncError::MalformedRange {
                range: at,
                reason: "split offset lies outside the segment",
            });
        }
        if at.is_at_left_edge_of(&self.offset) || at.is_at_right_edge_of(&self.offset) {
            return Ok(None);
        }

        let local = at
            .start()
            .traversal_from(self.offset.start())
            .ok_or(SyncError::Invariant("split point precedes segment start"))?;
        let byte_index = local
            .byte_index_in(&self.text)
            .ok_or(SyncError::MalformedRange {
                range: at,
                reason: "split offset does not fall on a character boundary",
            })?;

        let suffix_text = self.text.split_off(byte_index);
        let suffix_offset = Range::from_points(at.start(), self.offset.end());
        let suffix = Segment::fragment(self.id, suffix_text, suffix_offset, self.visible)
            .with_origin(self.origin);

        self.offset = Range::from_points(self.offset.start(), at.start());
        self.extent = if self.visible {
            Point::extent_of(&self.text)
        } else {
            Point::ZERO
        };

        Ok(Some(suffix))
    }
}

/// Read-only view of a segment, as returned by
/// [`crate::Document::get_all_segments`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub id: Id,
    pub offset: Range,
    /// Current position in the live document (a point for tombstones)
    pub range: Range,
    pub text: String,
    pub is_visible: bool,
}
