//! SequenceTree: Augmented splay tree of segments in document order
//!
//! Every segment ever created (tombstones included) lives in an arena and is
//! linked into a splay tree whose in-order traversal is the document order.
//! Each node caches the extent of its subtree, which is enough to walk from
//! the root to any document position without storing absolute positions
//! (those would all shift on every insert).
//!
//! # Structure
//!
//! ```text
//!            [b "llo"]             in-order: START, "he", "llo", "X", END
//!           /         \
//!     [a "he"]       [c "X"]
//!       /                \
//!   [START]              [END]
//! ```
//!
//! Two zero-width sentinels, `START` and `END`, bound the document. They are
//! never split or tombstoned and every real segment lies strictly between
//! them.
//!
//! # Invariant
//!
//! `node.subtree_extent == left.subtree_extent + node.extent +
//! right.subtree_extent` (composed with [`Point::traverse`]) for every node.
//! Every mutation restores it bottom-up before returning.

use super::id::Id;
use super::range::{Point, Range};
use super::segment::{Mark, Origin, Segment, SegmentIndex};
use crate::error::{Result, SyncError};
use std::collections::HashSet;
use std::ops::{Index, IndexMut};

/// Arena-backed augmented splay tree
#[derive(Debug, Clone)]
pub struct SequenceTree {
    segments: Vec<Segment>,
    root: SegmentIndex,
    start: SegmentIndex,
    end: SegmentIndex,
}

impl Index<SegmentIndex> for SequenceTree {
    type Output = Segment;

    fn index(&self, index: SegmentIndex) -> &Segment {
        &self.segments[index.0]
    }
}

impl IndexMut<SegmentIndex> for SequenceTree {
    fn index_mut(&mut self, index: SegmentIndex) -> &mut Segment {
        &mut self.segments[index.0]
    }
}

impl Default for SequenceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceTree {
    /// Create a tree holding only the two sentinels
    pub fn new() -> Self {
        let mut tree = Self {
            segments: Vec::new(),
            root: SegmentIndex(0),
            start: SegmentIndex(0),
            end: SegmentIndex(0),
        };

        let start = tree.push(Segment::sentinel(Id::START));
        let end = tree.push(Segment::sentinel(Id::END));

        tree[start].right = Some(end);
        tree[end].parent = Some(start);
        tree.update_extent(end);
        tree.update_extent(start);

        tree.root = start;
        tree.start = start;
        tree.end = end;
        tree
    }

    fn push(&mut self, segment: Segment) -> SegmentIndex {
        self.segments.push(segment);
        SegmentIndex(self.segments.len() - 1)
    }

    pub fn start(&self) -> SegmentIndex {
        self.start
    }

    pub fn end(&self) -> SegmentIndex {
        self.end
    }

    pub fn root(&self) -> SegmentIndex {
        self.root
    }

    /// Number of segments in the arena, sentinels and tombstones included
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when only the sentinels are present
    pub fn is_empty(&self) -> bool {
        self.segments.len() <= 2
    }

    /// Extent of the whole visible document
    pub fn total_extent(&self) -> Point {
        self[self.root].subtree_extent
    }

    fn subtree_extent_of(&self, node: Option<SegmentIndex>) -> Point {
        node.map_or(Point::ZERO, |index| self[index].subtree_extent)
    }

    /// Recompute the cached subtree extent of one node from its children
    fn update_extent(&mut self, node: SegmentIndex) {
        let left = self.subtree_extent_of(self[node].left);
        let right = self.subtree_extent_of(self[node].right);
        self[node].subtree_extent = left.traverse(self[node].extent).traverse(right);
    }

    // ------------------------------------------------------------------
    // Splay machinery
    // ------------------------------------------------------------------

    fn is_left_child(&self, node: Option<SegmentIndex>) -> bool {
        node.and_then(|n| self[n].parent.map(|p| self[p].left == Some(n)))
            .unwrap_or(false)
    }

    fn is_right_child(&self, node: Option<SegmentIndex>) -> bool {
        node.and_then(|n| self[n].parent.map(|p| self[p].right == Some(n)))
            .unwrap_or(false)
    }

    /// Re-point the link that referenced `old` (in its parent, or the root)
    /// at `new`
    fn replace_in_parent(&mut self, old: SegmentIndex, new: SegmentIndex) {
        match self[old].parent {
            Some(parent) if self[parent].left == Some(old) => self[parent].left = Some(new),
            Some(parent) => self[parent].right = Some(new),
            None => self.root = new,
        }
        self[new].parent = self[old].parent;
    }

    /// Rotate a right child up over its parent
    pub(crate) fn rotate_left(&mut self, pivot: SegmentIndex) {
        let Some(root) = self[pivot].parent else {
            return;
        };

        self.replace_in_parent(root, pivot);

        let inner = self[pivot].left;
        self[root].right = inner;
        if let Some(inner) = inner {
            self[inner].parent = Some(root);
        }

        self[pivot].left = Some(root);
        self[root].parent = Some(pivot);

        self.update_extent(root);
        self.update_extent(pivot);
    }

    /// Rotate a left child up over its parent
    pub(crate) fn rotate_right(&mut self, pivot: SegmentIndex) {
        let Some(root) = self[pivot].parent else {
            return;
        };

        self.replace_in_parent(root, pivot);

        let inner = self[pivot].right;
        self[root].left = inner;
        if let Some(inner) = inner {
            self[inner].parent = Some(root);
        }

        self[pivot].right = Some(root);
        self[root].parent = Some(pivot);

        self.update_extent(root);
        self.update_extent(pivot);
    }

    /// Rotate `node` up to the root
    pub fn splay(&mut self, node: SegmentIndex) {
        loop {
            let parent = self[node].parent;
            let this = Some(node);

            if self.is_left_child(parent) && self.is_right_child(this) {
                // zig-zag
                self.rotate_left(node);
                self.rotate_right(node);
            } else if self.is_right_child(parent) && self.is_left_child(this) {
                // zig-zag
                self.rotate_right(node);
                self.rotate_left(node);
            } else if self.is_left_child(parent) && self.is_left_child(this) {
                // zig-zig
                if let Some(parent) = parent {
                    self.rotate_right(parent);
                }
                self.rotate_right(node);
            } else if self.is_right_child(parent) && self.is_right_child(this) {
                // zig-zig
                if let Some(parent) = parent {
                    self.rotate_left(parent);
                }
                self.rotate_left(node);
            } else {
                // zig
                if self.is_left_child(this) {
                    self.rotate_right(node);
                } else if self.is_right_child(this) {
                    self.rotate_left(node);
                }
                return;
            }
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// In-order successor
    pub fn successor(&self, node: SegmentIndex) -> Option<SegmentIndex> {
        if let Some(mut next) = self[node].right {
            while let Some(left) = self[next].left {
                next = left;
            }
            return Some(next);
        }

        let mut child = node;
        while let Some(parent) = self[child].parent {
            if self[parent].left == Some(child) {
                return Some(parent);
            }
            child = parent;
        }
        None
    }

    /// In-order predecessor
    pub fn predecessor(&self, node: SegmentIndex) -> Option<SegmentIndex> {
        if let Some(mut prev) = self[node].left {
            while let Some(right) = self[prev].right {
                prev = right;
            }
            return Some(prev);
        }

        let mut child = node;
        while let Some(parent) = self[child].parent {
            if self[parent].right == Some(child) {
                return Some(parent);
            }
            child = parent;
        }
        None
    }

    /// Segments in document order, sentinels included
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tree: self,
            next: Some(self.start),
        }
    }

    /// Flattened visible text
    pub fn text(&self) -> String {
        self.iter()
            .filter(|(_, segment)| segment.visible)
            .map(|(_, segment)| segment.text.as_str())
            .collect()
    }

    /// Document position where `node` starts
    pub fn position_of(&self, node: SegmentIndex) -> Point {
        let mut position = self.subtree_extent_of(self[node].left);
        let mut child = node;

        while let Some(parent) = self[child].parent {
            if self[parent].right == Some(child) {
                let before = self
                    .subtree_extent_of(self[parent].left)
                    .traverse(self[parent].extent);
                position = before.traverse(position);
            }
            child = parent;
        }

        position
    }

    /// Live document range of `node` (a point for tombstones)
    pub fn range_of(&self, node: SegmentIndex) -> Range {
        let start = self.position_of(node);
        Range::from_points(start, start.traverse(self[node].extent))
    }

    /// Visible segment holding the character just before `point`
    ///
    /// Walks from the root with the cached extents: a point at or before a
    /// node's start lies on its left side, a point past its end on its right
    /// side, anything else is inside it. Returns `None` for the document
    /// start and for points past the end.
    pub fn segment_containing(&self, point: Point) -> Option<SegmentIndex> {
        let mut node = Some(self.root);
        let mut base = Point::ZERO;

        while let Some(current) = node {
            let start = base.traverse(self.subtree_extent_of(self[current].left));
            let end = start.traverse(self[current].extent);

            if point <= start {
                node = self[current].left;
            } else if point > end {
                base = end;
                node = self[current].right;
            } else {
                return Some(current);
            }
        }

        None
    }

    /// Resolve a document point to the segment ending there, without
    /// mutating anything
    ///
    /// Returns the containing segment and, when the point falls strictly
    /// inside it, the split offset (in the segment's insertion coordinates)
    /// that would make it end exactly at `point`.
    fn locate(&self, point: Point) -> Result<(SegmentIndex, Option<Range>)> {
        if point == Point::ZERO {
            return Ok((self.start, None));
        }

        let outside = SyncError::MalformedRange {
            range: Range::point(point),
            reason: "point lies outside the document",
        };
        if point > self.total_extent() {
            return Err(outside);
        }

        let node = self.segment_containing(point).ok_or(outside)?;
        let start = self.position_of(node);
        let local = point
            .traversal_from(start)
            .ok_or(SyncError::Invariant("located segment starts after point"))?;

        if local == self[node].extent {
            return Ok((node, None));
        }
        if local.byte_index_in(&self[node].text).is_none() {
            return Err(SyncError::MalformedRange {
                range: Range::point(point),
                reason: "point does not exist in the document",
            });
        }

        let at = Range::point(self[node].offset.start().traverse(local));
        Ok((node, Some(at)))
    }

    /// Make `point` a segment boundary and return the segment ending there
    /// (the start sentinel at the document start)
    pub fn split_at_point(&mut self, point: Point) -> Result<SegmentIndex> {
        let (node, at) = self.locate(point)?;
        if let Some(at) = at {
            self.split_segment(node, at)?;
        } else if node != self.start {
            self.splay(node);
        }
        Ok(node)
    }

    /// Resolve a document range to its `(left, right)` anchor pair
    ///
    /// Segments at both edges are split so the anchors are exact boundaries:
    /// `left` ends at `range.start`, `right` begins right after the segment
    /// ending at `range.end`. For a point range the pair is adjacent.
    /// Both edges are validated before anything is split.
    pub fn segment_boundary_by_range(
        &mut self,
        range: &Range,
    ) -> Result<(SegmentIndex, SegmentIndex)> {
        range.validate()?;
        self.locate(range.start())?;
        self.locate(range.end())?;

        let left = self.split_at_point(range.start())?;
        let last = if range.is_point() {
            left
        } else {
            self.split_at_point(range.end())?
        };
        let right = self
            .successor(last)
            .ok_or(SyncError::Invariant("end sentinel has no successor"))?;

        Ok((left, right))
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Insert `segment` between two adjacent segments
    pub fn insert_between(
        &mut self,
        prev: SegmentIndex,
        next: SegmentIndex,
        segment: Segment,
    ) -> Result<SegmentIndex> {
        if self.successor(prev) != Some(next) {
            return Err(SyncError::Invariant("insert_between anchors are not adjacent"));
        }

        self.splay(prev);

        let node = self.push(segment);
        let right = self[prev].right.take();

        self[node].left = Some(prev);
        self[node].right = right;
        self[node].parent = None;
        self[prev].parent = Some(node);
        if let Some(right) = right {
            self[right].parent = Some(node);
        }
        self.root = node;

        self.update_extent(prev);
        self.update_extent(node);
        Ok(node)
    }

    /// Segments strictly between `prev` and `next`, in document order
    pub fn segments_between(
        &self,
        prev: SegmentIndex,
        next: SegmentIndex,
    ) -> Result<Vec<SegmentIndex>> {
        let mut between = Vec::new();
        let mut cursor = self.successor(prev);

        loop {
            match cursor {
                Some(node) if node == next => return Ok(between),
                Some(node) if node == self.end => {
                    return Err(SyncError::Invariant("right anchor does not follow left anchor"))
                }
                Some(node) => {
                    between.push(node);
                    cursor = self.successor(node);
                }
                None => return Err(SyncError::Invariant("walked past the end sentinel")),
            }
        }
    }

    /// Tombstone every visible segment strictly between `prev` and `next`
    ///
    /// Returns the segments that were tombstoned by this call.
    pub fn delete_between(
        &mut self,
        prev: SegmentIndex,
        next: SegmentIndex,
    ) -> Result<Vec<SegmentIndex>> {
        let between = self.segments_between(prev, next)?;
        let mut deleted = Vec::new();

        for node in between {
            if self.tombstone(node) {
                deleted.push(node);
            }
        }

        Ok(deleted)
    }

    /// Mark one segment invisible; returns false if it already was
    pub fn tombstone(&mut self, node: SegmentIndex) -> bool {
        if !self[node].visible || node == self.start || node == self.end {
            return false;
        }

        self.splay(node);
        self[node].set_invisible();
        self.update_extent(node);
        true
    }

    /// Split `segment` at a point offset in its insertion's coordinates
    ///
    /// The prefix keeps its index; the suffix becomes its in-order
    /// successor and the next link of its split chain. Returns `Ok(None)`
    /// when the offset is at an edge of the segment.
    pub fn split_segment(
        &mut self,
        segment: SegmentIndex,
        at: Range,
    ) -> Result<Option<SegmentIndex>> {
        if segment == self.start || segment == self.end {
            return Err(SyncError::Invariant("sentinels cannot be split"));
        }

        self.splay(segment);

        let Some(mut suffix) = self[segment].split_at(at)? else {
            return Ok(None);
        };

        let right = self[segment].right;
        suffix.right = right;
        suffix.parent = Some(segment);
        suffix.next_split = self[segment].next_split;

        let node = self.push(suffix);
        if let Some(right) = right {
            self[right].parent = Some(node);
        }
        self[segment].right = Some(node);
        self[segment].next_split = Some(node);

        self.update_extent(node);
        self.update_extent(segment);
        Ok(Some(node))
    }

    /// Placement of a new segment among concurrent insertions
    ///
    /// Walks the segments between `left` and `right`. Segments sharing the
    /// new segment's left origin are siblings: smaller ids go first, and a
    /// larger sibling with the same right origin ends the walk. A segment
    /// whose left origin lies inside the walked run stays attached to that
    /// run, so it is skipped together with its parent. Any other segment
    /// ends the walk. `containing` maps an origin mark to the segment
    /// holding that character.
    ///
    /// Returns the adjacent pair the new segment belongs between.
    pub fn insertion_point<F>(
        &self,
        id: Id,
        origin: &Origin,
        left: SegmentIndex,
        right: SegmentIndex,
        containing: F,
    ) -> Result<(SegmentIndex, SegmentIndex)>
    where
        F: Fn(Mark) -> Option<SegmentIndex>,
    {
        let mut slow = left;
        let mut fast = self
            .successor(slow)
            .ok_or(SyncError::Invariant("left anchor has no successor"))?;

        let mut walked = HashSet::new();
        let mut conflicting = HashSet::new();

        while fast != self.end && fast != right {
            walked.insert(fast);
            conflicting.insert(fast);

            let segment = &self[fast];
            let segment_origin = segment.left_origin();
            if segment_origin == origin.left {
                if segment.id < id {
                    slow = fast;
                    conflicting.clear();
                } else if segment.right_origin() == origin.right {
                    break;
                }
            } else {
                match containing(segment_origin) {
                    Some(parent) if walked.contains(&parent) => {
                        if !conflicting.contains(&parent) {
                            slow = fast;
                            conflicting.clear();
                        }
                    }
                    _ => break,
                }
            }

            fast = self
                .successor(fast)
                .ok_or(SyncError::Invariant("walked past the end sentinel"))?;
        }

        let next = self
            .successor(slow)
            .ok_or(SyncError::Invariant("walked past the end sentinel"))?;
        Ok((slow, next))
    }

    /// Verify parent links, cached extents and sentinel placement
    pub fn check_invariants(&self) -> Result<()> {
        if self[self.root].parent.is_some() {
            return Err(SyncError::Invariant("root has a parent"));
        }

        let mut stack = vec![self.root];
        let mut visited = 0;
        while let Some(node) = stack.pop() {
            visited += 1;
            for child in [self[node].left, self[node].right].into_iter().flatten() {
                if self[child].parent != Some(node) {
                    return Err(SyncError::Invariant("child does not point back to parent"));
                }
                stack.push(child);
            }

            let left = self.subtree_extent_of(self[node].left);
            let right = self.subtree_extent_of(self[node].right);
            if self[node].subtree_extent != left.traverse(self[node].extent).traverse(right) {
                return Err(SyncError::Invariant("stale subtree extent"));
            }
        }
        if visited != self.segments.len() {
            return Err(SyncError::Invariant("arena holds unlinked segments"));
        }

        let order: Vec<SegmentIndex> = self.iter().map(|(index, _)| index).collect();
        if order.first() != Some(&self.start) || order.last() != Some(&self.end) {
            return Err(SyncError::Invariant("sentinels are not at the document edges"));
        }

        Ok(())
    }
}

/// In-order iterator over `(index, segment)` pairs
pub struct Iter<'a> {
    tree: &'a SequenceTree,
    next: Option<SegmentIndex>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (SegmentIndex, &'a Segment);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.successor(current);
        Some((current, &self.tree[current]))
    }
}
