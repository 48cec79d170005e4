//! Document: One replica of the shared text
//!
//! The document owns the sequence tree, the id → segment shortcut map and
//! the pending queue, and is the only thing allowed to mutate them, so the
//! three always agree.
//!
//! # Local edits
//!
//! ```rust
//! use synckit_sequence::{Document, EditEvent, Range};
//!
//! let mut doc = Document::with_site(1).unwrap();
//! let op = doc.apply_local_edit(&EditEvent::insert(Range::ORIGIN, "hello")).unwrap();
//!
//! assert_eq!(doc.text(), "hello");
//! assert!(op.is_some()); // ready to broadcast
//! ```
//!
//! # Remote operations
//!
//! ```rust
//! use synckit_sequence::{Document, EditEvent, Integration, Range};
//!
//! let mut alice = Document::with_site(1).unwrap();
//! let mut bob = Document::with_site(2).unwrap();
//!
//! let op = alice
//!     .apply_local_edit(&EditEvent::insert(Range::ORIGIN, "hi"))
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(bob.integrate_remote(op.clone()).unwrap(), Integration::Applied);
//! assert_eq!(bob.integrate_remote(op).unwrap(), Integration::Duplicate);
//! assert_eq!(bob.text(), "hi");
//! ```

mod edit;

pub use edit::{EditEvent, EditKind};

use crate::config::SyncConfig;
use crate::crdt::{
    Anchor, DeleteNode, Deletion, Id, Insertion, Mark, Operation, Origin, Point, Range,
    Segment, SegmentIndex, SegmentInfo, SequenceTree, SiteId, Splice,
};
use crate::crdt::id::RESERVED_SITE;
use crate::error::{Result, SyncError};
use crate::sync::PendingQueue;
use std::collections::{HashMap, HashSet};

/// Outcome of offering a remote operation to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// Applied to the tree
    Applied,
    /// Anchors missing; waiting in the pending queue
    Parked,
    /// Already integrated or already parked; nothing changed
    Duplicate,
}

/// Which end of a fragment an offset point addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    /// The fragment ending at the point
    Before,
    /// The fragment starting at the point
    After,
}

/// A replica of the collaborative document
#[derive(Debug, Clone)]
pub struct Document {
    tree: SequenceTree,

    /// Insertion id → first fragment of that insertion
    segment_shortcut: HashMap<Id, SegmentIndex>,

    pending: PendingQueue,

    /// Ids of every operation applied here, local or remote
    integrated: HashSet<Id>,

    /// Operations in the order they were applied (a causally valid order)
    history: Vec<Operation>,

    site: Option<SiteId>,
    counter: u64,
    config: SyncConfig,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with no site assigned yet
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        let tree = SequenceTree::new();
        let mut segment_shortcut = HashMap::new();
        segment_shortcut.insert(Id::START, tree.start());
        segment_shortcut.insert(Id::END, tree.end());

        Self {
            tree,
            segment_shortcut,
            pending: PendingQueue::new(),
            integrated: HashSet::new(),
            history: Vec::new(),
            site: None,
            counter: 0,
            config,
        }
    }

    /// Create an empty document and assign its site in one step
    pub fn with_site(site: SiteId) -> Result<Self> {
        let mut doc = Self::new();
        doc.set_client_id(site)?;
        Ok(doc)
    }

    /// Assign the local site id; accepted exactly once per session
    pub fn set_client_id(&mut self, site: SiteId) -> Result<()> {
        if site == RESERVED_SITE {
            return Err(SyncError::ReservedSite(site));
        }
        if let Some(existing) = self.site {
            return Err(SyncError::SiteAlreadyAssigned(existing));
        }

        // Operations of ours replayed before the assignment must not be reissued
        self.counter = self
            .integrated
            .iter()
            .filter(|id| id.site == site)
            .map(|id| id.counter)
            .max()
            .unwrap_or(0);
        self.site = Some(site);

        log::debug!("site {} assigned (counter at {})", site, self.counter);
        Ok(())
    }

    pub fn site(&self) -> Option<SiteId> {
        self.site
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Flattened visible text
    pub fn text(&self) -> String {
        self.tree.text()
    }

    /// Extent of the visible text
    pub fn extent(&self) -> Point {
        self.tree.total_extent()
    }

    /// Number of operations waiting for their anchors
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Every operation applied to this replica, in application order
    pub fn history(&self) -> &[Operation] {
        &self.history
    }

    /// Check if an operation with this id has been applied
    pub fn has_integrated(&self, id: Id) -> bool {
        self.integrated.contains(&id)
    }

    pub fn tree(&self) -> &SequenceTree {
        &self.tree
    }

    /// All segments in document order, tombstones included, sentinels
    /// excluded
    pub fn get_all_segments(&self) -> Vec<SegmentInfo> {
        let mut position = Point::ZERO;
        let mut segments = Vec::new();

        for (index, segment) in self.tree.iter() {
            if index == self.tree.start() || index == self.tree.end() {
                continue;
            }

            let end = position.traverse(segment.extent());
            segments.push(SegmentInfo {
                id: segment.id(),
                offset: segment.offset(),
                range: Range::from_points(position, end),
                text: segment.text().to_string(),
                is_visible: segment.is_visible(),
            });
            position = end;
        }

        segments
    }

    /// Live range spanned by all fragments of an insertion
    pub fn segment_range(&self, id: Id) -> Result<Range> {
        let head = self.head_of(id)?;
        let range = self
            .chain(head)
            .map(|fragment| self.tree.range_of(fragment))
            .reduce(|merged, range| merged.merge(&range))
            .unwrap_or(Range::ORIGIN);
        Ok(range)
    }

    // ------------------------------------------------------------------
    // Local edits
    // ------------------------------------------------------------------

    /// Apply a host editor change and return the operation to broadcast
    ///
    /// Returns `Ok(None)` for edits that change nothing. On error nothing
    /// has been applied.
    pub fn apply_local_edit(&mut self, edit: &EditEvent) -> Result<Option<Operation>> {
        let site = self.site.ok_or(SyncError::SiteNotAssigned)?;
        let kind = edit.kind();
        if kind == EditKind::Noop {
            return Ok(None);
        }

        let (left, right) = self.tree.segment_boundary_by_range(&edit.range)?;
        let left_anchor = self.anchor_of(left);
        let right_anchor = self.anchor_of(right);

        let operation: Operation = match kind {
            EditKind::Insertion => {
                let origin = self.origin_of(left_anchor, right_anchor)?;
                let id = self.next_id(site);
                self.place_insertion(id, edit.text.clone(), origin, left, right)?;
                Insertion {
                    id,
                    left: left_anchor,
                    right: right_anchor,
                    text: edit.text.clone(),
                }
                .into()
            }
            EditKind::Deletion => {
                let delete_nodes = self.delete_local(left, right)?;
                if delete_nodes.is_empty() {
                    return Ok(None);
                }
                Deletion {
                    id: self.next_id(site),
                    left: left_anchor,
                    right: right_anchor,
                    delete_nodes,
                }
                .into()
            }
            EditKind::Splice => {
                let delete_nodes = self.delete_local(left, right)?;

                // New text sits directly after `left`, ahead of the
                // fragments it replaces
                let right = self
                    .tree
                    .successor(left)
                    .ok_or(SyncError::Invariant("left anchor has no successor"))?;
                let right_anchor = self.anchor_of(right);
                let origin = self.origin_of(left_anchor, right_anchor)?;
                let id = self.next_id(site);
                self.place_insertion(id, edit.text.clone(), origin, left, right)?;
                Splice {
                    id,
                    left: left_anchor,
                    right: right_anchor,
                    delete_nodes,
                    text: edit.text.clone(),
                }
                .into()
            }
            EditKind::Noop => return Ok(None),
        };

        log::trace!(
            "local op {} (type {}) between {} and {}",
            operation.id(),
            operation.type_code(),
            operation.left().id,
            operation.right().id
        );
        self.record(operation.clone());
        Ok(Some(operation))
    }

    /// Insert `text` at a 1-based line/column point
    pub fn insert(&mut self, line: u32, column: u32, text: &str) -> Result<Option<Operation>> {
        let at = Range::try_new(line, column, line, column)?;
        self.apply_local_edit(&EditEvent::insert(at, text))
    }

    /// Delete the text covered by `range`
    pub fn delete(&mut self, range: Range) -> Result<Option<Operation>> {
        self.apply_local_edit(&EditEvent::delete(range, 0))
    }

    /// Replace the text covered by `range`
    pub fn splice(&mut self, range: Range, text: &str) -> Result<Option<Operation>> {
        self.apply_local_edit(&EditEvent::new(range, text, 0))
    }

    fn next_id(&mut self, site: SiteId) -> Id {
        self.counter += 1;
        Id::new(site, self.counter)
    }

    fn anchor_of(&self, index: SegmentIndex) -> Anchor {
        let segment = &self.tree[index];
        if segment.id().is_sentinel() {
            Anchor::new(segment.id(), None)
        } else {
            Anchor::new(segment.id(), Some(segment.offset()))
        }
    }

    fn delete_local(&mut self, left: SegmentIndex, right: SegmentIndex) -> Result<Vec<DeleteNode>> {
        let deleted = self.tree.delete_between(left, right)?;
        Ok(deleted
            .into_iter()
            .map(|index| DeleteNode::new(self.tree[index].id(), Some(self.tree[index].offset())))
            .collect())
    }

    /// Create the segment for insertion `id` among whatever lies between
    /// `left` and `right`
    fn place_insertion(
        &mut self,
        id: Id,
        text: String,
        origin: Origin,
        left: SegmentIndex,
        right: SegmentIndex,
    ) -> Result<SegmentIndex> {
        let (prev, next) =
            self.tree
                .insertion_point(id, &origin, left, right, |mark| self.segment_of_mark(mark))?;
        let segment = Segment::new(id, text).with_origin(origin);
        let node = self.tree.insert_between(prev, next, segment)?;
        self.segment_shortcut.insert(id, node);
        Ok(node)
    }

    fn record(&mut self, operation: Operation) {
        let id = operation.id();
        if self.site == Some(id.site) {
            self.counter = self.counter.max(id.counter);
        }
        self.integrated.insert(id);
        self.history.push(operation);
    }

    // ------------------------------------------------------------------
    // Remote integration
    // ------------------------------------------------------------------

    /// Offer an operation received from another site
    ///
    /// Integrates it if every segment it names is known, parks it
    /// otherwise. Re-delivery of a known operation is a no-op.
    pub fn integrate_remote(&mut self, operation: Operation) -> Result<Integration> {
        let id = operation.id();
        if self.integrated.contains(&id) || self.pending.contains(id) {
            log::trace!("duplicate delivery of {}", id);
            return Ok(Integration::Duplicate);
        }
        if id.is_reserved() {
            return Err(SyncError::ReservedSite(id.site));
        }
        self.validate_shape(&operation)?;

        if !self.is_integrable(&operation) {
            log::debug!("parking {}: anchors not yet known", id);
            self.pending.push(operation);
            if self.pending.len() > self.config.pending_warn_threshold {
                log::warn!(
                    "pending queue holds {} operations; a dependency may be lost",
                    self.pending.len()
                );
            }
            return Ok(Integration::Parked);
        }

        self.integrate(&operation)?;
        self.record(operation);

        if self.config.sweep_on_admit && !self.pending.is_empty() {
            self.sweep_pending();
        }
        Ok(Integration::Applied)
    }

    /// Retry every parked operation; returns how many integrated
    ///
    /// Operations that become resolvable but fail validation are dropped
    /// with a warning rather than blocking the queue.
    pub fn sweep_pending(&mut self) -> usize {
        let mut queue = std::mem::take(&mut self.pending);
        let mut integrated = 0;

        queue.sweep(|operation| {
            if self.integrated.contains(&operation.id()) {
                return true;
            }
            if !self.is_integrable(operation) {
                return false;
            }
            match self.integrate(operation) {
                Ok(()) => {
                    self.record(operation.clone());
                    integrated += 1;
                }
                Err(err) => log::warn!("dropping parked {}: {}", operation.id(), err),
            }
            true
        });

        // Anything parked while sweeping stays queued behind the survivors
        let parked_meanwhile = std::mem::replace(&mut self.pending, queue);
        for operation in parked_meanwhile.iter() {
            self.pending.push(operation.clone());
        }

        if integrated > 0 {
            log::debug!(
                "sweep integrated {} parked operations ({} still pending)",
                integrated,
                self.pending.len()
            );
        }
        integrated
    }

    /// Replay a serialized history (bootstrap entry point)
    ///
    /// Operations already known are skipped, so replaying the same history
    /// twice is harmless. Returns how many operations were newly applied.
    pub fn replay_history<I>(&mut self, operations: I) -> Result<usize>
    where
        I: IntoIterator<Item = Operation>,
    {
        let before = self.integrated.len();
        for operation in operations {
            self.integrate_remote(operation)?;
        }
        self.sweep_pending();
        Ok(self.integrated.len() - before)
    }

    /// Seed an empty document from a flattened text snapshot (bootstrap
    /// entry point)
    ///
    /// Loading the same snapshot again is a no-op; loading into a document
    /// with any other content is a [`SyncError::SnapshotConflict`].
    pub fn load_snapshot(&mut self, text: &str) -> Result<()> {
        if let Some(&head) = self.segment_shortcut.get(&Id::SNAPSHOT) {
            let existing: String = self.chain(head).map(|i| self.tree[i].text()).collect();
            return if existing == text {
                Ok(())
            } else {
                Err(SyncError::SnapshotConflict)
            };
        }
        if !self.tree.is_empty() {
            return Err(SyncError::SnapshotConflict);
        }
        if text.is_empty() {
            return Ok(());
        }

        let (start, end) = (self.tree.start(), self.tree.end());
        let node = self
            .tree
            .insert_between(start, end, Segment::new(Id::SNAPSHOT, text.to_string()))?;
        self.segment_shortcut.insert(Id::SNAPSHOT, node);
        self.integrated.insert(Id::SNAPSHOT);

        log::debug!("seeded document from a {} byte snapshot", text.len());
        Ok(())
    }

    fn is_integrable(&self, operation: &Operation) -> bool {
        operation
            .dependencies()
            .all(|id| self.segment_shortcut.contains_key(&id))
    }

    /// Checks that need no local state
    fn validate_shape(&self, operation: &Operation) -> Result<()> {
        for anchor in [operation.left(), operation.right()] {
            if let Some(offset) = anchor.offset {
                offset.validate()?;
            }
        }
        for node in operation.delete_nodes() {
            if let Some(offset) = node.offset {
                offset.validate()?;
                if offset.is_point() {
                    return Err(SyncError::MalformedRange {
                        range: offset,
                        reason: "deleted fragment is empty",
                    });
                }
            }
            if node.id.is_sentinel() {
                return Err(SyncError::Invariant("sentinels cannot be deleted"));
            }
        }
        if matches!(operation.text(), Some(text) if text.is_empty()) {
            return Err(SyncError::Protocol(format!(
                "operation {} inserts empty text",
                operation.id()
            )));
        }
        Ok(())
    }

    /// Apply an operation whose dependencies are all present
    fn integrate(&mut self, operation: &Operation) -> Result<()> {
        self.probe_anchor(operation.left(), Edge::Before)?;
        self.probe_anchor(operation.right(), Edge::After)?;
        for node in operation.delete_nodes() {
            self.probe_delete_node(node)?;
        }

        for node in operation.delete_nodes() {
            self.tombstone_fragments(node)?;
        }

        if let Some(text) = operation.text() {
            let origin = self.origin_of(operation.left(), operation.right())?;
            let left = self.resolve_anchor(operation.left(), Edge::Before)?;
            let right = self.resolve_anchor(operation.right(), Edge::After)?;
            self.place_insertion(operation.id(), text.to_string(), origin, left, right)?;
        }

        log::trace!("integrated remote {}", operation.id());
        Ok(())
    }

    // ------------------------------------------------------------------
    // (id, offset) resolution through split chains
    // ------------------------------------------------------------------

    fn head_of(&self, id: Id) -> Result<SegmentIndex> {
        self.segment_shortcut
            .get(&id)
            .copied()
            .ok_or(SyncError::SegmentNotFound(id))
    }

    /// Fragments of one insertion in offset order
    fn chain(&self, head: SegmentIndex) -> impl Iterator<Item = SegmentIndex> + '_ {
        std::iter::successors(Some(head), move |&index| self.tree[index].next_split())
    }

    /// Full offset range of an insertion, across all its fragments
    fn insertion_extent(&self, head: SegmentIndex) -> Range {
        let last = self.chain(head).last().unwrap_or(head);
        self.tree[head].offset().merge(&self.tree[last].offset())
    }

    /// Fragment on the requested side of `point`, without splitting
    ///
    /// Also returns whether a split is needed to make `point` a boundary.
    fn find_fragment(&self, head: SegmentIndex, point: Point, edge: Edge) -> Result<(SegmentIndex, bool)> {
        for fragment in self.chain(head) {
            let offset = self.tree[fragment].offset();
            let (start, end) = (offset.start(), offset.end());

            let found = match edge {
                Edge::Before => start < point && point <= end,
                Edge::After => start <= point && point < end,
            };
            if !found {
                continue;
            }

            let needs_split = match edge {
                Edge::Before => point != end,
                Edge::After => point != start,
            };
            if needs_split {
                let local = point
                    .traversal_from(start)
                    .ok_or(SyncError::Invariant("fragment starts after offset"))?;
                if local.byte_index_in(self.tree[fragment].text()).is_none() {
                    return Err(SyncError::MalformedRange {
                        range: Range::point(point),
                        reason: "offset does not fall on a character boundary",
                    });
                }
            }
            return Ok((fragment, needs_split));
        }

        Err(SyncError::MalformedRange {
            range: Range::point(point),
            reason: "offset lies outside the insertion",
        })
    }

    /// Fragment ending at (`Edge::Before`) or starting at (`Edge::After`)
    /// `point`, splitting once if needed
    fn fragment_at(&mut self, head: SegmentIndex, point: Point, edge: Edge) -> Result<SegmentIndex> {
        let (fragment, needs_split) = self.find_fragment(head, point, edge)?;
        if !needs_split {
            return Ok(fragment);
        }

        let suffix = self
            .tree
            .split_segment(fragment, Range::point(point))?
            .ok_or(SyncError::Invariant("interior split produced no suffix"))?;

        Ok(match edge {
            Edge::Before => fragment,
            Edge::After => suffix,
        })
    }

    /// Offset point an anchor refers to: the end of a left anchor's
    /// fragment, the start of a right anchor's
    fn anchor_point(&self, anchor: Anchor, head: SegmentIndex, edge: Edge) -> Option<Point> {
        if anchor.id.is_sentinel() {
            return None;
        }
        let offset = anchor
            .offset
            .unwrap_or_else(|| self.insertion_extent(head));
        Some(match edge {
            Edge::Before => offset.end(),
            Edge::After => offset.start(),
        })
    }

    /// Character an anchor names: the last one of a left anchor, the first
    /// one of a right anchor
    fn mark_of(&self, anchor: Anchor, edge: Edge) -> Result<Mark> {
        let head = self.head_of(anchor.id)?;
        let point = self.anchor_point(anchor, head, edge).unwrap_or(Point::ZERO);
        Ok(Mark::new(anchor.id, point))
    }

    fn origin_of(&self, left: Anchor, right: Anchor) -> Result<Origin> {
        Ok(Origin::new(
            self.mark_of(left, Edge::Before)?,
            self.mark_of(right, Edge::After)?,
        ))
    }

    /// Fragment currently holding the character a left origin names
    fn segment_of_mark(&self, mark: Mark) -> Option<SegmentIndex> {
        if mark.id == Id::START {
            return Some(self.tree.start());
        }
        let head = self.head_of(mark.id).ok()?;
        self.find_fragment(head, mark.point, Edge::Before)
            .ok()
            .map(|(fragment, _)| fragment)
    }

    fn probe_anchor(&self, anchor: Anchor, edge: Edge) -> Result<()> {
        let head = self.head_of(anchor.id)?;
        if let Some(point) = self.anchor_point(anchor, head, edge) {
            self.find_fragment(head, point, edge)?;
        }
        Ok(())
    }

    fn resolve_anchor(&mut self, anchor: Anchor, edge: Edge) -> Result<SegmentIndex> {
        let head = self.head_of(anchor.id)?;
        match self.anchor_point(anchor, head, edge) {
            Some(point) => self.fragment_at(head, point, edge),
            None => Ok(head),
        }
    }

    fn probe_delete_node(&self, node: &DeleteNode) -> Result<()> {
        let head = self.head_of(node.id)?;
        if let Some(offset) = node.offset {
            self.find_fragment(head, offset.start(), Edge::After)?;
            self.find_fragment(head, offset.end(), Edge::Before)?;
        }
        Ok(())
    }

    /// Re-split an insertion at a deleted fragment's offsets and tombstone
    /// every fragment inside them
    fn tombstone_fragments(&mut self, node: &DeleteNode) -> Result<()> {
        let head = self.head_of(node.id)?;
        let (first, last) = match node.offset {
            Some(offset) => {
                let first = self.fragment_at(head, offset.start(), Edge::After)?;
                let last = self.fragment_at(head, offset.end(), Edge::Before)?;
                (first, last)
            }
            None => (head, self.chain(head).last().unwrap_or(head)),
        };

        let mut cursor = Some(first);
        while let Some(fragment) = cursor {
            self.tree.tombstone(fragment);
            if fragment == last {
                return Ok(());
            }
            cursor = self.tree[fragment].next_split();
        }

        Err(SyncError::Invariant("split chain ended before the deleted offset"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(site: SiteId) -> Document {
        Document::with_site(site).unwrap()
    }

    #[test]
    fn test_set_client_id_once() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.insert(1, 1, "x"),
            Err(SyncError::SiteNotAssigned)
        ));

        doc.set_client_id(4).unwrap();
        assert!(matches!(
            doc.set_client_id(5),
            Err(SyncError::SiteAlreadyAssigned(4))
        ));
        assert!(matches!(
            Document::new().set_client_id(0),
            Err(SyncError::ReservedSite(0))
        ));
    }

    #[test]
    fn test_local_insert() {
        let mut doc = doc(1);
        let op = doc.insert(1, 1, "hello").unwrap().unwrap();

        assert_eq!(doc.text(), "hello");
        assert_eq!(op.id(), Id::new(1, 1));
        assert_eq!(op.left(), Anchor::start());
        assert_eq!(op.right(), Anchor::end());
        assert!(doc.has_integrated(op.id()));
    }

    #[test]
    fn test_local_insert_in_middle_splits() {
        let mut doc = doc(1);
        doc.insert(1, 1, "hello").unwrap();
        let op = doc.insert(1, 3, "XY").unwrap().unwrap();

        assert_eq!(doc.text(), "heXYllo");
        assert_eq!(
            op.left(),
            Anchor::new(Id::new(1, 1), Some(Range::new(1, 1, 1, 3)))
        );
        assert_eq!(
            op.right(),
            Anchor::new(Id::new(1, 1), Some(Range::new(1, 3, 1, 6)))
        );
        doc.tree().check_invariants().unwrap();
    }

    #[test]
    fn test_noop_edit() {
        let mut doc = doc(1);
        assert!(doc.insert(1, 1, "").unwrap().is_none());
        assert!(doc.history().is_empty());
    }

    #[test]
    fn test_delete_ell_from_hello() {
        let mut doc = doc(1);
        doc.insert(1, 1, "hello").unwrap();
        let op = doc.delete(Range::new(1, 2, 1, 5)).unwrap().unwrap();

        assert_eq!(doc.text(), "ho");
        assert_eq!(
            op.delete_nodes(),
            &[DeleteNode::new(Id::new(1, 1), Some(Range::new(1, 2, 1, 5)))]
        );

        let tombstones: Vec<SegmentInfo> = doc
            .get_all_segments()
            .into_iter()
            .filter(|segment| !segment.is_visible)
            .collect();
        assert_eq!(tombstones.len(), 1);
        assert_eq!(tombstones[0].text, "ell");
        assert_eq!(tombstones[0].range, Range::new(1, 2, 1, 2));
    }

    #[test]
    fn test_delete_across_lines() {
        let mut doc = doc(1);
        doc.insert(1, 1, "ab\ncd\nef").unwrap();
        doc.delete(Range::new(1, 2, 3, 2)).unwrap();

        assert_eq!(doc.text(), "af");
    }

    #[test]
    fn test_local_splice() {
        let mut doc = doc(1);
        doc.insert(1, 1, "hello").unwrap();
        let op = doc.splice(Range::new(1, 2, 1, 5), "ipp").unwrap().unwrap();

        assert_eq!(doc.text(), "hippo");
        assert!(matches!(op, Operation::Splice(_)));
        assert_eq!(op.delete_nodes().len(), 1);
        assert_eq!(
            op.right(),
            Anchor::new(Id::new(1, 1), Some(Range::new(1, 2, 1, 5)))
        );
    }

    #[test]
    fn test_splice_concurrent_with_insert_at_same_spot() {
        let mut alice = doc(1);
        let mut bob = doc(2);
        bob.integrate_remote(alice.insert(1, 1, "abc").unwrap().unwrap())
            .unwrap();

        let z = bob.insert(1, 2, "z").unwrap().unwrap();
        let q = alice.splice(Range::new(1, 2, 1, 3), "q").unwrap().unwrap();

        alice.integrate_remote(z).unwrap();
        bob.integrate_remote(q).unwrap();

        assert_eq!(alice.text(), "aqzc");
        assert_eq!(bob.text(), "aqzc");
    }

    #[test]
    fn test_malformed_local_range_applies_nothing() {
        let mut doc = doc(1);
        doc.insert(1, 1, "hello").unwrap();
        let segments = doc.get_all_segments();

        assert!(doc.delete(Range::new(1, 2, 1, 9)).is_err());
        assert!(doc.insert(3, 1, "x").is_err());
        assert_eq!(doc.get_all_segments(), segments);
        assert_eq!(doc.history().len(), 1);
    }

    #[test]
    fn test_remote_insert_and_duplicate() {
        let mut alice = doc(1);
        let mut bob = doc(2);

        let op = alice.insert(1, 1, "hello").unwrap().unwrap();
        assert_eq!(bob.integrate_remote(op.clone()).unwrap(), Integration::Applied);
        assert_eq!(bob.integrate_remote(op).unwrap(), Integration::Duplicate);
        assert_eq!(bob.text(), "hello");
        assert_eq!(bob.history().len(), 1);
    }

    #[test]
    fn test_remote_split_anchor() {
        let mut alice = doc(1);
        let mut bob = doc(2);

        let base = alice.insert(1, 1, "hello").unwrap().unwrap();
        bob.integrate_remote(base).unwrap();

        let op = alice.insert(1, 4, "_").unwrap().unwrap();
        bob.integrate_remote(op).unwrap();

        assert_eq!(alice.text(), "hel_lo");
        assert_eq!(bob.text(), "hel_lo");
        bob.tree().check_invariants().unwrap();
    }

    #[test]
    fn test_remote_deletion_resplits_by_offset() {
        let mut alice = doc(1);
        let mut bob = doc(2);

        let base = alice.insert(1, 1, "abcdef").unwrap().unwrap();
        bob.integrate_remote(base).unwrap();

        // bob splits the insertion differently before alice's delete arrives
        let mark = bob.insert(1, 3, "|").unwrap().unwrap();
        let delete = alice.delete(Range::new(1, 2, 1, 6)).unwrap().unwrap();

        bob.integrate_remote(delete).unwrap();
        alice.integrate_remote(mark).unwrap();

        assert_eq!(alice.text(), "a|f");
        assert_eq!(bob.text(), "a|f");
    }

    #[test]
    fn test_remote_with_unknown_anchor_is_parked() {
        let mut alice = doc(1);
        let mut bob = Document::with_config(SyncConfig {
            sweep_on_admit: false,
            ..SyncConfig::default()
        });
        bob.set_client_id(2).unwrap();

        let first = alice.insert(1, 1, "ab").unwrap().unwrap();
        let second = alice.insert(1, 3, "cd").unwrap().unwrap();

        assert_eq!(bob.integrate_remote(second.clone()).unwrap(), Integration::Parked);
        assert_eq!(bob.integrate_remote(second).unwrap(), Integration::Duplicate);
        assert_eq!(bob.pending_len(), 1);
        assert_eq!(bob.text(), "");

        assert_eq!(bob.integrate_remote(first).unwrap(), Integration::Applied);
        assert_eq!(bob.text(), "ab");
        assert_eq!(bob.sweep_pending(), 1);
        assert_eq!(bob.text(), "abcd");
        assert_eq!(bob.pending_len(), 0);
    }

    #[test]
    fn test_sweep_on_admit() {
        let mut alice = doc(1);
        let mut bob = doc(2);

        let first = alice.insert(1, 1, "ab").unwrap().unwrap();
        let second = alice.insert(1, 3, "cd").unwrap().unwrap();
        let third = alice.insert(1, 5, "ef").unwrap().unwrap();

        bob.integrate_remote(third).unwrap();
        bob.integrate_remote(second).unwrap();
        assert_eq!(bob.pending_len(), 2);

        bob.integrate_remote(first).unwrap();
        assert_eq!(bob.pending_len(), 0);
        assert_eq!(bob.text(), "abcdef");
    }

    #[test]
    fn test_remote_malformed_offset_is_rejected() {
        let mut alice = doc(1);
        let mut bob = doc(2);
        bob.integrate_remote(alice.insert(1, 1, "abc").unwrap().unwrap())
            .unwrap();

        let bogus: Operation = Insertion {
            id: Id::new(1, 9),
            left: Anchor::new(Id::new(1, 1), Some(Range::new(1, 1, 1, 8))),
            right: Anchor::end(),
            text: "x".to_string(),
        }
        .into();

        let segments = bob.get_all_segments();
        assert!(matches!(
            bob.integrate_remote(bogus),
            Err(SyncError::MalformedRange { .. })
        ));
        assert_eq!(bob.get_all_segments(), segments);
    }

    #[test]
    fn test_reserved_site_operations_are_rejected() {
        let mut doc = doc(1);
        let op: Operation = Insertion {
            id: Id::new(0, 5),
            left: Anchor::start(),
            right: Anchor::end(),
            text: "x".to_string(),
        }
        .into();

        assert!(matches!(doc.integrate_remote(op), Err(SyncError::ReservedSite(0))));
    }

    #[test]
    fn test_load_snapshot_is_idempotent() {
        let mut doc = doc(1);
        doc.load_snapshot("base\ntext").unwrap();
        doc.load_snapshot("base\ntext").unwrap();

        assert_eq!(doc.text(), "base\ntext");
        assert!(matches!(
            doc.load_snapshot("other"),
            Err(SyncError::SnapshotConflict)
        ));

        doc.insert(2, 1, "more ").unwrap();
        assert_eq!(doc.text(), "base\nmore text");
        // still the same snapshot underneath, even though it is now split
        doc.load_snapshot("base\ntext").unwrap();
    }

    #[test]
    fn test_snapshot_into_edited_document_conflicts() {
        let mut doc = doc(1);
        doc.insert(1, 1, "x").unwrap();
        assert!(matches!(
            doc.load_snapshot("x"),
            Err(SyncError::SnapshotConflict)
        ));
    }

    #[test]
    fn test_replay_history_twice() {
        let mut alice = doc(1);
        alice.insert(1, 1, "hello").unwrap();
        alice.insert(1, 6, " world").unwrap();
        alice.delete(Range::new(1, 1, 1, 2)).unwrap();

        let mut carol = doc(3);
        let applied = carol.replay_history(alice.history().to_vec()).unwrap();
        assert_eq!(applied, 3);
        assert_eq!(carol.replay_history(alice.history().to_vec()).unwrap(), 0);
        assert_eq!(carol.text(), "ello world");
    }

    #[test]
    fn test_replayed_own_history_advances_counter() {
        let mut before = doc(1);
        before.insert(1, 1, "ab").unwrap();
        before.insert(1, 3, "cd").unwrap();

        let mut rejoined = Document::new();
        rejoined.replay_history(before.history().to_vec()).unwrap();
        rejoined.set_client_id(1).unwrap();

        let op = rejoined.insert(1, 5, "e").unwrap().unwrap();
        assert_eq!(op.id(), Id::new(1, 3));
    }

    #[test]
    fn test_segment_range() {
        let mut doc = doc(1);
        doc.insert(1, 1, "hello").unwrap();
        doc.insert(1, 3, "\n").unwrap();

        assert_eq!(doc.segment_range(Id::new(1, 1)).unwrap(), Range::new(1, 1, 2, 4));
        assert_eq!(doc.segment_range(Id::new(1, 2)).unwrap(), Range::new(1, 3, 2, 1));
        assert!(matches!(
            doc.segment_range(Id::new(7, 7)),
            Err(SyncError::SegmentNotFound(_))
        ));
    }
}
