//! Sequence CRDT building blocks
//!
//! This module contains the data structures the [`crate::Document`] is
//! assembled from, leaf-first:
//!
//! - **Id:** `(site, counter)` identifiers with a total order
//! - **Range:** line/column geometry ([`Range`], [`Point`])
//! - **Segment:** a fragment of inserted text, splittable, tombstonable
//! - **SequenceTree:** augmented splay tree ordering segments by position
//! - **Operation:** anchored Insertion / Deletion / Splice
//!
//! # References
//!
//! - "Replicated abstract data types: Building blocks for collaborative
//!   applications" (RGA) by Roh et al.
//! - "Data consistency for P2P collaborative editing" (WOOT) by Oster et al.
//! - "Self-adjusting binary search trees" by Sleator and Tarjan

pub mod id;
pub mod operation;
pub mod range;
pub mod segment;
pub mod tree;

pub use id::{Id, SiteId};
pub use operation::{Anchor, DeleteNode, Deletion, Insertion, Operation, Splice};
pub use range::{Point, Range};
pub use segment::{Mark, Origin, Segment, SegmentIndex, SegmentInfo};
pub use tree::SequenceTree;
