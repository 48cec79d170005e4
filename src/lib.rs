//! SyncKit Sequence - Replicated text engine for collaborative editing
//!
//! Every site holds a full replica of a shared text document. Local edits
//! apply immediately and produce operations to broadcast; operations from
//! other sites are integrated in any order and all replicas converge to the
//! same text once they have seen the same operations. It implements:
//! - A sequence CRDT whose segments are ordered in an augmented splay tree
//! - Split-fragment tracking so anchors stay valid under concurrent edits
//! - Causal gating: operations wait in a pending queue until their anchors exist
//! - A JSON wire protocol and an optional tokio-based shared document
//!
//! # Examples
//!
//! ```rust
//! use synckit_sequence::{Document, EditEvent, Range};
//!
//! let mut alice = Document::with_site(1).unwrap();
//! let mut bob = Document::with_site(2).unwrap();
//!
//! let op = alice
//!     .apply_local_edit(&EditEvent::insert(Range::ORIGIN, "hello"))
//!     .unwrap()
//!     .unwrap();
//!
//! bob.integrate_remote(op).unwrap();
//! assert_eq!(bob.text(), "hello");
//! ```

pub mod config;
pub mod crdt;
pub mod document;
pub mod error;
pub mod protocol;
pub mod sync;

// Re-exports for convenience
pub use config::SyncConfig;
pub use crdt::{Anchor, DeleteNode, Id, Operation, Point, Range, SegmentInfo, SiteId};
pub use document::{Document, EditEvent, EditKind, Integration};
pub use error::{Result, SyncError};
pub use protocol::{WireMessage, WireOperation};

#[cfg(feature = "runtime")]
pub use sync::{PendingSweeper, SharedDocument};
