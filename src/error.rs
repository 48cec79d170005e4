//! Error types for the sequence engine
//!
//! Every fallible operation in the crate returns [`Result`]. Validation runs
//! before any tree mutation, so an `Err` never leaves a document half-applied.
//!
//! An operation whose anchors have not arrived yet is NOT an error: it is
//! parked in the pending queue (see [`crate::document::Integration`]).

use crate::crdt::{Id, Range};
use thiserror::Error;

/// Errors produced by the sequence engine
#[derive(Error, Debug)]
pub enum SyncError {
    /// A range was inverted, outside the document, or not a point where a
    /// point was required
    #[error("Malformed range {range}: {reason}")]
    MalformedRange { range: Range, reason: &'static str },

    /// No segment is registered under this identifier
    #[error("Segment not found: {0}")]
    SegmentNotFound(Id),

    /// Operation kinds the protocol knows about but does not implement
    /// (undo = 3, redo = 4)
    #[error("Unsupported operation type {0}")]
    UnsupportedOperation(u8),

    /// A local edit was attempted before `set_client_id`
    #[error("Site id has not been assigned yet")]
    SiteNotAssigned,

    /// `set_client_id` was called a second time
    #[error("Site id already assigned ({0})")]
    SiteAlreadyAssigned(u32),

    /// Site 0 belongs to the sentinels and the bootstrap snapshot
    #[error("Site {0} is reserved")]
    ReservedSite(u32),

    /// A snapshot was offered to a document that already holds other content
    #[error("Snapshot conflicts with existing document content")]
    SnapshotConflict,

    /// Wire message could not be decoded into a valid operation
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON encoding/decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A structural invariant of the tree was found broken
    #[error("Tree invariant violated: {0}")]
    Invariant(&'static str),
}

/// Result type for sequence operations
pub type Result<T> = std::result::Result<T, SyncError>;
