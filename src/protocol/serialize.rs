// Serialization layer - Convert operations to/from wire records
//!
//! Operations travel as flat JSON records. Decoding is explicit: a record is
//! checked field by field against its `type` before an [`Operation`] is
//! built, so nothing half-formed reaches the document.

use crate::crdt::operation::{
    DELETION_TYPE, INSERTION_TYPE, REDO_TYPE, SPLICE_TYPE, UNDO_TYPE,
};
use crate::crdt::{Anchor, DeleteNode, Deletion, Id, Insertion, Operation, Range, Splice};
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// Flat wire form of an [`Operation`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOperation {
    #[serde(rename = "type")]
    pub kind: u8,

    pub id: Id,

    #[serde(with = "crate::crdt::id::key")]
    pub left_dependency: Id,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_offset: Option<Range>,

    #[serde(with = "crate::crdt::id::key")]
    pub right_dependency: Id,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_offset: Option<Range>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_nodes: Option<Vec<DeleteNode>>,
}

impl WireOperation {
    /// Parse a single wire record from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn missing(&self, field: &str) -> SyncError {
        SyncError::Protocol(format!(
            "Operation {} of type {} is missing {}",
            self.id, self.kind, field
        ))
    }
}

impl From<&Operation> for WireOperation {
    fn from(op: &Operation) -> Self {
        let (left, right) = (op.left(), op.right());
        let delete_nodes = match op {
            Operation::Insertion(_) => None,
            Operation::Deletion(_) | Operation::Splice(_) => Some(op.delete_nodes().to_vec()),
        };

        Self {
            kind: op.type_code(),
            id: op.id(),
            left_dependency: left.id,
            left_offset: left.offset,
            right_dependency: right.id,
            right_offset: right.offset,
            text: op.text().map(str::to_string),
            delete_nodes,
        }
    }
}

impl TryFrom<WireOperation> for Operation {
    type Error = SyncError;

    fn try_from(wire: WireOperation) -> Result<Self> {
        for offset in [wire.left_offset, wire.right_offset].into_iter().flatten() {
            offset.validate()?;
        }
        let deleted = wire.delete_nodes.iter().flatten();
        for offset in deleted.filter_map(|node| node.offset) {
            offset.validate()?;
            if offset.is_point() {
                return Err(SyncError::MalformedRange {
                    range: offset,
                    reason: "deleted fragment is empty",
                });
            }
        }

        let left = Anchor::new(wire.left_dependency, wire.left_offset);
        let right = Anchor::new(wire.right_dependency, wire.right_offset);
        let id = wire.id;

        match wire.kind {
            INSERTION_TYPE => {
                let text = wire.text.clone().ok_or_else(|| wire.missing("text"))?;
                Ok(Insertion { id, left, right, text }.into())
            }
            DELETION_TYPE => {
                let delete_nodes = wire
                    .delete_nodes
                    .clone()
                    .ok_or_else(|| wire.missing("deleteNodes"))?;
                Ok(Deletion {
                    id,
                    left,
                    right,
                    delete_nodes,
                }
                .into())
            }
            SPLICE_TYPE => {
                let text = wire.text.clone().ok_or_else(|| wire.missing("text"))?;
                let delete_nodes = wire
                    .delete_nodes
                    .clone()
                    .ok_or_else(|| wire.missing("deleteNodes"))?;
                Ok(Splice {
                    id,
                    left,
                    right,
                    delete_nodes,
                    text,
                }
                .into())
            }
            UNDO_TYPE | REDO_TYPE => Err(SyncError::UnsupportedOperation(wire.kind)),
            other => Err(SyncError::Protocol(format!(
                "Unknown operation type {} for {}",
                other, id
            ))),
        }
    }
}

/// Decode one operation straight from JSON
pub fn decode_operation(json: &str) -> Result<Operation> {
    Operation::try_from(WireOperation::from_json(json)?)
}

/// Encode one operation to JSON
pub fn encode_operation(op: &Operation) -> Result<String> {
    WireOperation::from(op).to_json()
}
