//! Operation: The unit of replication
//!
//! Operations never carry raw text offsets. They name the segments on
//! either side of the edit (their anchors), which stay valid no matter what
//! other sites have done to the document in the meantime. An operation can
//! be integrated once every segment it names exists locally.

use super::id::Id;
use super::range::Range;
use serde::{Deserialize, Serialize};

/// Wire tag of an insertion
pub const INSERTION_TYPE: u8 = 1;
/// Wire tag of a deletion
pub const DELETION_TYPE: u8 = 2;
/// Wire tag of an undo (rejected)
pub const UNDO_TYPE: u8 = 3;
/// Wire tag of a redo (rejected)
pub const REDO_TYPE: u8 = 4;
/// Wire tag of a splice
pub const SPLICE_TYPE: u8 = 5;

/// A neighbouring segment an operation is anchored to
///
/// `offset` is the fragment's position inside its original insertion.
/// A left anchor refers to the end of that fragment, a right anchor to its
/// start. Sentinels carry no offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub id: Id,
    pub offset: Option<Range>,
}

impl Anchor {
    pub fn new(id: Id, offset: Option<Range>) -> Self {
        Self { id, offset }
    }

    pub fn start() -> Self {
        Self::new(Id::START, None)
    }

    pub fn end() -> Self {
        Self::new(Id::END, None)
    }
}

/// One fragment removed by a deletion
///
/// `offset: None` removes the whole insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeleteNode {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Range>,
}

impl DeleteNode {
    pub fn new(id: Id, offset: Option<Range>) -> Self {
        Self { id, offset }
    }
}

/// Text inserted between two anchors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub id: Id,
    pub left: Anchor,
    pub right: Anchor,
    pub text: String,
}

/// Fragments tombstoned between two anchors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub id: Id,
    pub left: Anchor,
    pub right: Anchor,
    pub delete_nodes: Vec<DeleteNode>,
}

/// A deletion followed by an insertion at the same anchors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub id: Id,
    pub left: Anchor,
    pub right: Anchor,
    pub delete_nodes: Vec<DeleteNode>,
    pub text: String,
}

/// Closed set of replicated operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Insertion(Insertion),
    Deletion(Deletion),
    Splice(Splice),
}

impl Operation {
    pub fn id(&self) -> Id {
        match self {
            Operation::Insertion(op) => op.id,
            Operation::Deletion(op) => op.id,
            Operation::Splice(op) => op.id,
        }
    }

    pub fn left(&self) -> Anchor {
        match self {
            Operation::Insertion(op) => op.left,
            Operation::Deletion(op) => op.left,
            Operation::Splice(op) => op.left,
        }
    }

    pub fn right(&self) -> Anchor {
        match self {
            Operation::Insertion(op) => op.right,
            Operation::Deletion(op) => op.right,
            Operation::Splice(op) => op.right,
        }
    }

    /// Numeric wire tag
    pub fn type_code(&self) -> u8 {
        match self {
            Operation::Insertion(_) => INSERTION_TYPE,
            Operation::Deletion(_) => DELETION_TYPE,
            Operation::Splice(_) => SPLICE_TYPE,
        }
    }

    /// Inserted text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Operation::Insertion(op) => Some(&op.text),
            Operation::Deletion(_) => None,
            Operation::Splice(op) => Some(&op.text),
        }
    }

    /// Fragments removed by this operation
    pub fn delete_nodes(&self) -> &[DeleteNode] {
        match self {
            Operation::Insertion(_) => &[],
            Operation::Deletion(op) => &op.delete_nodes,
            Operation::Splice(op) => &op.delete_nodes,
        }
    }

    /// Every segment identifier that must exist before integration
    pub fn dependencies(&self) -> impl Iterator<Item = Id> + '_ {
        [self.left().id, self.right().id]
            .into_iter()
            .chain(self.delete_nodes().iter().map(|node| node.id))
    }
}

impl From<Insertion> for Operation {
    fn from(op: Insertion) -> Self {
        Operation::Insertion(op)
    }
}

impl From<Deletion> for Operation {
    fn from(op: Deletion) -> Self {
        Operation::Deletion(op)
    }
}

impl From<Splice> for Operation {
    fn from(op: Splice) -> Self {
        Operation::Splice(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let op: Operation = Splice {
            id: Id::new(2, 4),
            left: Anchor::new(Id::new(1, 1), Some(Range::new(1, 1, 1, 2))),
            right: Anchor::end(),
            delete_nodes: vec![DeleteNode::new(Id::new(1, 1), Some(Range::new(1, 2, 1, 5)))],
            text: "xy".to_string(),
        }
        .into();

        assert_eq!(op.id(), Id::new(2, 4));
        assert_eq!(op.type_code(), SPLICE_TYPE);
        assert_eq!(op.text(), Some("xy"));
        assert_eq!(op.delete_nodes().len(), 1);
        assert_eq!(op.right(), Anchor::end());
    }

    #[test]
    fn test_dependencies() {
        let op: Operation = Deletion {
            id: Id::new(2, 4),
            left: Anchor::start(),
            right: Anchor::new(Id::new(3, 1), Some(Range::new(1, 1, 1, 3))),
            delete_nodes: vec![
                DeleteNode::new(Id::new(1, 1), None),
                DeleteNode::new(Id::new(1, 2), None),
            ],
        }
        .into();

        let deps: Vec<Id> = op.dependencies().collect();
        assert_eq!(
            deps,
            vec![Id::START, Id::new(3, 1), Id::new(1, 1), Id::new(1, 2)]
        );
    }

    #[test]
    fn test_insertion_has_no_delete_nodes() {
        let op: Operation = Insertion {
            id: Id::new(1, 1),
            left: Anchor::start(),
            right: Anchor::end(),
            text: "hi".to_string(),
        }
        .into();

        assert!(op.delete_nodes().is_empty());
        assert_eq!(op.type_code(), INSERTION_TYPE);
    }
}
