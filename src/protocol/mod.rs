//! Wire protocol
//!
//! Every message between sites is a JSON object carrying a one-character
//! `protocol` tag and a `payload`:
//!
//! | tag | payload                                         |
//! |-----|-------------------------------------------------|
//! | `o` | one [`WireOperation`]                           |
//! | `s` | site assignment for a joining session           |
//! | `h` | the full history, as wire operations, in order  |
//! | `t` | a flattened text snapshot                       |
//!
//! Transport and session management live outside this crate; the message
//! types only fix the format.

pub mod serialize;

pub use serialize::{decode_operation, encode_operation, WireOperation};

use crate::crdt::{Operation, SiteId};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tagged message exchanged between sites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", content = "payload")]
pub enum WireMessage {
    #[serde(rename = "o")]
    Operation(WireOperation),

    /// Hands a joining session its site id
    #[serde(rename = "s")]
    SiteAssignment { session: Uuid, site: SiteId },

    #[serde(rename = "h")]
    History(Vec<WireOperation>),

    #[serde(rename = "t")]
    Snapshot(String),
}

impl WireMessage {
    pub fn operation(op: &Operation) -> Self {
        WireMessage::Operation(op.into())
    }

    pub fn history(ops: &[Operation]) -> Self {
        WireMessage::History(ops.iter().map(WireOperation::from).collect())
    }

    /// Assignment for a new session, with a freshly generated session id
    pub fn assign_site(site: SiteId) -> Self {
        WireMessage::SiteAssignment {
            session: Uuid::new_v4(),
            site,
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validated operations carried by this message, in order
    ///
    /// Empty for site assignments and snapshots.
    pub fn into_operations(self) -> Result<Vec<Operation>> {
        match self {
            WireMessage::Operation(wire) => Ok(vec![Operation::try_from(wire)?]),
            WireMessage::History(wires) => wires.into_iter().map(Operation::try_from).collect(),
            WireMessage::SiteAssignment { .. } | WireMessage::Snapshot(_) => Ok(Vec::new()),
        }
    }
}
