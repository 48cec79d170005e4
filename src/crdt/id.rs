//! Id: Unique identifier for operations and the segments they create
//!
//! Each identifier is composed of:
//! - Site: Identifies the replica that generated the operation
//! - Counter: Per-site sequence number, assigned only by that site

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Replica identifier handed out by the session bootstrap
pub type SiteId = u32;

/// Site reserved for sentinels and the bootstrap snapshot segment
pub const RESERVED_SITE: SiteId = 0;

/// Unique identifier for an operation
///
/// Gives a total order across every operation ever generated: identifiers
/// are compared by site first, then by counter. A site never reuses a
/// counter value, so `(site, counter)` pairs are globally unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id {
    /// Site that generated this operation
    pub site: SiteId,

    /// Sequence counter at creation time
    pub counter: u64,
}

impl Id {
    /// Document start sentinel
    pub const START: Id = Id::new(RESERVED_SITE, 0);

    /// Document end (EOF) sentinel
    pub const END: Id = Id::new(RESERVED_SITE, 1);

    /// Segment seeded from a flattened text snapshot
    pub const SNAPSHOT: Id = Id::new(RESERVED_SITE, 2);

    /// Create a new identifier
    pub const fn new(site: SiteId, counter: u64) -> Self {
        Self { site, counter }
    }

    /// Check if this identifier belongs to the reserved site
    pub fn is_reserved(&self) -> bool {
        self.site == RESERVED_SITE
    }

    /// Check if this identifier names one of the two sentinels
    pub fn is_sentinel(&self) -> bool {
        *self == Id::START || *self == Id::END
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.site.cmp(&other.site) {
            Ordering::Equal => self.counter.cmp(&other.counter),
            other => other,
        }
    }
}

/// Compact key form `c<site>v<counter>`
impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}v{}", self.site, self.counter)
    }
}

impl FromStr for Id {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || SyncError::Protocol(format!("Malformed identifier key: {s:?}"));

        let rest = s.strip_prefix('c').ok_or_else(malformed)?;
        let (site, counter) = rest.split_once('v').ok_or_else(malformed)?;
        let site = site.parse::<SiteId>().map_err(|_| malformed())?;
        let counter = counter.parse::<u64>().map_err(|_| malformed())?;

        Ok(Id::new(site, counter))
    }
}

/// Serde adapter writing an [`Id`] in its compact key form
///
/// Used for the `leftDependency`/`rightDependency` fields of wire records.
pub mod key {
    use super::Id;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Id, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Id, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering() {
        let id1 = Id::new(1, 10);
        let id2 = Id::new(1, 20);
        let id3 = Id::new(2, 5);

        // Same site: ordered by counter
        assert!(id1 < id2);

        // Different sites: site takes precedence
        assert!(id2 < id3);
        assert!(id1 < id3);
    }

    #[test]
    fn test_id_equality() {
        assert_eq!(Id::new(1, 10), Id::new(1, 10));
        assert_ne!(Id::new(1, 10), Id::new(2, 10));
    }

    #[test]
    fn test_key_round_trip() {
        let id = Id::new(42, 7);
        assert_eq!(id.to_string(), "c42v7");
        assert_eq!("c42v7".parse::<Id>().unwrap(), id);
    }

    #[test]
    fn test_malformed_keys() {
        for raw in ["", "42v7", "c42", "cxv1", "c1v", "c1v-3"] {
            assert!(raw.parse::<Id>().is_err(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn test_sentinels() {
        assert!(Id::START.is_sentinel());
        assert!(Id::END.is_sentinel());
        assert!(!Id::SNAPSHOT.is_sentinel());
        assert!(Id::SNAPSHOT.is_reserved());
        assert!(!Id::new(1, 0).is_reserved());
    }

    #[test]
    fn test_serialization() {
        let id = Id::new(3, 9);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"site":3,"counter":9}"#);

        let deserialized: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
