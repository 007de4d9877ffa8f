//! Identifier types and the timestamp ↔ id mapping
//!
//! Entity identifiers encode their creation time: the upper 44 bits hold
//! a millisecond epoch timestamp, the lower 20 bits a per-millisecond
//! counter assigned by the server. Comparing ids numerically (or their
//! big-endian encodings bytewise) therefore orders entities by age,
//! which is what "newest first" ranking and the time-window filter rely
//! on.

use serde::{Deserialize, Serialize};

/// Number of low bits reserved for the per-millisecond counter.
const COUNTER_BITS: u32 = 20;

/// Indexer horizon sentinel: everything back to the epoch is indexed.
pub const FULL_INDEXED_TIMESTAMP: i64 = 0;

/// Indexer horizon sentinel: nothing has been indexed yet.
pub const NOTHING_INDEXED_TIMESTAMP: i64 = i64::MAX;

/// Milliseconds per UTC day.
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

// ============================================================================
// EntityId
// ============================================================================

/// Identifier of a searchable entity (mail, contact, event).
///
/// Larger means newer. `from_timestamp` gives the smallest id any entity
/// created at or after that instant can have, which makes it the
/// lower-bound `timestamp → id` mapping used by the time-window filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Build an id from a creation timestamp and a per-ms counter.
    pub fn from_parts(timestamp_ms: i64, counter: u32) -> Self {
        debug_assert!(timestamp_ms >= 0);
        EntityId(((timestamp_ms as u64) << COUNTER_BITS) | (counter as u64 & 0xF_FFFF))
    }

    /// Lower-bound id for a timestamp: the smallest id with this creation
    /// millisecond.
    pub fn from_timestamp(timestamp_ms: i64) -> Self {
        EntityId((timestamp_ms.max(0) as u64) << COUNTER_BITS)
    }

    /// Creation timestamp encoded in this id, in epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        (self.0 >> COUNTER_BITS) as i64
    }

    /// Big-endian encoding; bytewise order equals numeric order.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Decode from the big-endian encoding.
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        EntityId(u64::from_be_bytes(bytes))
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ============================================================================
// ListId / AttributeId
// ============================================================================

/// Identifier of the container (mail list, contact list) holding an entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ListId(pub u64);

impl std::fmt::Display for ListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Tag of the attribute (subject, body, sender, …) a posting was found in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AttributeId(pub u16);

// ============================================================================
// TypeRef
// ============================================================================

/// Reference to an entity type: application id plus type id.
///
/// The same pair is stamped on every chunk descriptor, so a metadata row
/// shared between types can be filtered down to one kind before any
/// chunk is fetched.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TypeRef {
    /// Application the type belongs to
    pub app: u8,
    /// Type id within the application
    pub type_id: u8,
}

impl TypeRef {
    /// Mail entities (the only kind covered by backward index extension).
    pub const MAIL: TypeRef = TypeRef { app: 1, type_id: 1 };
    /// Contact entities.
    pub const CONTACT: TypeRef = TypeRef { app: 1, type_id: 2 };
    /// Calendar event entities.
    pub const CALENDAR_EVENT: TypeRef = TypeRef { app: 2, type_id: 1 };
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.app, self.type_id)
    }
}

// ============================================================================
// Timestamp helpers
// ============================================================================

/// Floor a millisecond timestamp to the start of its UTC day.
pub fn start_of_day(timestamp_ms: i64) -> i64 {
    timestamp_ms - timestamp_ms.rem_euclid(DAY_MS)
}
