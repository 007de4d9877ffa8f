//! AND-merging of posting sets, and the constraint filter
//!
//! Intersection runs in two phases to keep decryption off the hot path:
//!
//! - Phase A compares the 32-bit hashes of the encrypted id prefixes.
//!   Everything that cannot be in every term's set is dropped without
//!   touching the cipher. Hash collisions may let an odd stranger
//!   through.
//! - Phase B, after decryption and the attribute / time-window filter,
//!   intersects on plaintext ids and eliminates those strangers.

use std::collections::HashSet;

use maildex_core::{AttributeId, EncryptedEntry, EntityId, Entry, SearchRestriction};

// ============================================================================
// Constraint filter (attribute whitelist + id range)
// ============================================================================

/// Per-entry acceptance test derived from a restriction.
///
/// The id range implements the time window: `min_id` is the lower-bound
/// id of the window's older edge, `max_id` the lower-bound id of one
/// millisecond past the newer edge (which makes the newer edge
/// inclusive).
#[derive(Debug, Clone)]
pub struct EntryFilter {
    min_id: EntityId,
    max_id: Option<EntityId>,
    attribute_ids: Option<Vec<AttributeId>>,
}

impl EntryFilter {
    /// Build the filter for a restriction, given the already resolved
    /// older edge of the time window.
    pub fn new(restriction: &SearchRestriction, end_timestamp: i64) -> Self {
        EntryFilter {
            min_id: EntityId::from_timestamp(end_timestamp),
            max_id: restriction
                .start
                .map(|start| EntityId::from_timestamp(start + 1)),
            attribute_ids: restriction.attribute_ids.clone(),
        }
    }

    /// Check one decrypted entry against the whitelist and the window.
    pub fn accepts(&self, entry: &Entry) -> bool {
        self.attribute_allowed(entry.attribute) && self.in_id_range(entry.id)
    }

    /// Window check alone. This verdict is per id: once an id falls
    /// outside the window, every entry carrying it is dead.
    pub fn in_id_range(&self, id: EntityId) -> bool {
        if id < self.min_id {
            return false;
        }
        if let Some(max) = self.max_id {
            if id >= max {
                return false;
            }
        }
        true
    }

    /// Whitelist check alone. This verdict is per entry: the same id may
    /// still match through another attribute.
    pub fn attribute_allowed(&self, attribute: AttributeId) -> bool {
        match &self.attribute_ids {
            Some(ids) => ids.contains(&attribute),
            None => true,
        }
    }
}

// ============================================================================
// Phase A: id-hash intersection
// ============================================================================

/// Hashes present in every group.
pub fn hash_intersection(groups: &[Vec<&EncryptedEntry>]) -> HashSet<u32> {
    let mut iter = groups.iter();
    let mut common: HashSet<u32> = match iter.next() {
        Some(first) => first.iter().map(|e| e.id_hash).collect(),
        None => return HashSet::new(),
    };
    for group in iter {
        let hashes: HashSet<u32> = group.iter().map(|e| e.id_hash).collect();
        common.retain(|h| hashes.contains(h));
        if common.is_empty() {
            break;
        }
    }
    common
}

// ============================================================================
// Phase B: plaintext-id intersection
// ============================================================================

/// Ids present in every group of decrypted entries.
pub fn id_intersection(groups: &[Vec<Entry>]) -> HashSet<EntityId> {
    let mut iter = groups.iter();
    let mut common: HashSet<EntityId> = match iter.next() {
        Some(first) => first.iter().map(|e| e.id).collect(),
        None => return HashSet::new(),
    };
    for group in iter {
        let ids: HashSet<EntityId> = group.iter().map(|e| e.id).collect();
        common.retain(|id| ids.contains(id));
        if common.is_empty() {
            break;
        }
    }
    common
}
