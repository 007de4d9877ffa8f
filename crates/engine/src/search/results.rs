//! Result assembly: from matched entries to ordered `(list, id)` pairs
//!
//! Takes the fully matched entries of a page, resolves each id to its
//! container through the element-data store, applies the container
//! restriction, deduplicates against everything already returned and
//! appends newest first. Entries the page budget does not consume are
//! parked on the result and promoted by the next page without touching
//! the index again.

use std::collections::HashSet;

use maildex_core::{EntityId, Entry, Result, SearchHit, SearchResult};
use maildex_crypto::SearchKeys;
use maildex_store::{ObjectStore, ReadTransaction, StoreKey};

/// Resolve, filter and append candidate entries to the result.
///
/// `candidates` may arrive in any order and may contain duplicate ids;
/// `budget` caps how many new hits this call may add. Leftover candidates
/// replace `result.more_results`. Returns the number of hits added.
pub fn assemble(
    txn: &ReadTransaction,
    keys: &SearchKeys,
    mut candidates: Vec<Entry>,
    result: &mut SearchResult,
    budget: Option<usize>,
) -> Result<usize> {
    candidates.sort_by(|a, b| b.id.cmp(&a.id));
    candidates.dedup_by_key(|e| e.id);

    let mut seen: HashSet<EntityId> = result.results.iter().map(|hit| hit.id).collect();
    let mut added = 0usize;
    let mut leftover: Vec<Entry> = Vec::new();

    for entry in candidates {
        if budget.is_some_and(|b| added >= b) {
            leftover.push(entry);
            continue;
        }
        if !seen.insert(entry.id) {
            continue;
        }
        let element_key = keys.element_data_key(entry.id);
        let row = match txn.get(ObjectStore::ElementData, &StoreKey::Str(element_key))? {
            Some(row) => row,
            None => {
                // Entity vanished between indexing and lookup.
                tracing::warn!(id = %entry.id, "no element data for matched entry, skipping");
                continue;
            }
        };
        let element = keys.decrypt_element(&row)?;
        if let Some(required) = result.restriction.list_id {
            if element.list_id != required {
                continue;
            }
        }
        result.results.push(SearchHit {
            list_id: element.list_id,
            id: entry.id,
        });
        added += 1;
    }

    result.more_results = leftover;
    Ok(added)
}
