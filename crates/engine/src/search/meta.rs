//! Metadata reader: from a term to its chunk descriptors (newest first)
//!
//! A term's metadata row stores chunk descriptors sorted ascending by
//! chunk key; larger keys were written later. The reader decrypts the
//! row, keeps the descriptors of the requested entity kind and flips the
//! order so the newest chunks come first — the order every later stage
//! works in.
//!
//! Batch selection implements the per-page read budget: each page reads,
//! per term, only descriptors below the cursor whose summed entry count
//! stays under `MAX_ENTRIES_PER_TERM_PER_PAGE` (always at least one, so
//! an oversized chunk cannot wedge the cursor).

use maildex_core::{ChunkDescriptor, Result, RowCursor, TypeRef};
use maildex_crypto::SearchKeys;
use maildex_store::{ObjectStore, ReadTransaction, StoreKey};

/// Per-term, per-page budget of posting entries. A tuning constant, not
/// a correctness bound.
pub const MAX_ENTRIES_PER_TERM_PER_PAGE: u32 = 1000;

/// Read and decrypt a term's chunk descriptors, newest first.
///
/// An absent metadata row means the term never occurs: empty result.
pub fn read_meta(
    txn: &ReadTransaction,
    keys: &SearchKeys,
    term: &str,
    type_ref: TypeRef,
) -> Result<Vec<ChunkDescriptor>> {
    let index_key = keys.index_key(term);
    let row = match txn.get(ObjectStore::SearchIndexMeta, &StoreKey::Str(index_key))? {
        Some(row) => row,
        None => return Ok(Vec::new()),
    };
    let mut descriptors = keys.decrypt_meta(&row)?;
    descriptors.retain(|d| d.matches_type(type_ref));
    descriptors.reverse();
    Ok(descriptors)
}

/// Select the next batch of descriptors for a cursor.
///
/// `descriptors` must be ordered newest first (as `read_meta` returns
/// them). Only descriptors strictly below the cursor's last read key are
/// considered; the batch stops before the entry budget is exceeded but
/// never comes back empty while chunks remain.
pub fn next_batch<'a>(
    descriptors: &'a [ChunkDescriptor],
    cursor: &RowCursor,
) -> &'a [ChunkDescriptor] {
    let start = match cursor.last_read_chunk_key {
        Some(last) => descriptors.partition_point(|d| d.key >= last),
        None => 0,
    };
    let remaining = &descriptors[start..];

    let mut taken = 0usize;
    let mut budget = 0u64;
    for d in remaining {
        if taken > 0 && budget + d.size as u64 > MAX_ENTRIES_PER_TERM_PER_PAGE as u64 {
            break;
        }
        budget += d.size as u64;
        taken += 1;
    }
    &remaining[..taken]
}
