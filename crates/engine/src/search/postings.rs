//! Posting fetcher: from a chunk descriptor to parsed encrypted entries
//!
//! Fetches the chunk row, walks its frames and parses each block. The
//! descriptor's `size` promised how many entries the chunk holds; any
//! disagreement between that promise and the framing is corruption and
//! aborts the page. An absent chunk row, by contrast, is an ordinary
//! miss and yields nothing.

use maildex_core::{ChunkDescriptor, EncryptedEntry, Result, SearchError};
use maildex_crypto::SearchKeys;
use maildex_store::framing::BlockIter;
use maildex_store::{ObjectStore, ReadTransaction, StoreKey};

/// Fetch one chunk and parse its framed blocks in stored order.
pub fn fetch_chunk(
    txn: &ReadTransaction,
    keys: &SearchKeys,
    desc: &ChunkDescriptor,
) -> Result<Vec<EncryptedEntry>> {
    let row = match txn.get(ObjectStore::SearchIndex, &StoreKey::U64(desc.key))? {
        Some(row) => row,
        None => return Ok(Vec::new()),
    };

    let mut entries = Vec::with_capacity(desc.size as usize);
    for block in BlockIter::new(&row) {
        let block = block.map_err(|e| {
            SearchError::corruption(format!("chunk {}: {e}", desc.key))
        })?;
        entries.push(keys.parse_block(block.bytes)?);
    }

    if entries.len() != desc.size as usize {
        return Err(SearchError::corruption(format!(
            "chunk {} holds {} entries but its descriptor says {}",
            desc.key,
            entries.len(),
            desc.size
        )));
    }
    Ok(entries)
}
