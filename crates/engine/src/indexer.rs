//! Indexer collaborator contract
//!
//! The background indexer owns the write side of the search index and
//! tracks how far back in time it has gone. The search core only ever
//! asks two things of it: where the horizon currently sits, and to push
//! the horizon further into the past before a time-restricted search.

use maildex_core::Result;

/// Contract of the background mail indexer.
///
/// `current_index_timestamp` returns the oldest indexed instant in epoch
/// milliseconds, or one of the sentinels `FULL_INDEXED_TIMESTAMP` /
/// `NOTHING_INDEXED_TIMESTAMP`.
///
/// `extend_index` blocks until coverage reaches `since_epoch_ms` (or the
/// indexer decides to stop). A cooperative cancellation surfaces as
/// `SearchError::Cancelled`; the search tolerates it and proceeds with
/// whatever is indexed.
pub trait MailIndexer: Send + Sync {
    /// Oldest indexed instant, or a sentinel.
    fn current_index_timestamp(&self) -> i64;

    /// Extend index coverage backward to `since_epoch_ms`.
    fn extend_index(&self, since_epoch_ms: i64) -> Result<()>;
}
