//! Error types for the search core
//!
//! One unified enum covers the whole pipeline. Handling policy lives with
//! the callers, not here: per-candidate entity loads swallow `NotFound` /
//! `NotAuthorized`, the orchestrator swallows `Cancelled` from the
//! indexer, and everything else surfaces to the caller unchanged.

use thiserror::Error;

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error type for all search core operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Entity or row not found where one was required
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller is not permitted to read the entity
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A cooperative collaborator (the indexer) cancelled its work
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Stored data failed a structural check (framing, sizes, padding)
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// Encryption or decryption failed (key mismatch or mangled ciphertext)
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The persistent store rejected an operation
    #[error("store error: {0}")]
    Store(String),

    /// Anything that does not fit the categories above
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Create a NotFound error
    pub fn not_found(msg: impl Into<String>) -> Self {
        SearchError::NotFound(msg.into())
    }

    /// Create a NotAuthorized error
    pub fn not_authorized(msg: impl Into<String>) -> Self {
        SearchError::NotAuthorized(msg.into())
    }

    /// Create a Cancelled error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        SearchError::Cancelled(msg.into())
    }

    /// Create a Corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        SearchError::Corruption(msg.into())
    }

    /// Create a Crypto error
    pub fn crypto(msg: impl Into<String>) -> Self {
        SearchError::Crypto(msg.into())
    }

    /// Create a Store error
    pub fn store(msg: impl Into<String>) -> Self {
        SearchError::Store(msg.into())
    }

    /// Create an Other error
    pub fn other(msg: impl Into<String>) -> Self {
        SearchError::Other(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::NotFound(_))
    }

    /// Check if this is a Cancelled error
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchError::Cancelled(_))
    }

    /// Errors a per-candidate entity load may swallow.
    ///
    /// The entity may have been deleted between indexing and the lookup
    /// (`NotFound`) or sit in a mailbox the session lost access to
    /// (`NotAuthorized`). Both mean "skip this candidate, keep going".
    pub fn is_skippable_load(&self) -> bool {
        matches!(
            self,
            SearchError::NotFound(_) | SearchError::NotAuthorized(_)
        )
    }

    /// Errors that indicate the local index itself is damaged.
    ///
    /// These abort the page: retrying will not help until the index is
    /// rebuilt.
    pub fn is_index_damage(&self) -> bool {
        matches!(self, SearchError::Corruption(_) | SearchError::Crypto(_))
    }
}
