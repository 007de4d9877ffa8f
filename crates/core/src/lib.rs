//! Shared types for the maildex search core
//!
//! This crate holds what every layer needs to agree on: identifier
//! newtypes with their timestamp encoding, the stored record shapes of
//! the encrypted index, the search restriction / result surface, and the
//! unified error type.

pub mod error;
pub mod id;
pub mod types;

pub use error::{Result, SearchError};
pub use id::{
    start_of_day, AttributeId, EntityId, ListId, TypeRef, FULL_INDEXED_TIMESTAMP,
    NOTHING_INDEXED_TIMESTAMP,
};
pub use types::{
    ChunkDescriptor, ElementData, EncryptedEntry, Entry, EntryPayload, PendingRow, RowCursor,
    SearchHit, SearchRestriction, SearchResult, SearchTimings, SuggestionFilter,
};
