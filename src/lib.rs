//! # maildex
//!
//! Client-side encrypted full-text search core for mail data.
//!
//! The index lives in a local store, encrypted under the user's database
//! key; a background indexer writes it, this crate reads it. A search
//! tokenizes the query, derives the opaque lookup key per term, streams
//! and decrypts the matching posting chunks, AND-merges them, applies
//! attribute / time-window constraints (and phrase positions for quoted
//! queries) and resolves the matches to `(list, id)` pairs, newest
//! first.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use maildex::{SearchEngine, SearchKeys, SearchRestriction, Store, TypeRef, TypeRegistry};
//! # use maildex_engine::testing::{MapLoader, StaticIndexer};
//!
//! # fn main() -> maildex::Result<()> {
//! let keys = SearchKeys::new([0u8; 16], [0u8; 16]);
//! let engine = SearchEngine::new(
//!     Store::new(),
//!     keys,
//!     Arc::new(StaticIndexer::fully_indexed()),
//!     Arc::new(MapLoader::new()),
//!     TypeRegistry::new(),
//! );
//!
//! let result = engine.search("invoice march", SearchRestriction::new(TypeRef::MAIL), 0, Some(25))?;
//! for hit in &result.results {
//!     println!("{} in list {}", hit.id, hit.list_id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Pagination feeds the result back in:
//! `engine.get_more_results(&mut result, 25)?` appends the next page
//! without re-reading what earlier pages already consumed.

pub use maildex_core::{
    start_of_day, AttributeId, ChunkDescriptor, ElementData, EntityId, Entry, ListId, Result,
    RowCursor, SearchError, SearchHit, SearchRestriction, SearchResult, SearchTimings,
    TypeRef, FULL_INDEXED_TIMESTAMP, NOTHING_INDEXED_TIMESTAMP,
};
pub use maildex_crypto::SearchKeys;
pub use maildex_engine::{
    AssociationKind, Cardinality, Entity, EntityLoader, FieldValue, MailIndexer, SearchEngine,
    SuggestionProvider, TypeModel, TypeRegistry, ValueKind, ValueModel,
};
pub use maildex_store::{ObjectStore, ReadTransaction, Store, StoreKey};
