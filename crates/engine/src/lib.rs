//! Search pipeline of the maildex encrypted full-text search core
//!
//! The engine reads a locally persisted, encrypted inverted index and
//! answers queries with ranked entity ids, newest first. The index is
//! written by a separate background indexer; this crate holds the read
//! side only: streaming decryption and AND-merging of posting lists,
//! attribute and time-window filtering, strict-phrase reduction,
//! resumable pagination and the prefix-suggestion path.
//!
//! Entry point: [`SearchEngine`]. Collaborators arrive as traits:
//! [`MailIndexer`] (index horizon and backward extension),
//! [`EntityLoader`] (entity loads for the suggestion filter) and
//! [`SuggestionProvider`] (prefix completion).

pub mod indexer;
pub mod model;
pub mod search;
pub mod testing;

pub use indexer::MailIndexer;
pub use model::{
    AssociationKind, AssociationModel, Cardinality, Entity, EntityLoader, FieldValue, TypeModel,
    TypeRegistry, ValueKind, ValueModel,
};
pub use search::{SearchEngine, SuggestionProvider};
