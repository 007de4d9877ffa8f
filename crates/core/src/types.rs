//! Data model of the encrypted inverted index and the search surface
//!
//! Stored shapes (what the indexer writes, what the core reads):
//!
//! ```text
//! SearchIndexMeta row (per term, AES-CBC random IV):
//!   Vec<ChunkDescriptor { key u64, size u32, app u8, type_id u8 }>
//!   sorted ascending by key — larger key ⇒ more recently indexed
//!
//! SearchIndex row (per chunk): varint-framed blocks, one per entry
//!   block = enc_id(16B, fixed IV) ∥ iv(16B) ∥ ct(EntryPayload)
//!
//! ElementData row (per entity, keyed by base64(enc_id)):
//!   ElementData { list_id }
//! ```
//!
//! In-memory shapes: `Entry` is a decrypted posting, `EncryptedEntry` a
//! parsed-but-undecrypted block carrying its id hash, and `SearchResult`
//! doubles as the pagination cursor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::id::{AttributeId, EntityId, ListId, TypeRef};

// ============================================================================
// Stored records
// ============================================================================

/// Descriptor of one posting chunk, as stored in a term's metadata row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    /// Key of the chunk row in the posting store
    pub key: u64,
    /// Number of framed entries encoded in the chunk
    pub size: u32,
    /// Application id of the entity kind this chunk covers
    pub app: u8,
    /// Type id of the entity kind this chunk covers
    pub type_id: u8,
}

impl ChunkDescriptor {
    /// Check whether this chunk belongs to the given entity kind.
    pub fn matches_type(&self, type_ref: TypeRef) -> bool {
        self.app == type_ref.app && self.type_id == type_ref.type_id
    }
}

/// Encrypted body of a posting entry (everything except the id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPayload {
    /// Attribute the term occurred in
    pub attribute: AttributeId,
    /// Strictly increasing token positions within that attribute
    pub positions: Vec<u32>,
}

/// Element-data record resolved during result assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementData {
    /// Container the entity lives in
    pub list_id: ListId,
}

// ============================================================================
// In-memory postings
// ============================================================================

/// A parsed but not yet decrypted posting block.
///
/// Carries the CRC-32 of the encrypted id prefix so AND-merging can
/// discard most non-matches before paying for a single decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEntry {
    /// Deterministically encrypted entity id (fixed IV)
    pub enc_id: [u8; 16],
    /// CRC-32 of `enc_id`
    pub id_hash: u32,
    /// IV-prefixed ciphertext of the entry payload
    pub payload: Vec<u8>,
}

/// A decrypted posting: one term occurrence set in one entity attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entity the posting belongs to
    pub id: EntityId,
    /// Attribute the term occurred in
    pub attribute: AttributeId,
    /// Strictly increasing token positions within that attribute
    pub positions: Vec<u32>,
}

// ============================================================================
// SearchRestriction
// ============================================================================

/// Constraints a search is evaluated under.
///
/// `start` is the newer edge of the time window, `end` the older edge —
/// the search walks backwards through time. Built with the builder
/// methods; only the entity type is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRestriction {
    /// Entity kind to search
    pub type_ref: TypeRef,
    /// Optional whitelist of attribute tags
    pub attribute_ids: Option<Vec<AttributeId>>,
    /// Optional single-container restriction
    pub list_id: Option<ListId>,
    /// Newer bound of the time window (epoch ms, inclusive)
    pub start: Option<i64>,
    /// Older bound of the time window (epoch ms, inclusive)
    pub end: Option<i64>,
}

impl SearchRestriction {
    /// Restriction over one entity kind with no further constraints.
    pub fn new(type_ref: TypeRef) -> Self {
        SearchRestriction {
            type_ref,
            attribute_ids: None,
            list_id: None,
            start: None,
            end: None,
        }
    }

    /// Whitelist the attributes postings may come from.
    pub fn with_attributes(mut self, ids: Vec<AttributeId>) -> Self {
        self.attribute_ids = Some(ids);
        self
    }

    /// Restrict results to one container.
    pub fn with_list(mut self, list_id: ListId) -> Self {
        self.list_id = Some(list_id);
        self
    }

    /// Set the newer edge of the time window.
    pub fn with_start(mut self, timestamp_ms: i64) -> Self {
        self.start = Some(timestamp_ms);
        self
    }

    /// Set the older edge of the time window.
    pub fn with_end(mut self, timestamp_ms: i64) -> Self {
        self.end = Some(timestamp_ms);
        self
    }
}

// ============================================================================
// Cursor state
// ============================================================================

/// Per-term read cursor.
///
/// `last_read_chunk_key` is the smallest chunk key read so far; the next
/// page only reads chunks with strictly smaller keys. `None` means the
/// term has not been read yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCursor {
    /// The searched term this cursor tracks
    pub term: String,
    /// Smallest chunk key read so far
    pub last_read_chunk_key: Option<u64>,
    /// Set once no chunk with a smaller key remains
    pub exhausted: bool,
}

impl RowCursor {
    /// Fresh cursor for a term.
    pub fn new(term: impl Into<String>) -> Self {
        RowCursor {
            term: term.into(),
            last_read_chunk_key: None,
            exhausted: false,
        }
    }
}

/// Encrypted entries read for one term but not yet emitted.
///
/// Kept on the result so intersection stays correct across pages: an id
/// only ever surfaces once its posting has been read for every term, and
/// one read for a term is never forgotten between pages.
#[derive(Debug, Clone, Default)]
pub struct PendingRow {
    /// Parsed blocks awaiting intersection
    pub entries: Vec<EncryptedEntry>,
}

/// Suggestion post-filter carried for pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionFilter {
    /// Prefix the last query term must complete to
    pub prefix: String,
    /// Stop once this many entities passed the filter
    pub min_count: usize,
}

// ============================================================================
// SearchResult
// ============================================================================

/// One result row: container plus entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    /// Container the entity lives in
    pub list_id: ListId,
    /// Entity id
    pub id: EntityId,
}

/// Per-page timing record, attached to the result for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchTimings {
    /// Tokenizing and cursor setup
    pub prepare: Duration,
    /// Waiting for the indexer to extend coverage
    pub index_extension: Duration,
    /// Metadata and chunk reads
    pub store_reads: Duration,
    /// Decryption, intersection and phrase reduction
    pub merge: Duration,
    /// Element-data resolution and ordering
    pub assemble: Duration,
    /// Suggestion expansion / prefix filtering
    pub suggestions: Duration,
    /// Pages accumulated into this result so far
    pub pages: u32,
}

/// Outcome of a search, and at the same time the cursor for the next page.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The raw query string as given by the caller
    pub query: String,
    /// Constraints the search ran under
    pub restriction: SearchRestriction,
    /// Matching `(list, id)` pairs, strictly newest first, no duplicates
    pub results: Vec<SearchHit>,
    /// Indexer horizon observed at the start of the latest page
    pub current_index_timestamp: i64,
    /// Strict-phrase mode (fully quoted query with ≥ 2 terms)
    pub match_word_order: bool,
    /// One read cursor per searched token
    pub row_cursors: Vec<RowCursor>,
    /// Per-token encrypted entries read but not yet emitted
    pub pending: Vec<PendingRow>,
    /// Fully matched entries not yet consumed by a page budget
    pub more_results: Vec<Entry>,
    /// Present when a multi-term suggestion search must re-filter pages
    pub suggestion_filter: Option<SuggestionFilter>,
    /// Timing diagnostics
    pub timings: SearchTimings,
}

impl SearchResult {
    /// Empty result for a query under a restriction.
    pub fn new(query: impl Into<String>, restriction: SearchRestriction) -> Self {
        SearchResult {
            query: query.into(),
            restriction,
            results: Vec::new(),
            current_index_timestamp: 0,
            match_word_order: false,
            row_cursors: Vec::new(),
            pending: Vec::new(),
            more_results: Vec::new(),
            suggestion_filter: None,
            timings: SearchTimings::default(),
        }
    }

    /// Install one cursor (and matching pending row) per token.
    pub fn init_cursors<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.row_cursors = tokens.into_iter().map(RowCursor::new).collect();
        self.pending = self
            .row_cursors
            .iter()
            .map(|_| PendingRow::default())
            .collect();
    }

    /// True once every cursor has run out of chunks to read.
    pub fn all_cursors_exhausted(&self) -> bool {
        !self.row_cursors.is_empty() && self.row_cursors.iter().all(|c| c.exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restriction_builder() {
        let r = SearchRestriction::new(TypeRef::MAIL)
            .with_attributes(vec![AttributeId(1), AttributeId(2)])
            .with_list(ListId(7))
            .with_start(2_000)
            .with_end(1_000);
        assert_eq!(r.type_ref, TypeRef::MAIL);
        assert_eq!(r.attribute_ids.as_deref(), Some(&[AttributeId(1), AttributeId(2)][..]));
        assert_eq!(r.list_id, Some(ListId(7)));
        assert_eq!(r.start, Some(2_000));
        assert_eq!(r.end, Some(1_000));
    }

    #[test]
    fn test_chunk_descriptor_type_match() {
        let desc = ChunkDescriptor {
            key: 9,
            size: 3,
            app: TypeRef::MAIL.app,
            type_id: TypeRef::MAIL.type_id,
        };
        assert!(desc.matches_type(TypeRef::MAIL));
        assert!(!desc.matches_type(TypeRef::CONTACT));
    }

    #[test]
    fn test_init_cursors_aligns_pending() {
        let mut result = SearchResult::new("a b", SearchRestriction::new(TypeRef::MAIL));
        result.init_cursors(["alpha", "beta"]);
        assert_eq!(result.row_cursors.len(), 2);
        assert_eq!(result.pending.len(), 2);
        assert_eq!(result.row_cursors[0].term, "alpha");
        assert!(result.row_cursors[0].last_read_chunk_key.is_none());
        assert!(!result.all_cursors_exhausted());
    }

    #[test]
    fn test_all_cursors_exhausted_requires_cursors() {
        let result = SearchResult::new("", SearchRestriction::new(TypeRef::MAIL));
        // An empty query has no cursors and is never "exhausted"
        assert!(!result.all_cursors_exhausted());
    }
}
