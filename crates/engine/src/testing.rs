//! Test support: fixture writers and stub collaborators
//!
//! `IndexFixture` plays the role of the external indexer when seeding
//! stores for tests: it encrypts and frames postings in the exact wire
//! layout the engine reads, maintains the per-term metadata rows and
//! writes element data. The stub collaborators give tests full control
//! over the indexer horizon, entity loads and suggestion expansion.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use maildex_core::{
    AttributeId, ChunkDescriptor, ElementData, EntityId, Entry, ListId, Result, SearchError,
    TypeRef,
};
use maildex_crypto::SearchKeys;
use maildex_store::framing::append_block;
use maildex_store::{ObjectStore, Store, StoreKey};
use parking_lot::RwLock;
use rand::RngCore;

use crate::indexer::MailIndexer;
use crate::model::{Entity, EntityLoader};
use crate::search::tokenizer::tokenize;
use crate::search::SuggestionProvider;

/// Shorthand for building a posting entry.
pub fn posting(id: u64, attribute: u16, positions: &[u32]) -> Entry {
    Entry {
        id: EntityId(id),
        attribute: AttributeId(attribute),
        positions: positions.to_vec(),
    }
}

fn random_iv() -> [u8; 16] {
    let mut iv = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

// ============================================================================
// IndexFixture
// ============================================================================

/// Writes index fixtures the way the background indexer would.
pub struct IndexFixture {
    store: Store,
    keys: SearchKeys,
    next_chunk_key: u64,
    metas: HashMap<String, Vec<ChunkDescriptor>>,
}

impl IndexFixture {
    /// Fresh fixture over an empty store.
    pub fn new(keys: SearchKeys) -> Self {
        IndexFixture {
            store: Store::new(),
            keys,
            next_chunk_key: 1,
            metas: HashMap::new(),
        }
    }

    /// Handle to the seeded store (cheap clone, shared data).
    pub fn store(&self) -> Store {
        self.store.clone()
    }

    /// The keys the fixture encrypts with.
    pub fn keys(&self) -> SearchKeys {
        self.keys.clone()
    }

    /// Write one posting chunk for a term, allocating the next chunk key.
    /// Returns the key.
    pub fn add_chunk(&mut self, term: &str, type_ref: TypeRef, entries: &[Entry]) -> u64 {
        let key = self.next_chunk_key;
        self.next_chunk_key += 1;
        self.add_chunk_with_key(term, type_ref, key, entries);
        key
    }

    /// Write one posting chunk under an explicit key, for tests that
    /// need precise control over cursor behavior.
    pub fn add_chunk_with_key(
        &mut self,
        term: &str,
        type_ref: TypeRef,
        chunk_key: u64,
        entries: &[Entry],
    ) {
        self.next_chunk_key = self.next_chunk_key.max(chunk_key + 1);

        let mut chunk = Vec::new();
        for entry in entries {
            append_block(&mut chunk, &self.keys.encrypt_entry(entry, &random_iv()));
        }
        self.store
            .put(ObjectStore::SearchIndex, StoreKey::U64(chunk_key), chunk)
            .expect("seed chunk");

        let descriptors = self.metas.entry(term.to_string()).or_default();
        descriptors.push(ChunkDescriptor {
            key: chunk_key,
            size: entries.len() as u32,
            app: type_ref.app,
            type_id: type_ref.type_id,
        });
        descriptors.sort_by_key(|d| d.key);

        let row = self.keys.encrypt_meta(descriptors, &random_iv());
        self.store
            .put(
                ObjectStore::SearchIndexMeta,
                StoreKey::Str(self.keys.index_key(term)),
                row,
            )
            .expect("seed meta row");
    }

    /// Write the element-data row for an entity.
    pub fn put_element(&mut self, id: EntityId, list_id: ListId) {
        let row = self
            .keys
            .encrypt_element(&ElementData { list_id }, &random_iv());
        self.store
            .put(
                ObjectStore::ElementData,
                StoreKey::Str(self.keys.element_data_key(id)),
                row,
            )
            .expect("seed element data");
    }

    /// Remove an element-data row, simulating an entity deleted after
    /// indexing.
    pub fn remove_element(&mut self, id: EntityId) {
        self.store
            .delete(
                ObjectStore::ElementData,
                &StoreKey::Str(self.keys.element_data_key(id)),
            )
            .expect("remove element data");
    }

    /// Index a whole document: tokenize each attribute, write one chunk
    /// per term and the element-data row.
    pub fn index_document(
        &mut self,
        type_ref: TypeRef,
        list_id: ListId,
        id: EntityId,
        fields: &[(AttributeId, &str)],
    ) {
        let mut positions: BTreeMap<(String, AttributeId), Vec<u32>> = BTreeMap::new();
        for (attribute, text) in fields {
            for (pos, token) in tokenize(text).into_iter().enumerate() {
                positions
                    .entry((token, *attribute))
                    .or_default()
                    .push(pos as u32);
            }
        }

        let mut by_term: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
        for ((term, attribute), positions) in positions {
            by_term.entry(term).or_default().push(Entry {
                id,
                attribute,
                positions,
            });
        }
        for (term, entries) in by_term {
            self.add_chunk(&term, type_ref, &entries);
        }
        self.put_element(id, list_id);
    }
}

// ============================================================================
// Stub collaborators
// ============================================================================

/// Indexer stub with a controllable horizon.
///
/// A successful extension moves the horizon back to the requested
/// instant; `cancel_next_extension` makes the next request fail with a
/// cooperative cancellation instead.
pub struct StaticIndexer {
    horizon: AtomicI64,
    cancel_next: AtomicUsize,
    extension_requests: AtomicUsize,
    last_target: AtomicI64,
}

impl StaticIndexer {
    /// Indexer whose horizon sits at the given timestamp.
    pub fn with_horizon(timestamp_ms: i64) -> Self {
        StaticIndexer {
            horizon: AtomicI64::new(timestamp_ms),
            cancel_next: AtomicUsize::new(0),
            extension_requests: AtomicUsize::new(0),
            last_target: AtomicI64::new(i64::MIN),
        }
    }

    /// Indexer that has indexed all history.
    pub fn fully_indexed() -> Self {
        Self::with_horizon(maildex_core::FULL_INDEXED_TIMESTAMP)
    }

    /// Make the next `extend_index` call report a cancellation.
    pub fn cancel_next_extension(&self) {
        self.cancel_next.fetch_add(1, Ordering::SeqCst);
    }

    /// How many extensions were requested so far.
    pub fn extension_requests(&self) -> usize {
        self.extension_requests.load(Ordering::SeqCst)
    }

    /// Target of the most recent extension request, if any.
    pub fn last_extension_target(&self) -> Option<i64> {
        match self.last_target.load(Ordering::SeqCst) {
            i64::MIN => None,
            target => Some(target),
        }
    }
}

impl MailIndexer for StaticIndexer {
    fn current_index_timestamp(&self) -> i64 {
        self.horizon.load(Ordering::SeqCst)
    }

    fn extend_index(&self, since_epoch_ms: i64) -> Result<()> {
        self.extension_requests.fetch_add(1, Ordering::SeqCst);
        self.last_target.store(since_epoch_ms, Ordering::SeqCst);
        if self.cancel_next.load(Ordering::SeqCst) > 0 {
            self.cancel_next.fetch_sub(1, Ordering::SeqCst);
            return Err(SearchError::cancelled("indexer shut down mid-extension"));
        }
        let _ = self
            .horizon
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.min(since_epoch_ms))
            });
        Ok(())
    }
}

/// Entity loader stub over an in-memory map.
#[derive(Default)]
pub struct MapLoader {
    entities: RwLock<HashMap<(ListId, EntityId), Entity>>,
    denied: RwLock<HashSet<EntityId>>,
}

impl MapLoader {
    /// Empty loader.
    pub fn new() -> Self {
        MapLoader::default()
    }

    /// Register an entity under its container and id.
    pub fn insert(&self, list_id: ListId, id: EntityId, entity: Entity) {
        self.entities.write().insert((list_id, id), entity);
    }

    /// Make loads of this id fail with `NotAuthorized`.
    pub fn deny(&self, id: EntityId) {
        self.denied.write().insert(id);
    }
}

impl EntityLoader for MapLoader {
    fn load(&self, _type_ref: TypeRef, list_id: ListId, id: EntityId) -> Result<Entity> {
        if self.denied.read().contains(&id) {
            return Err(SearchError::not_authorized(format!("entity {id}")));
        }
        self.entities
            .read()
            .get(&(list_id, id))
            .cloned()
            .ok_or_else(|| SearchError::not_found(format!("entity {id}")))
    }
}

/// Suggestion provider stub with canned completions.
#[derive(Default)]
pub struct StaticSuggestions {
    completions: HashMap<String, Vec<String>>,
}

impl StaticSuggestions {
    /// Provider answering `prefix` with the given completions.
    pub fn new(pairs: &[(&str, &[&str])]) -> Self {
        let completions = pairs
            .iter()
            .map(|(prefix, words)| {
                (
                    prefix.to_string(),
                    words.iter().map(|w| w.to_string()).collect(),
                )
            })
            .collect();
        StaticSuggestions { completions }
    }
}

impl SuggestionProvider for StaticSuggestions {
    fn suggestions(&self, prefix: &str) -> Vec<String> {
        self.completions.get(prefix).cloned().unwrap_or_default()
    }
}
