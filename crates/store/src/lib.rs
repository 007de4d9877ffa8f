//! Object stores backing the encrypted search index
//!
//! Three named stores, mirroring the layout the indexer writes:
//!
//! | Store | Key | Value |
//! |---|---|---|
//! | `SearchIndexMeta` | index key (base64 string) | encrypted chunk descriptor list |
//! | `SearchIndex` | chunk key (`u64`) | varint-framed encrypted entries |
//! | `ElementData` | base64 encrypted id | encrypted element data |
//!
//! Reads go through a [`ReadTransaction`] that declares up front which
//! stores it touches; reading an undeclared store is a store error. The
//! search core never writes — [`Store::put`] exists for the indexer
//! collaborator and for test fixtures.

pub mod framing;

use std::collections::BTreeMap;
use std::sync::Arc;

use maildex_core::{Result, SearchError};
use parking_lot::RwLock;

// ============================================================================
// ObjectStore / StoreKey
// ============================================================================

/// The named object stores of the search database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectStore {
    /// Per-term metadata rows, keyed by index key
    SearchIndexMeta,
    /// Posting chunks, keyed by chunk key
    SearchIndex,
    /// Per-entity element data, keyed by base64 encrypted id
    ElementData,
}

impl ObjectStore {
    fn name(&self) -> &'static str {
        match self {
            ObjectStore::SearchIndexMeta => "SearchIndexMeta",
            ObjectStore::SearchIndex => "SearchIndex",
            ObjectStore::ElementData => "ElementData",
        }
    }
}

/// Key into an object store.
///
/// The metadata and element stores are string-keyed, the posting store
/// is keyed by `u64` chunk keys. Using the wrong key kind against a
/// store is a store error, same as reading an undeclared store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreKey {
    /// String key (index key or base64 encrypted id)
    Str(String),
    /// Numeric chunk key
    U64(u64),
}

impl From<&str> for StoreKey {
    fn from(s: &str) -> Self {
        StoreKey::Str(s.to_string())
    }
}

impl From<String> for StoreKey {
    fn from(s: String) -> Self {
        StoreKey::Str(s)
    }
}

impl From<u64> for StoreKey {
    fn from(k: u64) -> Self {
        StoreKey::U64(k)
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
struct Maps {
    meta: BTreeMap<String, Vec<u8>>,
    index: BTreeMap<u64, Vec<u8>>,
    elements: BTreeMap<String, Vec<u8>>,
}

/// Handle to the search database. Cheap to clone.
#[derive(Clone, Default)]
pub struct Store {
    maps: Arc<RwLock<Maps>>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Store::default()
    }

    /// Open a read transaction over the given stores.
    pub fn read_txn(&self, stores: &[ObjectStore]) -> Result<ReadTransaction> {
        if stores.is_empty() {
            return Err(SearchError::store(
                "read transaction must declare at least one object store",
            ));
        }
        Ok(ReadTransaction {
            maps: Arc::clone(&self.maps),
            declared: stores.to_vec(),
        })
    }

    /// Insert or replace a row. Writer-side API: the indexer and test
    /// fixtures use this; the search core does not.
    pub fn put(&self, store: ObjectStore, key: StoreKey, value: Vec<u8>) -> Result<()> {
        let mut maps = self.maps.write();
        match (store, key) {
            (ObjectStore::SearchIndexMeta, StoreKey::Str(k)) => {
                maps.meta.insert(k, value);
            }
            (ObjectStore::SearchIndex, StoreKey::U64(k)) => {
                maps.index.insert(k, value);
            }
            (ObjectStore::ElementData, StoreKey::Str(k)) => {
                maps.elements.insert(k, value);
            }
            (store, key) => {
                return Err(SearchError::store(format!(
                    "key {key:?} does not fit object store {}",
                    store.name()
                )))
            }
        }
        Ok(())
    }

    /// Remove a row (writer side; the indexer prunes superseded chunks).
    pub fn delete(&self, store: ObjectStore, key: &StoreKey) -> Result<()> {
        let mut maps = self.maps.write();
        match (store, key) {
            (ObjectStore::SearchIndexMeta, StoreKey::Str(k)) => {
                maps.meta.remove(k);
            }
            (ObjectStore::SearchIndex, StoreKey::U64(k)) => {
                maps.index.remove(k);
            }
            (ObjectStore::ElementData, StoreKey::Str(k)) => {
                maps.elements.remove(k);
            }
            (store, key) => {
                return Err(SearchError::store(format!(
                    "key {key:?} does not fit object store {}",
                    store.name()
                )))
            }
        }
        Ok(())
    }
}

// ============================================================================
// ReadTransaction
// ============================================================================

/// Read access to the stores declared at creation time.
pub struct ReadTransaction {
    maps: Arc<RwLock<Maps>>,
    declared: Vec<ObjectStore>,
}

impl ReadTransaction {
    /// Point lookup. Absent keys are `Ok(None)` — a miss is an ordinary
    /// outcome for the search core, not an error.
    pub fn get(&self, store: ObjectStore, key: &StoreKey) -> Result<Option<Vec<u8>>> {
        if !self.declared.contains(&store) {
            return Err(SearchError::store(format!(
                "object store {} was not declared by this transaction",
                store.name()
            )));
        }
        let maps = self.maps.read();
        let value = match (store, key) {
            (ObjectStore::SearchIndexMeta, StoreKey::Str(k)) => maps.meta.get(k),
            (ObjectStore::SearchIndex, StoreKey::U64(k)) => maps.index.get(k),
            (ObjectStore::ElementData, StoreKey::Str(k)) => maps.elements.get(k),
            (store, key) => {
                return Err(SearchError::store(format!(
                    "key {key:?} does not fit object store {}",
                    store.name()
                )))
            }
        };
        Ok(value.cloned())
    }
}
