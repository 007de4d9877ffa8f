//! Shared test bed: a seeded fixture plus stub collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use maildex_core::{AttributeId, SearchResult, TypeRef};
use maildex_crypto::SearchKeys;
use maildex_engine::testing::{IndexFixture, MapLoader, StaticIndexer};
use maildex_engine::{SearchEngine, TypeModel, TypeRegistry, ValueKind};

/// Attribute tag for mail subjects in these tests.
pub const SUBJECT: AttributeId = AttributeId(1);
/// Attribute tag for mail bodies in these tests.
pub const BODY: AttributeId = AttributeId(2);

pub struct TestBed {
    pub fixture: IndexFixture,
    pub indexer: Arc<StaticIndexer>,
    pub loader: Arc<MapLoader>,
    pub registry: TypeRegistry,
}

impl TestBed {
    /// Empty store, fully indexed horizon, mail type model registered.
    pub fn new() -> Self {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeRef::MAIL,
            TypeModel::new()
                .with_value("subject", SUBJECT, ValueKind::Text)
                .with_value("body", BODY, ValueKind::Text),
        );
        TestBed {
            fixture: IndexFixture::new(SearchKeys::new([21; 16], [34; 16])),
            indexer: Arc::new(StaticIndexer::fully_indexed()),
            loader: Arc::new(MapLoader::new()),
            registry,
        }
    }

    pub fn engine(&self) -> SearchEngine {
        SearchEngine::new(
            self.fixture.store(),
            self.fixture.keys(),
            self.indexer.clone(),
            self.loader.clone(),
            self.registry.clone(),
        )
    }
}

/// The result's entity ids, in result order.
pub fn result_ids(result: &SearchResult) -> Vec<u64> {
    result.results.iter().map(|hit| hit.id.0).collect()
}
