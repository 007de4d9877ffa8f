//! Search orchestrator
//!
//! `SearchEngine` owns the store handle, the keys and the collaborator
//! handles, and drives the pipeline: tokenize → ensure index coverage →
//! read per-term chunk batches → intersect → filter → (phrase-reduce) →
//! assemble. The returned `SearchResult` doubles as the cursor; feeding
//! it back through `get_more_results` continues the walk strictly
//! backwards through the index without re-reading anything.
//!
//! Page loop invariants:
//! - every read batch lands in the result's pending rows before any
//!   merging, so an id surfaces only once every term has been read far
//!   enough to contain it;
//! - cursors only ever move to strictly smaller chunk keys;
//! - ids whose fate is settled (emitted, parked, filtered or
//!   phrase-rejected) are pruned from the pending rows.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use maildex_core::{
    start_of_day, EncryptedEntry, EntityId, Entry, Result, SearchRestriction, SearchResult,
    SuggestionFilter, TypeRef, FULL_INDEXED_TIMESTAMP, NOTHING_INDEXED_TIMESTAMP,
};
use maildex_crypto::SearchKeys;
use maildex_store::{ObjectStore, Store};

use super::intersect::{self, EntryFilter};
use super::meta;
use super::phrase;
use super::postings;
use super::results;
use super::suggest::{self, SuggestionProvider};
use super::tokenizer;
use crate::indexer::MailIndexer;
use crate::model::{EntityLoader, TypeRegistry};

/// The search core's public surface.
pub struct SearchEngine {
    store: Store,
    keys: SearchKeys,
    indexer: Arc<dyn MailIndexer>,
    loader: Arc<dyn EntityLoader>,
    registry: TypeRegistry,
    suggestion_providers: HashMap<TypeRef, Arc<dyn SuggestionProvider>>,
}

impl SearchEngine {
    /// Wire up the engine with its collaborators.
    pub fn new(
        store: Store,
        keys: SearchKeys,
        indexer: Arc<dyn MailIndexer>,
        loader: Arc<dyn EntityLoader>,
        registry: TypeRegistry,
    ) -> Self {
        SearchEngine {
            store,
            keys,
            indexer,
            loader,
            registry,
            suggestion_providers: HashMap::new(),
        }
    }

    /// Register the completion source for one entity type (at most one).
    pub fn register_suggestion_provider(
        &mut self,
        type_ref: TypeRef,
        provider: Arc<dyn SuggestionProvider>,
    ) {
        self.suggestion_providers.insert(type_ref, provider);
    }

    /// The indexer's current horizon, for "indexing up to …" displays.
    pub fn indexed_timestamp(&self) -> i64 {
        self.indexer.current_index_timestamp()
    }

    // ========================================================================
    // Public surface
    // ========================================================================

    /// Execute a search and return the first page.
    ///
    /// `min_suggestion_count > 0` switches to the suggestion path unless
    /// the query is a quoted phrase. `max_results` caps the page; `None`
    /// reads until the index is exhausted.
    pub fn search(
        &self,
        query: &str,
        restriction: SearchRestriction,
        min_suggestion_count: usize,
        max_results: Option<usize>,
    ) -> Result<SearchResult> {
        let prepare_started = Instant::now();
        let mut result = SearchResult::new(query, restriction);
        result.current_index_timestamp = self.indexer.current_index_timestamp();

        let terms = tokenizer::tokenize(query);
        if terms.is_empty() {
            return Ok(result);
        }
        result.match_word_order = terms.len() >= 2 && tokenizer::is_quoted_query(query);

        let use_suggestions = min_suggestion_count > 0 && !result.match_word_order;
        if use_suggestions && terms.len() == 1 {
            let suggest_started = Instant::now();
            let expansions = self.expand_term(result.restriction.type_ref, &terms[0]);
            result.timings.suggestions += suggest_started.elapsed();
            result.init_cursors(expansions);
        } else if use_suggestions {
            // AND-search over everything but the unfinished last term,
            // then post-filter loaded entities by prefix.
            let (head, last) = terms.split_at(terms.len() - 1);
            result.suggestion_filter = Some(SuggestionFilter {
                prefix: last[0].clone(),
                min_count: min_suggestion_count,
            });
            result.init_cursors(head.iter().cloned());
        } else {
            result.init_cursors(terms);
        }
        result.timings.prepare += prepare_started.elapsed();

        self.ensure_index_coverage(&mut result)?;

        if result.suggestion_filter.is_some() {
            self.run_page(&mut result, None)?;
            self.apply_suggestion_filter(&mut result, 0, min_suggestion_count)?;
            if let Some(max) = max_results {
                result.results.truncate(max);
            }
        } else {
            self.run_page(&mut result, max_results)?;
        }
        Ok(result)
    }

    /// Continue a search, adding up to `more_count` new hits to `result`.
    ///
    /// Multi-term suggestion searches examine their whole candidate set
    /// on the first page, so further calls return without changes.
    pub fn get_more_results(&self, result: &mut SearchResult, more_count: usize) -> Result<()> {
        if result.row_cursors.is_empty() {
            return Ok(());
        }
        if result.suggestion_filter.is_some() {
            let start = result.results.len();
            self.run_page(result, None)?;
            self.apply_suggestion_filter(result, start, more_count)?;
        } else {
            self.run_page(result, Some(more_count))?;
        }
        Ok(())
    }

    // ========================================================================
    // Index extension protocol
    // ========================================================================

    /// Resolve the older edge of the time window when the restriction
    /// leaves it open: mail falls back to the indexer horizon (an empty
    /// index counts as "now"), other types to the full-history sentinel.
    fn effective_end_timestamp(&self, restriction: &SearchRestriction) -> i64 {
        if let Some(end) = restriction.end {
            return end;
        }
        if restriction.type_ref == TypeRef::MAIL {
            match self.indexer.current_index_timestamp() {
                NOTHING_INDEXED_TIMESTAMP => now_ms(),
                horizon => horizon,
            }
        } else {
            FULL_INDEXED_TIMESTAMP
        }
    }

    /// Ask the indexer to extend backward when a mail search wants data
    /// older than the horizon. Cooperative cancellation is tolerated:
    /// the search proceeds over whatever is indexed.
    fn ensure_index_coverage(&self, result: &mut SearchResult) -> Result<()> {
        if result.restriction.type_ref != TypeRef::MAIL {
            return Ok(());
        }
        let end = match result.restriction.end {
            Some(end) => end,
            None => return Ok(()),
        };
        let horizon = self.indexer.current_index_timestamp();
        if horizon > FULL_INDEXED_TIMESTAMP && horizon > end {
            let extension_started = Instant::now();
            let extend_to = start_of_day(end);
            tracing::info!(extend_to, horizon, "extending index coverage backward");
            match self.indexer.extend_index(extend_to) {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {
                    tracing::info!("index extension cancelled, searching available range");
                }
                Err(e) => return Err(e),
            }
            result.timings.index_extension += extension_started.elapsed();
        }
        Ok(())
    }

    // ========================================================================
    // Page loop
    // ========================================================================

    /// Run one page: promote parked entries, then read, merge and
    /// assemble until the budget is met or every cursor is exhausted.
    /// `budget` counts hits added by this call.
    fn run_page(&self, result: &mut SearchResult, budget: Option<usize>) -> Result<()> {
        result.timings.pages += 1;
        result.current_index_timestamp = self.indexer.current_index_timestamp();

        let end_timestamp = self.effective_end_timestamp(&result.restriction);
        let filter = EntryFilter::new(&result.restriction, end_timestamp);
        let type_ref = result.restriction.type_ref;

        let index_txn = self
            .store
            .read_txn(&[ObjectStore::SearchIndexMeta, ObjectStore::SearchIndex])?;
        let element_txn = self.store.read_txn(&[ObjectStore::ElementData])?;

        let mut added = 0usize;

        // A previous page may have left fully matched entries behind;
        // they are promoted without touching the index.
        if !result.more_results.is_empty() {
            let assemble_started = Instant::now();
            let carried = std::mem::take(&mut result.more_results);
            added += results::assemble(&element_txn, &self.keys, carried, result, budget)?;
            result.timings.assemble += assemble_started.elapsed();
        }

        // Chunk descriptors per token, newest first. One metadata read
        // per token per page.
        let reads_started = Instant::now();
        let mut metas = Vec::with_capacity(result.row_cursors.len());
        for cursor in &result.row_cursors {
            metas.push(meta::read_meta(&index_txn, &self.keys, &cursor.term, type_ref)?);
        }
        result.timings.store_reads += reads_started.elapsed();

        let groups = token_groups(result);

        loop {
            if budget.is_some_and(|b| added >= b) {
                break;
            }

            // Read the next batch for every token that still has chunks.
            let reads_started = Instant::now();
            let mut progressed = false;
            for i in 0..result.row_cursors.len() {
                if result.row_cursors[i].exhausted {
                    continue;
                }
                let batch = meta::next_batch(&metas[i], &result.row_cursors[i]);
                if batch.is_empty() {
                    result.row_cursors[i].exhausted = true;
                    continue;
                }
                progressed = true;
                for desc in batch {
                    let entries = postings::fetch_chunk(&index_txn, &self.keys, desc)?;
                    result.pending[i].entries.extend(entries);
                }
                result.row_cursors[i].last_read_chunk_key = Some(
                    batch.last().expect("batch is non-empty").key,
                );
            }
            result.timings.store_reads += reads_started.elapsed();

            if !progressed {
                break;
            }

            // Merge everything read so far (this page and previous ones).
            let merge_started = Instant::now();
            let enc_groups: Vec<Vec<&EncryptedEntry>> = groups
                .iter()
                .map(|tokens| {
                    tokens
                        .iter()
                        .flat_map(|&t| result.pending[t].entries.iter())
                        .collect()
                })
                .collect();
            let common_hashes = intersect::hash_intersection(&enc_groups);

            let mut settled: HashSet<EntityId> = HashSet::new();
            let mut dec_groups: Vec<Vec<Entry>> = Vec::with_capacity(enc_groups.len());
            for group in &enc_groups {
                let mut decrypted = Vec::new();
                for enc in group {
                    if !common_hashes.contains(&enc.id_hash) {
                        continue;
                    }
                    let entry = self.keys.decrypt_entry(enc)?;
                    if !filter.in_id_range(entry.id) {
                        // The window verdict is per id and never changes.
                        settled.insert(entry.id);
                        continue;
                    }
                    if !filter.attribute_allowed(entry.attribute) {
                        // Dead entry, but the id may still match through
                        // another attribute — leave the id open.
                        continue;
                    }
                    decrypted.push(entry);
                }
                dec_groups.push(decrypted);
            }

            let common_ids = intersect::id_intersection(&dec_groups);
            for group in &mut dec_groups {
                group.retain(|e| common_ids.contains(&e.id));
            }
            // Ids seen in every term are fully processed below, one way
            // or the other.
            settled.extend(common_ids.iter().copied());

            let matched: Vec<Entry> = if result.match_word_order {
                phrase::reduce_phrase(&dec_groups)
            } else {
                dec_groups.into_iter().next().unwrap_or_default()
            };
            result.timings.merge += merge_started.elapsed();

            self.prune_pending(result, &settled);

            let assemble_started = Instant::now();
            let remaining = budget.map(|b| b - added);
            added += results::assemble(&element_txn, &self.keys, matched, result, remaining)?;
            result.timings.assemble += assemble_started.elapsed();
        }

        result.results.sort_by(|a, b| b.id.cmp(&a.id));
        tracing::debug!(
            query = %result.query,
            hits = result.results.len(),
            added,
            pages = result.timings.pages,
            "search page complete"
        );
        Ok(())
    }

    /// Drop settled ids from every pending row. The encrypted id is
    /// deterministic, so settled plaintext ids translate directly to
    /// prefixes that can be discarded without decryption.
    fn prune_pending(&self, result: &mut SearchResult, settled: &HashSet<EntityId>) {
        if settled.is_empty() {
            return;
        }
        let settled_prefixes: HashSet<[u8; 16]> = settled
            .iter()
            .map(|&id| self.keys.encrypt_id(id))
            .collect();
        for row in &mut result.pending {
            row.entries
                .retain(|e| !settled_prefixes.contains(&e.enc_id));
        }
    }

    // ========================================================================
    // Suggestion path
    // ========================================================================

    /// Expand a single-term query through the type's completion source.
    /// Without a registered provider the term stands for itself.
    fn expand_term(&self, type_ref: TypeRef, term: &str) -> Vec<String> {
        match self.suggestion_providers.get(&type_ref) {
            Some(provider) => provider.suggestions(term),
            None => vec![term.to_string()],
        }
    }

    /// Post-filter hits `start..` by the unfinished-prefix check,
    /// keeping at most `stop_after` passing entities. Unexamined hits
    /// are dropped; deleted or unreadable entities are skipped.
    fn apply_suggestion_filter(
        &self,
        result: &mut SearchResult,
        start: usize,
        stop_after: usize,
    ) -> Result<()> {
        let filter = match &result.suggestion_filter {
            Some(filter) => filter.clone(),
            None => return Ok(()),
        };
        let suggest_started = Instant::now();
        let candidates = result.results.split_off(start);
        let attribute_ids = result.restriction.attribute_ids.clone();
        let mut passed = 0usize;

        for hit in candidates {
            if passed >= stop_after {
                break;
            }
            let entity = match self
                .loader
                .load(result.restriction.type_ref, hit.list_id, hit.id)
            {
                Ok(entity) => entity,
                Err(e) if e.is_skippable_load() => continue,
                Err(e) => return Err(e),
            };
            if suggest::entity_matches_prefix(
                &self.registry,
                &entity,
                &filter.prefix,
                attribute_ids.as_deref(),
            ) {
                result.results.push(hit);
                passed += 1;
            }
        }
        result.timings.suggestions += suggest_started.elapsed();
        Ok(())
    }
}

/// Group the cursor tokens for intersection. A single-token query read
/// through several cursors is a suggestion union (one group); everything
/// else intersects token by token.
fn token_groups(result: &SearchResult) -> Vec<Vec<usize>> {
    let token_count = tokenizer::tokenize(&result.query).len();
    if token_count == 1 && result.row_cursors.len() > 1 {
        vec![(0..result.row_cursors.len()).collect()]
    } else {
        (0..result.row_cursors.len()).map(|i| vec![i]).collect()
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
