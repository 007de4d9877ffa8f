//! End-to-end pipeline tests over seeded encrypted stores.

mod common;

use common::{result_ids, TestBed, BODY, SUBJECT};
use maildex_core::{EntityId, ListId, SearchError, SearchRestriction, TypeRef};
use maildex_engine::testing::posting;

const LIST: ListId = ListId(7);

/// Seed the S1 postings: `alpha` on {100, 90, 80}, `beta` on {100, 80, 70}.
fn seed_two_terms(bed: &mut TestBed) {
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[posting(100, 1, &[3]), posting(90, 1, &[0]), posting(80, 1, &[2])],
    );
    bed.fixture.add_chunk(
        "beta",
        TypeRef::MAIL,
        &[posting(100, 1, &[4]), posting(80, 1, &[7]), posting(70, 1, &[0])],
    );
    for id in [70, 80, 90, 100] {
        bed.fixture.put_element(EntityId(id), LIST);
    }
}

#[test]
fn test_and_intersection_two_terms() {
    let mut bed = TestBed::new();
    seed_two_terms(&mut bed);

    let result = bed
        .engine()
        .search("alpha beta", SearchRestriction::new(TypeRef::MAIL), 0, Some(10))
        .unwrap();

    assert_eq!(result_ids(&result), vec![100, 80]);
    assert!(result.results.iter().all(|h| h.list_id == LIST));
    assert!(!result.match_word_order);
}

#[test]
fn test_phrase_mode_drops_non_consecutive() {
    let mut bed = TestBed::new();
    seed_two_terms(&mut bed);

    // id 100 has alpha@3 / beta@4 (consecutive), id 80 alpha@2 / beta@7
    let result = bed
        .engine()
        .search("\"alpha beta\"", SearchRestriction::new(TypeRef::MAIL), 0, Some(10))
        .unwrap();

    assert!(result.match_word_order);
    assert_eq!(result_ids(&result), vec![100]);
}

#[test]
fn test_phrase_results_are_subset_of_and_results() {
    let mut bed = TestBed::new();
    seed_two_terms(&mut bed);
    let engine = bed.engine();

    let loose = engine
        .search("alpha beta", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    let strict = engine
        .search("\"alpha beta\"", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();

    for id in result_ids(&strict) {
        assert!(result_ids(&loose).contains(&id));
    }
}

#[test]
fn test_phrase_does_not_cross_attributes() {
    let mut bed = TestBed::new();
    // "alpha" ends the subject, "beta" starts the body; positions align
    // but in different attributes.
    bed.fixture
        .add_chunk("alpha", TypeRef::MAIL, &[posting(100, SUBJECT.0, &[3])]);
    bed.fixture
        .add_chunk("beta", TypeRef::MAIL, &[posting(100, BODY.0, &[4])]);
    bed.fixture.put_element(EntityId(100), LIST);
    let engine = bed.engine();

    let loose = engine
        .search("alpha beta", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(result_ids(&loose), vec![100]);

    let strict = engine
        .search("\"alpha beta\"", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert!(strict.results.is_empty());
}

#[test]
fn test_token_order_does_not_matter_without_quotes() {
    let mut bed = TestBed::new();
    seed_two_terms(&mut bed);
    let engine = bed.engine();

    let ab = engine
        .search("alpha beta", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    let ba = engine
        .search("beta alpha", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(result_ids(&ab), result_ids(&ba));
}

#[test]
fn test_repeated_search_is_deterministic() {
    let mut bed = TestBed::new();
    seed_two_terms(&mut bed);
    let engine = bed.engine();

    let first = engine
        .search("alpha beta", SearchRestriction::new(TypeRef::MAIL), 0, Some(10))
        .unwrap();
    let second = engine
        .search("alpha beta", SearchRestriction::new(TypeRef::MAIL), 0, Some(10))
        .unwrap();
    assert_eq!(result_ids(&first), result_ids(&second));
}

#[test]
fn test_pagination_resumes_from_parked_entries() {
    let mut bed = TestBed::new();
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[posting(100, 1, &[0]), posting(90, 1, &[0]), posting(80, 1, &[0])],
    );
    for id in [80, 90, 100] {
        bed.fixture.put_element(EntityId(id), LIST);
    }
    let engine = bed.engine();

    let mut result = engine
        .search("alpha", SearchRestriction::new(TypeRef::MAIL), 0, Some(2))
        .unwrap();
    assert_eq!(result_ids(&result), vec![100, 90]);
    assert_eq!(result.more_results.len(), 1);

    engine.get_more_results(&mut result, 2).unwrap();
    assert_eq!(result_ids(&result), vec![100, 90, 80]);
    assert!(result.more_results.is_empty());
}

#[test]
fn test_pagination_concatenation_matches_unbounded_search() {
    let mut bed = TestBed::new();
    // Spread postings over many chunks so pages really advance cursors.
    for id in 1..=15u64 {
        bed.fixture
            .add_chunk("alpha", TypeRef::MAIL, &[posting(id * 10, 1, &[0])]);
        bed.fixture.put_element(EntityId(id * 10), LIST);
    }
    let engine = bed.engine();

    let full = engine
        .search("alpha", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(full.results.len(), 15);

    let mut paged = engine
        .search("alpha", SearchRestriction::new(TypeRef::MAIL), 0, Some(4))
        .unwrap();
    for _ in 0..6 {
        engine.get_more_results(&mut paged, 4).unwrap();
    }

    assert_eq!(result_ids(&paged), result_ids(&full));

    // Strictly decreasing, no duplicates
    let ids = result_ids(&paged);
    for pair in ids.windows(2) {
        assert!(pair[0] > pair[1]);
    }
}

#[test]
fn test_intersection_across_chunk_batches() {
    let mut bed = TestBed::new();
    // alpha sees id 500 right away; beta's newer chunk is so large that
    // the per-page entry budget forces its older chunk (holding id 500)
    // into a later batch. The match must survive that gap: alpha's
    // posting stays pending until beta catches up.
    bed.fixture
        .add_chunk_with_key("alpha", TypeRef::MAIL, 100, &[posting(500, 1, &[0])]);

    let bulk: Vec<_> = (0..1_000).map(|i| posting(10_000 + i, 1, &[0])).collect();
    bed.fixture
        .add_chunk_with_key("beta", TypeRef::MAIL, 90, &bulk);
    bed.fixture
        .add_chunk_with_key("beta", TypeRef::MAIL, 10, &[posting(500, 1, &[1])]);
    bed.fixture.put_element(EntityId(500), LIST);

    let result = bed
        .engine()
        .search("alpha beta", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(result_ids(&result), vec![500]);

    // beta's cursor had to step through both batches
    let beta = result
        .row_cursors
        .iter()
        .find(|c| c.term == "beta")
        .unwrap();
    assert_eq!(beta.last_read_chunk_key, Some(10));
    assert!(beta.exhausted);
}

#[test]
fn test_time_window_excludes_older_ids() {
    let mut bed = TestBed::new();
    let ids = [
        EntityId::from_parts(1_000, 1),
        EntityId::from_parts(2_000, 1),
        EntityId::from_parts(3_000, 1),
    ];
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[
            posting(ids[0].0, 1, &[0]),
            posting(ids[1].0, 1, &[0]),
            posting(ids[2].0, 1, &[0]),
        ],
    );
    for id in ids {
        bed.fixture.put_element(id, LIST);
    }

    let restriction = SearchRestriction::new(TypeRef::MAIL).with_end(2_000);
    let result = bed.engine().search("alpha", restriction, 0, None).unwrap();

    // Everything created before the older edge is excluded
    assert_eq!(result_ids(&result), vec![ids[2].0, ids[1].0]);
}

#[test]
fn test_time_window_start_is_inclusive() {
    let mut bed = TestBed::new();
    let inside = EntityId::from_parts(2_000, 7);
    let outside = EntityId::from_parts(2_001, 0);
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[posting(inside.0, 1, &[0]), posting(outside.0, 1, &[0])],
    );
    bed.fixture.put_element(inside, LIST);
    bed.fixture.put_element(outside, LIST);

    let restriction = SearchRestriction::new(TypeRef::MAIL)
        .with_start(2_000)
        .with_end(1_000);
    let result = bed.engine().search("alpha", restriction, 0, None).unwrap();
    assert_eq!(result_ids(&result), vec![inside.0]);
}

#[test]
fn test_attribute_whitelist() {
    let mut bed = TestBed::new();
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[posting(100, SUBJECT.0, &[0]), posting(90, BODY.0, &[0])],
    );
    bed.fixture.put_element(EntityId(100), LIST);
    bed.fixture.put_element(EntityId(90), LIST);

    let restriction =
        SearchRestriction::new(TypeRef::MAIL).with_attributes(vec![SUBJECT]);
    let result = bed.engine().search("alpha", restriction, 0, None).unwrap();
    assert_eq!(result_ids(&result), vec![100]);
}

#[test]
fn test_list_restriction() {
    let mut bed = TestBed::new();
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[posting(100, 1, &[0]), posting(90, 1, &[0])],
    );
    bed.fixture.put_element(EntityId(100), ListId(1));
    bed.fixture.put_element(EntityId(90), ListId(2));

    let restriction = SearchRestriction::new(TypeRef::MAIL).with_list(ListId(2));
    let result = bed.engine().search("alpha", restriction, 0, None).unwrap();
    assert_eq!(result_ids(&result), vec![90]);
}

#[test]
fn test_type_filter_on_chunk_descriptors() {
    let mut bed = TestBed::new();
    // The same term posts for mail and contacts; a mail search must not
    // surface the contact chunk.
    bed.fixture
        .add_chunk("alpha", TypeRef::MAIL, &[posting(100, 1, &[0])]);
    bed.fixture
        .add_chunk("alpha", TypeRef::CONTACT, &[posting(200, 1, &[0])]);
    bed.fixture.put_element(EntityId(100), LIST);
    bed.fixture.put_element(EntityId(200), LIST);

    let result = bed
        .engine()
        .search("alpha", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(result_ids(&result), vec![100]);
}

#[test]
fn test_empty_query_returns_empty_result() {
    let bed = TestBed::new();
    let engine = bed.engine();

    let mut result = engine
        .search("  \t ", SearchRestriction::new(TypeRef::MAIL), 0, Some(10))
        .unwrap();
    assert!(result.results.is_empty());
    assert!(result.row_cursors.is_empty());

    // Paging an empty-query result stays a no-op
    engine.get_more_results(&mut result, 10).unwrap();
    assert!(result.results.is_empty());
}

#[test]
fn test_unknown_term_yields_no_results() {
    let mut bed = TestBed::new();
    bed.fixture
        .add_chunk("alpha", TypeRef::MAIL, &[posting(100, 1, &[0])]);
    bed.fixture.put_element(EntityId(100), LIST);

    let result = bed
        .engine()
        .search("missing", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert!(result.results.is_empty());

    // An AND with an unknown term is empty too
    let result = bed
        .engine()
        .search("alpha missing", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert!(result.results.is_empty());
}

#[test]
fn test_deleted_element_data_is_skipped() {
    let mut bed = TestBed::new();
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[posting(100, 1, &[0]), posting(90, 1, &[0])],
    );
    bed.fixture.put_element(EntityId(100), LIST);
    bed.fixture.put_element(EntityId(90), LIST);
    bed.fixture.remove_element(EntityId(100));

    let result = bed
        .engine()
        .search("alpha", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(result_ids(&result), vec![90]);
}

#[test]
fn test_mangled_chunk_aborts_page_with_corruption() {
    let mut bed = TestBed::new();
    let key = bed
        .fixture
        .add_chunk("alpha", TypeRef::MAIL, &[posting(100, 1, &[0])]);
    bed.fixture.put_element(EntityId(100), LIST);

    // Overwrite the chunk with bytes that cannot frame
    bed.fixture
        .store()
        .put(
            maildex_store::ObjectStore::SearchIndex,
            maildex_store::StoreKey::U64(key),
            vec![0xFF; 9],
        )
        .unwrap();

    let err = bed
        .engine()
        .search("alpha", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap_err();
    assert!(matches!(err, SearchError::Corruption(_)));
}

#[test]
fn test_duplicate_attribute_postings_deduplicate_by_id() {
    let mut bed = TestBed::new();
    // The same id matched in subject and body must appear once.
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[
            posting(100, SUBJECT.0, &[0]),
            posting(100, BODY.0, &[5]),
        ],
    );
    bed.fixture.put_element(EntityId(100), LIST);

    let result = bed
        .engine()
        .search("alpha", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(result_ids(&result), vec![100]);
}

#[test]
fn test_indexed_document_roundtrip() {
    let mut bed = TestBed::new();
    bed.fixture.index_document(
        TypeRef::MAIL,
        LIST,
        EntityId(4_200),
        &[(SUBJECT, "Quarterly invoice enclosed"), (BODY, "please find the invoice attached")],
    );
    let engine = bed.engine();

    let by_subject = engine
        .search("quarterly invoice", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(result_ids(&by_subject), vec![4_200]);

    let phrase = engine
        .search("\"invoice attached\"", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert_eq!(result_ids(&phrase), vec![4_200]);

    let wrong_phrase = engine
        .search("\"attached invoice\"", SearchRestriction::new(TypeRef::MAIL), 0, None)
        .unwrap();
    assert!(wrong_phrase.results.is_empty());
}

#[test]
fn test_attribute_mismatch_leaves_id_open_for_other_attribute() {
    let mut bed = TestBed::new();
    // In the whitelisted subject, alpha and beta both occur for id 100;
    // id 90 only matches beta through its body.
    bed.fixture.add_chunk(
        "alpha",
        TypeRef::MAIL,
        &[posting(100, SUBJECT.0, &[0]), posting(90, SUBJECT.0, &[0])],
    );
    bed.fixture.add_chunk(
        "beta",
        TypeRef::MAIL,
        &[posting(100, SUBJECT.0, &[1]), posting(90, BODY.0, &[1])],
    );
    bed.fixture.put_element(EntityId(100), LIST);
    bed.fixture.put_element(EntityId(90), LIST);

    let restriction =
        SearchRestriction::new(TypeRef::MAIL).with_attributes(vec![SUBJECT]);
    let result = bed.engine().search("alpha beta", restriction, 0, None).unwrap();
    assert_eq!(result_ids(&result), vec![100]);
}
