use reelsearch_core::cache::ArtifactStore;
use reelsearch_core::config::{LexicalSettings, MatchMode};
use reelsearch_core::types::{Document, SourceKind};
use reelsearch_core::Error;
use reelsearch_text::index::{DOCMAP_ARTIFACT, NORMALIZER_ARTIFACT, POSTINGS_ARTIFACT};
use reelsearch_text::tantivy_utils::DEFAULT_STOP_WORDS;
use reelsearch_text::{InvertedIndex, LexicalOrder, Normalizer};
use tempfile::TempDir;

fn doc(id: u64, title: &str, body: &str) -> Document {
    Document { id, title: title.to_string(), body: body.to_string(), metadata: Default::default() }
}

fn toy_collection() -> Vec<Document> {
    vec![
        doc(1, "Star Voyage", "A space adventure across the galaxy."),
        doc(2, "Orbit", "Life aboard a space station."),
        doc(3, "Farm Days", "A quiet story about a farmer."),
    ]
}

fn build(mode: MatchMode) -> InvertedIndex {
    let settings = LexicalSettings { match_mode: mode, ..LexicalSettings::default() };
    InvertedIndex::build(Normalizer::default(), settings, &toy_collection())
}

#[test]
fn search_ranks_documents_matching_more_terms_first() {
    let index = build(MatchMode::Exact);
    let hits = index.search("space adventure", 10).expect("search");
    let ids: Vec<u64> = hits.iter().map(|h| h.doc_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(hits[0].rank, 1);
    assert_eq!(hits[1].rank, 2);
    assert!(hits[0].score > hits[1].score);
    assert!(hits.iter().all(|h| h.source == SourceKind::Lexical));
}

#[test]
fn search_respects_limit_and_blank_queries() {
    let index = build(MatchMode::Exact);
    assert_eq!(index.search("space adventure", 1).unwrap().len(), 1);
    assert!(index.search("space", 0).unwrap().is_empty());
    assert!(index.search("the of and", 5).unwrap().is_empty(), "stopword-only query matches nothing");
    assert!(matches!(index.search("   ", 5), Err(Error::EmptyInput(_))));
}

#[test]
fn doc_id_order_ignores_scores() {
    let index = build(MatchMode::Exact);
    let hits = index.search_ordered("space adventure farmer", 10, LexicalOrder::DocId).unwrap();
    let ids: Vec<u64> = hits.iter().map(|h| h.doc_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn substring_mode_matches_inside_document_tokens() {
    let exact = build(MatchMode::Exact);
    let substring = build(MatchMode::Substring);
    assert!(exact.search("sta", 10).unwrap().is_empty());
    let ids: Vec<u64> = substring.search_ordered("sta", 10, LexicalOrder::DocId).unwrap().iter().map(|h| h.doc_id).collect();
    // "star" in doc 1 and "station" in doc 2
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn get_documents_single_term_lookup() {
    let index = build(MatchMode::Exact);
    assert_eq!(index.get_documents("Space").unwrap(), vec![1, 2]);
    assert!(matches!(index.get_documents("zebra"), Err(Error::NotFound(_))));
    assert!(matches!(index.get_documents("the"), Err(Error::NotFound(_))));
    assert!(matches!(index.get_documents(""), Err(Error::EmptyInput(_))));
    assert!(matches!(index.get_documents("space station"), Err(Error::InvalidArgument(_))));
}

#[test]
fn postings_hold_every_token_of_every_document() {
    let index = build(MatchMode::Exact);
    let normalizer = Normalizer::default();
    for d in toy_collection() {
        for token in normalizer.normalize(&d.lexical_text()) {
            assert!(index.get_documents(&token).unwrap().contains(&d.id), "{token} missing doc {}", d.id);
        }
    }
    assert_eq!(index.len(), 3);
}

#[test]
fn save_load_round_trips_byte_identically() {
    let tmp = TempDir::new().unwrap();
    let first = ArtifactStore::new(tmp.path().join("a"));
    let second = ArtifactStore::new(tmp.path().join("b"));

    let index = build(MatchMode::Exact);
    index.save(&first).expect("save");
    let loaded = InvertedIndex::load(Normalizer::default(), LexicalSettings::default(), &first).expect("load");
    loaded.save(&second).expect("save again");

    for name in [POSTINGS_ARTIFACT, DOCMAP_ARTIFACT, NORMALIZER_ARTIFACT] {
        let a = std::fs::read(first.path(name)).unwrap();
        let b = std::fs::read(second.path(name)).unwrap();
        assert_eq!(a, b, "{name} differs after round trip");
    }
    assert_eq!(loaded.search("space adventure", 5).unwrap(), index.search("space adventure", 5).unwrap());
}

#[test]
fn load_without_artifacts_is_not_ready() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    let err = InvertedIndex::load(Normalizer::default(), LexicalSettings::default(), &store).unwrap_err();
    assert!(matches!(err, Error::IndexNotReady(_)));
}

#[test]
fn load_or_build_rebuilds_when_collection_changes() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    let docs = toy_collection();

    let built = InvertedIndex::load_or_build(Normalizer::default(), LexicalSettings::default(), &store, &docs).unwrap();
    assert!(store.exists(POSTINGS_ARTIFACT) && store.exists(DOCMAP_ARTIFACT));
    assert_eq!(built.len(), 3);

    let mut changed = docs.clone();
    changed.push(doc(4, "Nebula", "Pirates in space."));
    let rebuilt = InvertedIndex::load_or_build(Normalizer::default(), LexicalSettings::default(), &store, &changed).unwrap();
    assert_eq!(rebuilt.len(), 4);
    assert_eq!(rebuilt.get_documents("pirates").unwrap(), vec![4]);

    let reloaded = InvertedIndex::load(Normalizer::default(), LexicalSettings::default(), &store).unwrap();
    assert_eq!(reloaded.len(), 4, "rebuilt artifacts were written back");
}

#[test]
fn load_or_build_recovers_from_corrupt_artifacts() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    std::fs::write(store.path(POSTINGS_ARTIFACT), b"garbage").unwrap();
    std::fs::write(store.path(DOCMAP_ARTIFACT), b"garbage").unwrap();
    let index = InvertedIndex::load_or_build(Normalizer::default(), LexicalSettings::default(), &store, &toy_collection()).unwrap();
    assert_eq!(index.len(), 3);
}


#[test]
fn load_or_build_rebuilds_when_stopwords_change() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    let docs = toy_collection();

    let first = InvertedIndex::load_or_build(Normalizer::default(), LexicalSettings::default(), &store, &docs).unwrap();
    assert_eq!(first.get_documents("spaces").unwrap(), vec![1, 2]);

    let stricter = Normalizer::new(DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).chain(["space".to_string()]));
    let err = InvertedIndex::load(stricter.clone(), LexicalSettings::default(), &store).unwrap_err();
    assert!(matches!(err, Error::StaleCache(_)));

    let rebuilt = InvertedIndex::load_or_build(stricter.clone(), LexicalSettings::default(), &store, &docs).unwrap();
    let fresh = InvertedIndex::build(stricter.clone(), LexicalSettings::default(), &docs);
    assert_eq!(rebuilt.token_count(), fresh.token_count());
    assert!(rebuilt.token_count() < first.token_count());
    assert!(matches!(rebuilt.get_documents("adventure"), Ok(ids) if ids == vec![1]));
    // "spaces" still stems to "space", which is no longer indexed
    assert!(matches!(rebuilt.get_documents("spaces"), Err(Error::NotFound(_))));

    let reloaded = InvertedIndex::load(stricter, LexicalSettings::default(), &store).expect("new stamp written back");
    assert_eq!(reloaded.token_count(), fresh.token_count());
}

#[test]
fn normalizer_identity_ignores_stopword_order_and_case() {
    let a = Normalizer::new(["Space".to_string(), "farm".to_string()]);
    let b = Normalizer::new(["farm".to_string(), "space ".to_string()]);
    assert_eq!(a.identity(), b.identity());
    assert_ne!(a.identity(), Normalizer::default().identity());
}
