use std::sync::Arc;

use reelsearch_core::cache::{ArtifactStore, CollectionFingerprint, Published};
use reelsearch_core::config::{expand_path, Config, MatchMode, OmittedPolicy, Settings, DEFAULT_RRF_K};
use reelsearch_core::data_processor::{parse_collection, ChunkingConfig, DataProcessor};
use reelsearch_core::types::Document;
use reelsearch_core::Error;
use tempfile::TempDir;

fn doc(id: u64, title: &str, body: &str) -> Document {
    Document { id, title: title.to_string(), body: body.to_string(), metadata: Default::default() }
}

#[test]
fn parse_collection_keeps_extra_fields_as_metadata() {
    let json = r#"{"movies": [
        {"id": 7, "title": "Moon", "description": "A lonely miner.", "year": 2009},
        {"id": 3, "title": "Alien", "description": "Space horror."}
    ]}"#;
    let docs = parse_collection(json).expect("parse");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, 7);
    assert_eq!(docs[0].body, "A lonely miner.");
    assert_eq!(docs[0].metadata.get("year"), Some(&serde_json::json!(2009)));
    assert!(docs[1].metadata.is_empty());
}

#[test]
fn parse_collection_rejects_missing_movies_key() {
    let err = parse_collection(r#"{"films": []}"#).unwrap_err();
    assert!(matches!(err, Error::Serde(_)));
}

#[test]
fn short_document_becomes_one_chunk() {
    let processor = DataProcessor::new();
    let chunks = processor.chunk_document(&doc(1, "Heat", "Cops and robbers."));
    assert_eq!(chunks.len(), 1, "one small body becomes one chunk");
    assert_eq!(chunks[0].text, "Heat: Cops and robbers.");
    assert_eq!(chunks[0].total_chunks, 1);
}

#[test]
fn long_document_is_split_with_overlap() {
    let body = (0..25).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let processor = DataProcessor::with_chunking(ChunkingConfig { max_words: 10, overlap_words: 2 });
    let chunks = processor.chunk_document(&doc(9, "T", &body));

    assert_eq!(chunks.len(), 3);
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.doc_id, 9);
        assert_eq!(c.chunk_index, i);
        assert_eq!(c.total_chunks, 3);
        assert!(c.text.starts_with("T: "));
    }
    // second window starts two words before the first one ended
    assert!(chunks[1].text.starts_with("T: w8 w9 w10"));
    assert!(chunks[2].text.ends_with("w24"));
}

#[test]
fn fingerprint_tracks_content_not_just_size() {
    let a = vec![doc(1, "A", "alpha"), doc(2, "B", "bravo")];
    let mut b = a.clone();
    b[1].body = "charlie".to_string();

    let fa = CollectionFingerprint::of(&a);
    let fb = CollectionFingerprint::of(&b);
    assert_eq!(fa.doc_count, fb.doc_count);
    assert_ne!(fa, fb);
    assert_eq!(fa, CollectionFingerprint::of(&a.clone()));
}

#[test]
fn artifact_store_round_trip_and_missing() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path().join("nested/cache"));
    assert!(store.read_json::<Vec<u32>>("missing.json").unwrap().is_none());

    store.write_json("nums.json", &vec![1u32, 2, 3]).expect("write");
    assert!(store.exists("nums.json"));
    let back: Vec<u32> = store.read_json("nums.json").unwrap().expect("present");
    assert_eq!(back, vec![1, 2, 3]);

    // no temporary files are left behind
    let entries = std::fs::read_dir(store.dir()).unwrap().count();
    assert_eq!(entries, 1);

    store.remove("nums.json").unwrap();
    store.remove("nums.json").expect("removing twice is fine");
}

#[test]
fn corrupt_artifact_reads_as_stale() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    std::fs::write(store.path("bad.json"), b"{not json").unwrap();
    let err = store.read_json::<Vec<u32>>("bad.json").unwrap_err();
    assert!(matches!(err, Error::StaleCache(_)));
}

#[test]
fn published_slot_reports_not_ready_then_swaps() {
    let slot: Published<Vec<u32>> = Published::empty("test index");
    assert!(matches!(slot.get(), Err(Error::IndexNotReady(_))));

    slot.publish(vec![1]);
    let first = slot.get().unwrap();
    slot.publish(vec![2]);
    let second = slot.get().unwrap();

    assert_eq!(*first, vec![1], "old readers keep their snapshot");
    assert_eq!(*second, vec![2]);
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn default_settings_are_valid() {
    let s = Settings::default();
    s.validate().expect("defaults validate");
    assert_eq!(s.fusion.rrf_k, DEFAULT_RRF_K);
    assert_eq!(DEFAULT_RRF_K, 60);
    assert_eq!(s.fusion.overfetch_factor, 500);
    assert_eq!(s.lexical.match_mode, MatchMode::Exact);
    assert_eq!(s.rerank.listwise_omitted, OmittedPolicy::Drop);
}

#[test]
fn invalid_settings_are_rejected() {
    let mut s = Settings::default();
    s.vector.chunk_overlap = s.vector.chunk_words;
    assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));

    let mut s = Settings::default();
    s.fusion.overfetch_factor = 0;
    assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn config_layers_file_env_and_env_vars() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file(
            "config.toml",
            r#"
            [fusion]
            rrf_k = 10
            [lexical]
            match_mode = "substring"
            "#,
        )?;
        jail.create_file("config.test.toml", "[fusion]\ndefault_limit = 7\n")?;
        jail.set_env("APP_FUSION__RRF_K", "30");

        let settings = Config::load().and_then(|c| c.settings()).map_err(|e| e.to_string())?;
        assert_eq!(settings.fusion.rrf_k, 30, "env beats file");
        assert_eq!(settings.fusion.default_limit, 7, "env-specific file applied");
        assert_eq!(settings.lexical.match_mode, MatchMode::Substring);
        assert_eq!(settings.fusion.overfetch_factor, 500, "untouched keys keep defaults");
        Ok(())
    });
}

#[test]
fn data_paths_expand_environment_variables() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("REELSEARCH_TEST_HOME", "/srv/reels");
        jail.set_env("APP_DATA__CACHE_DIR", "${REELSEARCH_TEST_HOME}/cache");
        let settings = Config::load().and_then(|c| c.settings()).map_err(|e| e.to_string())?;
        assert_eq!(settings.data.cache_dir(), std::path::PathBuf::from("/srv/reels/cache"));
        assert_eq!(settings.data.stopwords_path(), None);
        assert_eq!(expand_path("relative/movies.json"), std::path::PathBuf::from("relative/movies.json"));
        Ok(())
    });
}
