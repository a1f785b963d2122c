use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use reelsearch_core::cache::ArtifactStore;
use reelsearch_core::config::LexicalSettings;
use reelsearch_core::types::{DocId, Document};
use reelsearch_core::{Error, Result};

use crate::normalize::Normalizer;

pub const POSTINGS_ARTIFACT: &str = "index.json";
pub const DOCMAP_ARTIFACT: &str = "docmap.json";
pub const NORMALIZER_ARTIFACT: &str = "normalizer.json";

pub type Postings = BTreeMap<String, BTreeSet<DocId>>;
pub type DocMap = BTreeMap<DocId, Document>;

/// Token -> document-id postings plus the id -> document map.
///
/// A document id is in a token's postings iff the normalized
/// `title + " " + body` contains that token. Built in one pass and never
/// patched afterwards; a new collection means a new index.
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    pub(crate) normalizer: Normalizer,
    pub(crate) settings: LexicalSettings,
    pub(crate) postings: Postings,
    pub(crate) docmap: DocMap,
    pub(crate) doc_lengths: BTreeMap<DocId, usize>,
    pub(crate) avg_doc_len: f64,
}

impl InvertedIndex {
    pub fn build(normalizer: Normalizer, settings: LexicalSettings, documents: &[Document]) -> Self {
        let mut postings = Postings::new();
        let mut docmap = DocMap::new();
        for doc in documents {
            for token in normalizer.normalize(&doc.lexical_text()) {
                postings.entry(token).or_default().insert(doc.id);
            }
            docmap.insert(doc.id, doc.clone());
        }
        info!(documents = docmap.len(), tokens = postings.len(), "built lexical index");
        Self::from_parts(normalizer, settings, postings, docmap)
    }

    fn from_parts(normalizer: Normalizer, settings: LexicalSettings, postings: Postings, docmap: DocMap) -> Self {
        // tokens are unique per document, so length == number of postings lists holding it
        let mut doc_lengths: BTreeMap<DocId, usize> = docmap.keys().map(|id| (*id, 0)).collect();
        for ids in postings.values() {
            for id in ids {
                *doc_lengths.entry(*id).or_default() += 1;
            }
        }
        let avg_doc_len = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.values().sum::<usize>() as f64 / doc_lengths.len() as f64
        };
        Self { normalizer, settings, postings, docmap, doc_lengths, avg_doc_len }
    }

    pub fn save(&self, store: &ArtifactStore) -> Result<()> {
        store.write_json(POSTINGS_ARTIFACT, &self.postings)?;
        store.write_json(DOCMAP_ARTIFACT, &self.docmap)?;
        store.write_json(NORMALIZER_ARTIFACT, &self.normalizer.identity())?;
        info!(dir = %store.dir().display(), "saved lexical index");
        Ok(())
    }

    /// Fails with `StaleCache` when the artifacts were written by a normalizer
    /// with a different stopword set or stemmer.
    pub fn load(normalizer: Normalizer, settings: LexicalSettings, store: &ArtifactStore) -> Result<Self> {
        let docmap: Option<DocMap> = store.read_json(DOCMAP_ARTIFACT)?;
        let postings: Option<Postings> = store.read_json(POSTINGS_ARTIFACT)?;
        let (Some(postings), Some(docmap)) = (postings, docmap) else {
            return Err(Error::IndexNotReady(format!("lexical artifacts missing under {}", store.dir().display())));
        };
        let built_with: Option<String> = store.read_json(NORMALIZER_ARTIFACT)?;
        match built_with {
            Some(id) if id == normalizer.identity() => Ok(Self::from_parts(normalizer, settings, postings, docmap)),
            Some(id) => Err(Error::StaleCache(format!(
                "postings built by normalizer {id}, current is {}",
                normalizer.identity()
            ))),
            None => Err(Error::StaleCache(format!("{NORMALIZER_ARTIFACT} missing under {}", store.dir().display()))),
        }
    }

    /// Load the cached index if it was built from exactly `documents`,
    /// otherwise rebuild it and write the artifacts back.
    pub fn load_or_build(
        normalizer: Normalizer,
        settings: LexicalSettings,
        store: &ArtifactStore,
        documents: &[Document],
    ) -> Result<Self> {
        match Self::load(normalizer.clone(), settings.clone(), store) {
            Ok(index) => {
                let expected: DocMap = documents.iter().map(|d| (d.id, d.clone())).collect();
                if index.docmap == expected {
                    info!(documents = index.docmap.len(), "loaded lexical index from cache");
                    return Ok(index);
                }
                warn!(cached = index.docmap.len(), current = expected.len(), "lexical cache is stale, rebuilding");
            }
            Err(Error::IndexNotReady(_)) => info!("no lexical cache, building"),
            Err(Error::StaleCache(reason)) => warn!(%reason, "lexical cache unreadable, rebuilding"),
            Err(e) => return Err(e),
        }
        let index = Self::build(normalizer, settings, documents);
        index.save(store)?;
        Ok(index)
    }

    /// Sorted ids of documents containing `term`, which must normalize to one token.
    pub fn get_documents(&self, term: &str) -> Result<Vec<DocId>> {
        if term.trim().is_empty() {
            return Err(Error::EmptyInput("term is blank".into()));
        }
        let tokens = self.normalizer.normalize(term);
        match tokens.as_slice() {
            [] => Err(Error::NotFound(format!("'{term}' normalizes to no token"))),
            [token] => self
                .postings
                .get(token)
                .map(|ids| ids.iter().copied().collect())
                .ok_or_else(|| Error::NotFound(format!("no postings for '{token}'"))),
            many => Err(Error::InvalidArgument(format!("expected a single term, '{term}' yields {} tokens", many.len()))),
        }
    }

    pub fn document(&self, id: DocId) -> Option<&Document> {
        self.docmap.get(&id)
    }

    pub fn len(&self) -> usize {
        self.docmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docmap.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}
