//! Tokenizer/normalizer shared by indexing and querying.
//!
//! Steps, in order: lowercase, strip ASCII punctuation, deduplicate the raw
//! words, drop stopwords, stem. Because deduplication happens on the raw word
//! set, within-document term frequency is gone before any scoring happens.

use std::collections::BTreeSet;
use std::path::Path;
use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use reelsearch_core::Result;

use crate::tantivy_utils::{build_analyzer, DEFAULT_STOP_WORDS, STEMMER_LANGUAGE};

#[derive(Clone)]
pub struct Normalizer {
    analyzer: TextAnalyzer,
    identity: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()))
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer").field("identity", &self.identity).finish_non_exhaustive()
    }
}

impl Normalizer {
    pub fn new<I>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let words: BTreeSet<String> = stop_words.into_iter().map(|w| w.trim().to_lowercase()).filter(|w| !w.is_empty()).collect();
        let mut hasher = blake3::Hasher::new();
        for w in &words {
            hasher.update(w.as_bytes());
            hasher.update(b"\n");
        }
        let identity = format!("{STEMMER_LANGUAGE}:{}", hasher.finalize().to_hex());
        Self { analyzer: build_analyzer(words), identity }
    }

    /// Digest of the stopword set and stemmer language. Two normalizers with
    /// the same identity produce the same tokens for any input.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// One stopword per line; blank lines ignored.
    pub fn from_stopwords_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::new(raw.lines().map(str::to_string)))
    }

    /// Unique normalized tokens of `text`, in sorted order.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let stripped: String = lowered.chars().filter(|c| !c.is_ascii_punctuation()).collect();
        let words: BTreeSet<&str> = stripped.split_whitespace().collect();

        let mut analyzer = self.analyzer.clone();
        let mut tokens = BTreeSet::new();
        for word in words {
            let mut stream = analyzer.token_stream(word);
            while stream.advance() {
                let text = &stream.token().text;
                if !text.is_empty() {
                    tokens.insert(text.clone());
                }
            }
        }
        tokens.into_iter().collect()
    }
}
