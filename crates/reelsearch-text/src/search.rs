use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use reelsearch_core::config::MatchMode;
use reelsearch_core::types::{DocId, ScoredHit, SourceKind};
use reelsearch_core::{Error, Result};

use crate::index::InvertedIndex;

/// Ordering of a lexical result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LexicalOrder {
    /// Descending score, ties by ascending id.
    #[default]
    Score,
    /// Ascending id regardless of score.
    DocId,
}

/// BM25 inverse document frequency; always positive.
pub fn bm25_idf(total_docs: f64, doc_freq: usize) -> f64 {
    let df = doc_freq as f64;
    ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// BM25 term component with the term frequency pinned to 1.
pub fn bm25_tf(doc_len: usize, avg_doc_len: f64, k1: f64, b: f64) -> f64 {
    let avg = if avg_doc_len > 0.0 { avg_doc_len } else { 1.0 };
    (k1 + 1.0) / (1.0 + k1 * (1.0 - b + b * doc_len as f64 / avg))
}

impl InvertedIndex {
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredHit>> {
        self.search_ordered(query, limit, LexicalOrder::Score)
    }

    pub fn search_ordered(&self, query: &str, limit: usize, order: LexicalOrder) -> Result<Vec<ScoredHit>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyInput("query is blank".into()));
        }
        let query_tokens = self.normalizer.normalize(query);
        if limit == 0 || query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let total_docs = self.docmap.len() as f64;
        let mut scores: BTreeMap<DocId, f64> = BTreeMap::new();
        for token in &query_tokens {
            let matched = self.matching_docs(token);
            if matched.is_empty() { continue; }
            let idf = bm25_idf(total_docs, matched.len());
            for id in matched {
                let doc_len = self.doc_lengths.get(&id).copied().unwrap_or(0);
                *scores.entry(id).or_default() += idf * bm25_tf(doc_len, self.avg_doc_len, self.settings.k1, self.settings.b);
            }
        }

        // BTreeMap iteration is ascending by id; the stable sort keeps that for ties.
        let mut ranked: Vec<(DocId, f64)> = scores.into_iter().collect();
        if order == LexicalOrder::Score {
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        ranked.truncate(limit);
        debug!(query, tokens = query_tokens.len(), hits = ranked.len(), "lexical search");

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(i, (doc_id, score))| ScoredHit { doc_id, rank: i + 1, score, source: SourceKind::Lexical })
            .collect())
    }

    fn matching_docs(&self, token: &str) -> BTreeSet<DocId> {
        match self.settings.match_mode {
            MatchMode::Exact => self.postings.get(token).cloned().unwrap_or_default(),
            MatchMode::Substring => self
                .postings
                .iter()
                .filter(|(doc_token, _)| doc_token.contains(token))
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect(),
        }
    }
}
