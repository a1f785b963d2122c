//! Domain types shared by the lexical, vector, fusion and rerank layers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocId = u64;
pub type Meta = BTreeMap<String, serde_json::Value>;

/// A document of the collection. Immutable once ingested; `id` is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl Document {
    /// Text fed to the lexical index: `title + " " + body`.
    pub fn lexical_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }
}

/// A slice of a document that is embedded on its own.
///
/// - `doc_id`: parent document
/// - `chunk_index`/`total_chunks`: position within the parent document
/// - `text`: the payload handed to the embedder (title prefixed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub doc_id: DocId,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub text: String,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Lexical,
    Semantic,
}

/// One entry of a single-source ranked list.
///
/// `rank` is 1-based and only meaningful within the pass that produced it.
/// `score` is engine-specific but higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    pub doc_id: DocId,
    pub rank: usize,
    pub score: f64,
    pub source: SourceKind,
}

/// Where and how a fused document was matched by one source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceMatch {
    pub rank: usize,
    pub score: f64,
    /// Min-max normalized score; only set by the weighted blend.
    pub normalized: Option<f64>,
}

/// A fused result carrying provenance for both sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedHit {
    pub doc_id: DocId,
    pub lexical: Option<SourceMatch>,
    pub semantic: Option<SourceMatch>,
    pub fused_score: f64,
}

impl FusedHit {
    pub fn sources(&self) -> Vec<SourceKind> {
        let mut out = Vec::with_capacity(2);
        if self.lexical.is_some() {
            out.push(SourceKind::Lexical);
        }
        if self.semantic.is_some() {
            out.push(SourceKind::Semantic);
        }
        out
    }
}
