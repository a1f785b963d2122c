use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::{DocId, Document, DocumentChunk, Meta};

#[derive(Deserialize)]
struct RawCollection {
    movies: Vec<RawMovie>,
}

#[derive(Deserialize)]
struct RawMovie {
    id: DocId,
    title: String,
    description: String,
    #[serde(flatten)]
    extra: Meta,
}

/// Load a `{ "movies": [{ id, title, description, .. }] }` collection from disk.
pub fn load_collection(path: &Path) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::NotFound(format!("collection {}: {e}", path.display())))?;
    let docs = parse_collection(&raw)?;
    info!(path = %path.display(), documents = docs.len(), "loaded collection");
    Ok(docs)
}

/// Parse the collection JSON. Fields other than id/title/description land in `metadata`.
pub fn parse_collection(json: &str) -> Result<Vec<Document>> {
    let raw: RawCollection = serde_json::from_str(json)?;
    Ok(raw
        .movies
        .into_iter()
        .map(|m| Document { id: m.id, title: m.title, body: m.description, metadata: m.extra })
        .collect())
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_words: 150, overlap_words: 30 }
    }
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_chunking(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Chunk every document, in collection order.
    pub fn chunk_collection(&self, docs: &[Document]) -> Vec<DocumentChunk> {
        docs.iter().flat_map(|d| self.chunk_document(d)).collect()
    }

    /// Short bodies become a single chunk; long ones are split into overlapping
    /// word windows. Every chunk is prefixed with the title.
    pub fn chunk_document(&self, doc: &Document) -> Vec<DocumentChunk> {
        let word_count = doc.body.split_whitespace().count();
        let bodies = if word_count <= self.chunking_config.max_words {
            vec![doc.body.trim().to_string()]
        } else {
            self.split_with_overlap(&doc.body)
        };
        let total_chunks = bodies.len();
        bodies
            .into_iter()
            .enumerate()
            .map(|(chunk_index, body)| DocumentChunk {
                doc_id: doc.id,
                chunk_index,
                total_chunks,
                text: format!("{}: {}", doc.title, body),
            })
            .collect()
    }

    fn split_with_overlap(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let words_per_chunk = self.chunking_config.max_words.max(1);
        let overlap_words = self.chunking_config.overlap_words.min(words_per_chunk - 1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        chunks
    }
}
