//! reelsearch-hybrid
//!
//! Fusion of lexical and semantic result lists, judge-based reranking, and
//! the [`HybridSearchEngine`] facade exposing the query entry points.

mod engine;
pub mod evaluate;
pub mod fusion;
pub mod judge;
pub mod rerank;

pub use engine::{FusionMethod, HybridSearchEngine, PipelineOutcome};
pub use fusion::{fuse_rrf, fuse_weighted, normalize_scores};
pub use judge::GenerativeJudge;
pub use rerank::{Candidate, RerankSignal, RerankStrategy, RerankedHit, Reranker};
