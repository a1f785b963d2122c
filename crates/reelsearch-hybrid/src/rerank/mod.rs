//! Second-pass reordering of a fused candidate list.
//!
//! The set of strategies is closed: [`RerankStrategy`] parses from the names
//! the CLI accepts and anything else is `UnknownStrategy`. Every strategy is a
//! stateless `candidates -> judge -> reordered subset` transform; a judge
//! failure fails the whole call and never returns a partially scored list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reelsearch_core::config::RerankSettings;
use reelsearch_core::traits::{CrossEncoder, RelevanceJudge};
use reelsearch_core::types::{DocId, Document, FusedHit};
use reelsearch_core::{Error, Result};

pub mod cross;
pub mod listwise;
pub mod pointwise;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankStrategy {
    /// One judge call per candidate, 0-10 score each.
    Pointwise,
    /// One judge call ordering all candidates by id.
    Listwise,
    /// Local cross-encoder over `(query, candidate)` pairs.
    CrossEncoder,
}

impl FromStr for RerankStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pointwise" | "individual" => Ok(Self::Pointwise),
            "listwise" | "batch" => Ok(Self::Listwise),
            "cross_encoder" | "cross-encoder" => Ok(Self::CrossEncoder),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for RerankStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pointwise => "pointwise",
            Self::Listwise => "listwise",
            Self::CrossEncoder => "cross_encoder",
        })
    }
}

/// A fused hit together with the document text the judges read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub fused: FusedHit,
    pub document: Document,
}

impl Candidate {
    pub fn doc_id(&self) -> DocId {
        self.fused.doc_id
    }

    /// `title - body`, the text judged against the query.
    pub fn judged_text(&self) -> String {
        format!("{} - {}", self.document.title, self.document.body)
    }
}

/// What placed a candidate where it is in the reranked list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RerankSignal {
    Pointwise(u8),
    Listwise { rank: usize },
    CrossEncoder(f32),
    /// Kept in fused order without a judgement (listwise `Append`, or a degraded pipeline).
    Unjudged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedHit {
    pub candidate: Candidate,
    pub signal: RerankSignal,
}

impl RerankedHit {
    pub fn doc_id(&self) -> DocId {
        self.candidate.doc_id()
    }

    pub(crate) fn unjudged(candidate: Candidate) -> Self {
        Self { candidate, signal: RerankSignal::Unjudged }
    }
}

/// Dispatches to a strategy with the judges it was constructed with.
#[derive(Clone)]
pub struct Reranker {
    judge: Option<Arc<dyn RelevanceJudge>>,
    cross_encoder: Option<Arc<dyn CrossEncoder>>,
    settings: RerankSettings,
}

impl Reranker {
    pub fn new(settings: RerankSettings) -> Self {
        Self { judge: None, cross_encoder: None, settings }
    }

    pub fn with_judge(mut self, judge: Arc<dyn RelevanceJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_cross_encoder(mut self, encoder: Arc<dyn CrossEncoder>) -> Self {
        self.cross_encoder = Some(encoder);
        self
    }

    pub fn settings(&self) -> &RerankSettings {
        &self.settings
    }

    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        strategy: RerankStrategy,
        limit: usize,
    ) -> Result<Vec<RerankedHit>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyInput("query is blank".into()));
        }
        if candidates.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        match strategy {
            RerankStrategy::Pointwise => {
                pointwise::rerank_pointwise(self.judge()?, query, candidates, &self.settings, limit).await
            }
            RerankStrategy::Listwise => {
                listwise::rerank_listwise(self.judge()?, query, candidates, &self.settings, limit).await
            }
            RerankStrategy::CrossEncoder => {
                let encoder = self
                    .cross_encoder
                    .as_deref()
                    .ok_or_else(|| Error::JudgeUnavailable("no cross-encoder configured".into()))?;
                cross::rerank_cross_encoder(encoder, query, candidates, limit)
            }
        }
    }

    pub(crate) fn judge(&self) -> Result<&dyn RelevanceJudge> {
        self.judge
            .as_deref()
            .ok_or_else(|| Error::JudgeUnavailable("no relevance judge configured".into()))
    }
}
