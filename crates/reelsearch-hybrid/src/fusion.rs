//! Result fusion strategies
//!
//! Both strategies take the lexical and the semantic ranked lists of one
//! query and return a single list of [`FusedHit`]s carrying per-source
//! provenance. Fusion never fails on degenerate input: empty lists fuse to
//! an empty list and uniformly scored lists normalize to `1.0`.

use reelsearch_core::types::{DocId, FusedHit, ScoredHit, SourceMatch};
use reelsearch_core::{Error, Result};

/// Min-max scale to `[0, 1]`. All-equal input maps to `1.0` everywhere.
pub fn normalize_scores(scores: &[f64]) -> Vec<f64> {
    let Some(first) = scores.first() else {
        return Vec::new();
    };
    let (min, max) = scores.iter().fold((*first, *first), |(lo, hi), s| (lo.min(*s), hi.max(*s)));
    if max == min {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

/// Reciprocal rank contribution of a 1-based `rank`.
pub fn rrf_score(rank: usize, k: u32) -> f64 {
    1.0 / (f64::from(k) + rank as f64)
}

/// One entry per distinct document in first-seen order: lexical list first,
/// then documents only the semantic list found. Ranks are list positions.
fn merge(lexical: &[ScoredHit], semantic: &[ScoredHit]) -> Vec<FusedHit> {
    let mut fused: Vec<FusedHit> = Vec::with_capacity(lexical.len() + semantic.len());
    let mut slot: std::collections::HashMap<DocId, usize> = std::collections::HashMap::new();

    for (i, hit) in lexical.iter().enumerate() {
        if slot.contains_key(&hit.doc_id) {
            continue;
        }
        slot.insert(hit.doc_id, fused.len());
        fused.push(FusedHit {
            doc_id: hit.doc_id,
            lexical: Some(SourceMatch { rank: i + 1, score: hit.score, normalized: None }),
            semantic: None,
            fused_score: 0.0,
        });
    }
    for (i, hit) in semantic.iter().enumerate() {
        let m = SourceMatch { rank: i + 1, score: hit.score, normalized: None };
        match slot.get(&hit.doc_id) {
            Some(&at) => {
                if fused[at].semantic.is_none() {
                    fused[at].semantic = Some(m);
                }
            }
            None => {
                slot.insert(hit.doc_id, fused.len());
                fused.push(FusedHit { doc_id: hit.doc_id, lexical: None, semantic: Some(m), fused_score: 0.0 });
            }
        }
    }
    fused
}

fn rank_and_truncate(mut fused: Vec<FusedHit>, limit: usize) -> Vec<FusedHit> {
    // stable: equal scores keep first-seen order
    fused.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));
    fused.truncate(limit);
    fused
}

pub fn check_alpha(alpha: f64) -> Result<()> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("alpha must be within [0, 1], got {alpha}")))
    }
}

/// `alpha * lexical_norm + (1 - alpha) * semantic_norm`, a missing side counting as `0.0`.
pub fn fuse_weighted(lexical: &[ScoredHit], semantic: &[ScoredHit], alpha: f64, limit: usize) -> Result<Vec<FusedHit>> {
    check_alpha(alpha)?;
    let lex_norm = normalize_scores(&lexical.iter().map(|h| h.score).collect::<Vec<_>>());
    let sem_norm = normalize_scores(&semantic.iter().map(|h| h.score).collect::<Vec<_>>());

    let mut fused = merge(lexical, semantic);
    for hit in &mut fused {
        if let Some(m) = hit.lexical.as_mut() {
            m.normalized = Some(lex_norm[m.rank - 1]);
        }
        if let Some(m) = hit.semantic.as_mut() {
            m.normalized = Some(sem_norm[m.rank - 1]);
        }
        let l = hit.lexical.and_then(|m| m.normalized).unwrap_or(0.0);
        let s = hit.semantic.and_then(|m| m.normalized).unwrap_or(0.0);
        hit.fused_score = alpha * l + (1.0 - alpha) * s;
    }
    Ok(rank_and_truncate(fused, limit))
}

/// Sum of `1 / (k + rank)` over the lists a document appears in. Raw scores are ignored.
pub fn fuse_rrf(lexical: &[ScoredHit], semantic: &[ScoredHit], k: u32, limit: usize) -> Vec<FusedHit> {
    let mut fused = merge(lexical, semantic);
    for hit in &mut fused {
        hit.fused_score = [hit.lexical, hit.semantic].iter().flatten().map(|m| rrf_score(m.rank, k)).sum();
    }
    rank_and_truncate(fused, limit)
}
