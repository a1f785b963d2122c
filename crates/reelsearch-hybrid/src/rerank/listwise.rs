use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use reelsearch_core::config::{OmittedPolicy, RerankSettings};
use reelsearch_core::traits::RelevanceJudge;
use reelsearch_core::types::DocId;
use reelsearch_core::{Error, Result};

use super::{Candidate, RerankSignal, RerankedHit};

pub fn listwise_prompt(query: &str, candidates: &[Candidate], snippet_chars: usize) -> String {
    let listing: Vec<String> = candidates
        .iter()
        .map(|c| {
            let snippet: String = c.document.body.chars().take(snippet_chars).collect();
            format!("{}: {} - {}", c.doc_id(), c.document.title, snippet)
        })
        .collect();
    format!(
        "Rank these movies by relevance to the search query.\n\n\
         Query: \"{query}\"\n\n\
         Movies:\n{}\n\n\
         Return ONLY the IDs in order of relevance (best match first). \
         Return a valid JSON list, nothing else. For example:\n\n[75, 12, 34, 2, 1]",
        listing.join("\n")
    )
}

/// Strip an optional markdown code fence around the reply.
fn strip_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag line, e.g. ```json
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// The reply must be a JSON array whose elements are integer ids
/// (numbers or digit strings).
pub fn parse_id_list(reply: &str) -> Result<Vec<DocId>> {
    parse_integer_list(reply)
}

/// JSON array of non-negative integers, possibly fenced.
pub(crate) fn parse_integer_list(reply: &str) -> Result<Vec<u64>> {
    let value: serde_json::Value = serde_json::from_str(strip_fence(reply))
        .map_err(|e| Error::JudgeParse(format!("judge reply is not JSON: {e}")))?;
    let items = value
        .as_array()
        .ok_or_else(|| Error::JudgeParse(format!("judge reply is not a list: {value}")))?;
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .or_else(|| item.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| Error::JudgeParse(format!("judge reply holds a non-integer entry: {item}")))
        })
        .collect()
}

/// Order candidates by the judge's id list. Unknown and repeated ids are
/// ignored; candidates the judge left out are dropped or appended per `policy`.
/// A reply naming none of the candidates is `JudgeParse`.
pub fn apply_ordering(candidates: Vec<Candidate>, ordered_ids: &[DocId], policy: OmittedPolicy) -> Result<Vec<RerankedHit>> {
    let mut by_id: HashMap<DocId, Candidate> = HashMap::with_capacity(candidates.len());
    let fused_order: Vec<DocId> = candidates.iter().map(Candidate::doc_id).collect();
    for c in candidates {
        by_id.entry(c.doc_id()).or_insert(c);
    }

    let mut seen: HashSet<DocId> = HashSet::new();
    let mut out = Vec::with_capacity(by_id.len());
    for id in ordered_ids {
        if !seen.insert(*id) {
            continue;
        }
        match by_id.remove(id) {
            Some(candidate) => {
                let rank = out.len() + 1;
                out.push(RerankedHit { candidate, signal: RerankSignal::Listwise { rank } });
            }
            None => debug!(doc_id = id, "judge returned an id outside the candidate set"),
        }
    }

    if out.is_empty() && !by_id.is_empty() {
        return Err(Error::JudgeParse(format!(
            "none of the {} returned ids is among the {} candidates",
            ordered_ids.len(),
            by_id.len()
        )));
    }

    if !by_id.is_empty() {
        match policy {
            OmittedPolicy::Drop => info!(omitted = by_id.len(), "dropping candidates the judge left out"),
            OmittedPolicy::Append => {
                for id in fused_order {
                    if let Some(candidate) = by_id.remove(&id) {
                        out.push(RerankedHit::unjudged(candidate));
                    }
                }
            }
        }
    }
    Ok(out)
}

pub async fn rerank_listwise(
    judge: &dyn RelevanceJudge,
    query: &str,
    candidates: Vec<Candidate>,
    settings: &RerankSettings,
    limit: usize,
) -> Result<Vec<RerankedHit>> {
    let prompt = listwise_prompt(query, &candidates, settings.listwise_snippet_chars);
    let reply = tokio::time::timeout(std::time::Duration::from_millis(settings.timeout_ms), judge.judge(&prompt))
        .await
        .map_err(|_| Error::JudgeUnavailable(format!("judge timed out after {} ms", settings.timeout_ms)))??;
    let ids = parse_id_list(&reply).inspect_err(|e| warn!(error = %e, "listwise rerank failed"))?;
    let mut out = apply_ordering(candidates, &ids, settings.listwise_omitted)
        .inspect_err(|e| warn!(error = %e, "listwise rerank failed"))?;
    out.truncate(limit);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_fenced_lists() {
        assert_eq!(parse_id_list("[3, 1, 2]").unwrap(), vec![3, 1, 2]);
        assert_eq!(parse_id_list("```json\n[75, \"12\"]\n```").unwrap(), vec![75, 12]);
        assert_eq!(parse_id_list("```\n[]\n```").unwrap(), Vec::<DocId>::new());
    }

    #[test]
    fn rejects_non_lists_and_non_ids() {
        for reply in ["3, 1, 2", "{\"ids\": [1]}", "[1, \"two\"]", "[1.5]", "[-4]"] {
            assert!(matches!(parse_id_list(reply), Err(Error::JudgeParse(_))), "{reply:?} should not parse");
        }
    }

    #[test]
    fn ordering_with_no_known_id_is_a_parse_error() {
        let candidates = || {
            [(4, "Heat"), (8, "Ronin")]
                .into_iter()
                .map(|(id, title)| Candidate {
                    fused: reelsearch_core::types::FusedHit { doc_id: id, lexical: None, semantic: None, fused_score: 0.0 },
                    document: reelsearch_core::types::Document {
                        id,
                        title: title.to_string(),
                        body: String::new(),
                        metadata: Default::default(),
                    },
                })
                .collect::<Vec<_>>()
        };
        for policy in [OmittedPolicy::Drop, OmittedPolicy::Append] {
            assert!(matches!(apply_ordering(candidates(), &[97, 98], policy), Err(Error::JudgeParse(_))));
            assert!(matches!(apply_ordering(candidates(), &[], policy), Err(Error::JudgeParse(_))));
        }
        assert!(apply_ordering(Vec::new(), &[97], OmittedPolicy::Drop).unwrap().is_empty());
        let hits = apply_ordering(candidates(), &[97, 8], OmittedPolicy::Drop).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].candidate.doc_id(), 8);
    }
}
