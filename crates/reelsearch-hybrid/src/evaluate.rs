//! LLM grading of a final result list on a 0-3 relevance scale.

use tracing::warn;

use reelsearch_core::traits::RelevanceJudge;
use reelsearch_core::{Error, Result};

use crate::rerank::listwise::parse_integer_list;
use crate::rerank::Candidate;

pub const MAX_GRADE: u8 = 3;

pub fn evaluation_prompt(query: &str, results: &[Candidate], snippet_chars: usize) -> String {
    let listing: Vec<String> = results
        .iter()
        .map(|c| {
            let snippet: String = c.document.body.chars().take(snippet_chars).collect();
            format!("{} - {}", c.document.title, snippet)
        })
        .collect();
    format!(
        "Rate how relevant each result is to this query on a 0-3 scale:\n\
         Query: \"{query}\"\n\
         Results:\n{}\n\n\
         Scale:\n\
         - 3: Highly relevant\n\
         - 2: Relevant\n\
         - 1: Marginally relevant\n\
         - 0: Not relevant\n\n\
         Return ONLY a valid JSON list of integers. Example: [3, 0, 2, 1]",
        listing.join("\n")
    )
}

/// One grade per result, in result order. Results past the end of a short
/// reply get `None`.
pub async fn evaluate(
    judge: &dyn RelevanceJudge,
    query: &str,
    results: &[Candidate],
    snippet_chars: usize,
) -> Result<Vec<Option<u8>>> {
    if results.is_empty() {
        return Ok(Vec::new());
    }
    let reply = judge.judge(&evaluation_prompt(query, results, snippet_chars)).await?;
    let grades = parse_integer_list(&reply).inspect_err(|e| warn!(error = %e, "evaluation failed"))?;
    if let Some(bad) = grades.iter().find(|g| **g > u64::from(MAX_GRADE)) {
        return Err(Error::JudgeParse(format!("grade {bad} is outside 0..={MAX_GRADE}")));
    }
    Ok((0..results.len())
        .map(|i| grades.get(i).and_then(|g| u8::try_from(*g).ok()))
        .collect())
}
