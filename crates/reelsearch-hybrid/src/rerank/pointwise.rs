use futures::{stream, StreamExt, TryStreamExt};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, timeout, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use reelsearch_core::config::RerankSettings;
use reelsearch_core::traits::RelevanceJudge;
use reelsearch_core::{Error, Result};

use super::{Candidate, RerankSignal, RerankedHit};

pub const MAX_SCORE: u8 = 10;

pub fn pointwise_prompt(query: &str, candidate: &Candidate) -> String {
    format!(
        "Rate how well this movie matches the search query.\n\n\
         Query: \"{query}\"\n\
         Movie: {}\n\n\
         Consider:\n\
         - Direct relevance to query\n\
         - User intent (what they're looking for)\n\
         - Content appropriateness\n\n\
         Rate 0-10 (10 = perfect match).\n\
         Give me ONLY the number in your response, no other text or explanation.\n\n\
         Score:",
        candidate.judged_text()
    )
}

/// The reply must be a single integer in `[0, 10]`, optionally quoted.
pub fn parse_score(reply: &str) -> Result<u8> {
    let cleaned = reply.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();
    let value: i64 = cleaned
        .parse()
        .map_err(|_| Error::JudgeParse(format!("expected an integer score, got {reply:?}")))?;
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= MAX_SCORE)
        .ok_or_else(|| Error::JudgeParse(format!("score {value} is outside 0..={MAX_SCORE}")))
}

/// Paces judge calls: callers wait on a shared ticker before each request.
struct Pacer(Option<Mutex<Interval>>);

impl Pacer {
    fn new(min_delay: Duration) -> Self {
        if min_delay.is_zero() {
            return Self(None);
        }
        let mut ticker = interval(min_delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self(Some(Mutex::new(ticker)))
    }

    async fn wait(&self) {
        if let Some(ticker) = &self.0 {
            ticker.lock().await.tick().await;
        }
    }
}

/// Score every candidate with at most `settings.concurrency` calls in flight
/// and at least `settings.min_delay_ms` between call starts. Any failed or
/// timed-out call fails the whole rerank.
pub async fn rerank_pointwise(
    judge: &dyn RelevanceJudge,
    query: &str,
    candidates: Vec<Candidate>,
    settings: &RerankSettings,
    limit: usize,
) -> Result<Vec<RerankedHit>> {
    let pacer = Pacer::new(Duration::from_millis(settings.min_delay_ms));
    let call_timeout = Duration::from_millis(settings.timeout_ms);
    let pacer = &pacer;

    let scores: Vec<u8> = stream::iter(candidates.iter().map(|candidate| {
        let prompt = pointwise_prompt(query, candidate);
        let doc_id = candidate.doc_id();
        async move {
            pacer.wait().await;
            let reply = timeout(call_timeout, judge.judge(&prompt))
                .await
                .map_err(|_| Error::JudgeUnavailable(format!("judge timed out after {} ms on doc {doc_id}", call_timeout.as_millis())))??;
            let score = parse_score(&reply)?;
            debug!(doc_id, score, "pointwise score");
            Ok::<u8, Error>(score)
        }
    }))
    .buffered(settings.concurrency.max(1))
    .try_collect()
    .await
    .inspect_err(|e| warn!(error = %e, "pointwise rerank failed"))?;

    let mut scored: Vec<(u8, Candidate)> = scores.into_iter().zip(candidates).collect();
    // stable: equal scores keep fused order
    scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
    Ok(scored
        .into_iter()
        .take(limit)
        .map(|(score, candidate)| RerankedHit { candidate, signal: RerankSignal::Pointwise(score) })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_padded_scores() {
        assert_eq!(parse_score("7").unwrap(), 7);
        assert_eq!(parse_score(" 10\n").unwrap(), 10);
        assert_eq!(parse_score("\"0\"").unwrap(), 0);
    }

    #[test]
    fn rejects_out_of_range_and_prose() {
        for reply in ["11", "-1", "7/10", "seven", "", "8.5"] {
            assert!(matches!(parse_score(reply), Err(Error::JudgeParse(_))), "{reply:?} should not parse");
        }
    }
}
