//! HTTP relevance judge for `generateContent`-style text generation APIs.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

use reelsearch_core::config::JudgeSettings;
use reelsearch_core::traits::RelevanceJudge;
use reelsearch_core::{Error, Result};

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GenerateCandidate>,
}

#[derive(Deserialize)]
struct GenerateCandidate {
    content: Option<GenerateContent>,
}

#[derive(Deserialize)]
struct GenerateContent {
    #[serde(default)]
    parts: Vec<GeneratePart>,
}

#[derive(Deserialize)]
struct GeneratePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates.into_iter().next()?.content?.parts.into_iter().next().map(|p| p.text)
    }
}

pub struct GenerativeJudge {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GenerativeJudge {
    pub fn new(endpoint: &str, model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build judge HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    /// Reads the API key from the environment variable named in `settings.api_key_env`.
    pub fn from_settings(settings: &JudgeSettings, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidConfig(format!("{} is not set", settings.api_key_env)))?;
        Self::new(&settings.endpoint, &settings.model, api_key, timeout)
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl RelevanceJudge for GenerativeJudge {
    async fn judge(&self, prompt: &str) -> Result<String> {
        let started = Instant::now();
        let body = serde_json::json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let resp = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::JudgeUnavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::JudgeUnavailable(format!("judge returned HTTP {status}")));
        }
        let data: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::JudgeParse(format!("undecodable judge response: {e}")))?;
        let text = data
            .into_text()
            .ok_or_else(|| Error::JudgeParse("judge response has no candidate text".into()))?;
        debug!(model = %self.model, elapsed_ms = started.elapsed().as_millis() as u64, "judge replied");
        Ok(text.trim().to_string())
    }
}
