//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys split on `__`, e.g. `APP_FUSION__RRF_K=30`).
//! Path settings go through `expand_path`, so `~` and `${VAR}` work in them.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Extract and validate the typed settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub lexical: LexicalSettings,
    pub vector: VectorSettings,
    pub fusion: FusionSettings,
    pub rerank: RerankSettings,
    pub judge: JudgeSettings,
    pub models: ModelSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub collection_path: String,
    pub cache_dir: String,
    pub stopwords_path: Option<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            collection_path: "data/movies.json".to_string(),
            cache_dir: "cache".to_string(),
            stopwords_path: None,
        }
    }
}

impl DataSettings {
    pub fn collection_path(&self) -> PathBuf {
        expand_path(&self.collection_path)
    }

    pub fn cache_dir(&self) -> PathBuf {
        expand_path(&self.cache_dir)
    }

    pub fn stopwords_path(&self) -> Option<PathBuf> {
        self.stopwords_path.as_deref().map(expand_path)
    }
}

/// How a query token is compared with document tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Normalized token equality.
    #[default]
    Exact,
    /// The query token is a substring of a document token.
    Substring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalSettings {
    pub match_mode: MatchMode,
    pub k1: f64,
    pub b: f64,
}

impl Default for LexicalSettings {
    fn default() -> Self {
        Self { match_mode: MatchMode::Exact, k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    /// Bodies longer than this many words are split into chunks.
    pub chunk_words: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self { chunk_words: 150, chunk_overlap: 30, batch_size: 32 }
    }
}

/// Reciprocal rank fusion damping constant.
pub const DEFAULT_RRF_K: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    /// Each source is fetched at `limit * overfetch_factor`.
    pub overfetch_factor: usize,
    pub rrf_k: u32,
    pub default_limit: usize,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self { overfetch_factor: 500, rrf_k: DEFAULT_RRF_K, default_limit: 5 }
    }
}

/// What listwise reranking does with candidates the judge left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OmittedPolicy {
    #[default]
    Drop,
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    /// The rerank pipeline fuses `limit * candidate_factor` candidates first.
    pub candidate_factor: usize,
    pub listwise_omitted: OmittedPolicy,
    pub listwise_snippet_chars: usize,
    pub concurrency: usize,
    pub min_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            candidate_factor: 5,
            listwise_omitted: OmittedPolicy::Drop,
            listwise_snippet_chars: 200,
            concurrency: 4,
            min_delay_ms: 3_000,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding_dir: Option<String>,
    pub cross_encoder_dir: Option<String>,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { embedding_dir: None, cross_encoder_dir: None, use_fake: false, fake_dim: 384 }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.fusion.overfetch_factor == 0 {
            return invalid("fusion.overfetch_factor must be >= 1".into());
        }
        if self.fusion.default_limit == 0 {
            return invalid("fusion.default_limit must be >= 1".into());
        }
        if !(self.lexical.k1.is_finite() && self.lexical.k1 >= 0.0) {
            return invalid(format!("lexical.k1 must be a non-negative number, got {}", self.lexical.k1));
        }
        if !(0.0..=1.0).contains(&self.lexical.b) {
            return invalid(format!("lexical.b must be within [0, 1], got {}", self.lexical.b));
        }
        if self.vector.chunk_words == 0 || self.vector.batch_size == 0 {
            return invalid("vector.chunk_words and vector.batch_size must be >= 1".into());
        }
        if self.vector.chunk_overlap >= self.vector.chunk_words {
            return invalid(format!(
                "vector.chunk_overlap ({}) must be smaller than vector.chunk_words ({})",
                self.vector.chunk_overlap, self.vector.chunk_words
            ));
        }
        if self.rerank.concurrency == 0 || self.rerank.candidate_factor == 0 {
            return invalid("rerank.concurrency and rerank.candidate_factor must be >= 1".into());
        }
        if self.rerank.timeout_ms == 0 {
            return invalid("rerank.timeout_ms must be >= 1".into());
        }
        if self.models.use_fake && self.models.fake_dim == 0 {
            return invalid("models.fake_dim must be >= 1".into());
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
