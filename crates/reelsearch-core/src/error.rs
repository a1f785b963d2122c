use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Index not ready: {0}")]
    IndexNotReady(String),

    #[error("Stale cache: {0}")]
    StaleCache(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Judge response could not be parsed: {0}")]
    JudgeParse(String),

    #[error("Judge unavailable: {0}")]
    JudgeUnavailable(String),

    #[error("Unknown rerank strategy: {0}")]
    UnknownStrategy(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// True for failures that originate in an external relevance judge.
    pub fn is_judge_failure(&self) -> bool {
        matches!(self, Error::JudgeParse(_) | Error::JudgeUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
