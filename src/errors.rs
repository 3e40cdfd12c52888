use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfragError {
    #[error("Processed query is empty. Please provide a valid input.")]
    EmptyQuery,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Vector index error: {0}")]
    VectorIndexError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Completion stream error: {0}")]
    CompletionStream(String),

    #[error("Scrape error: {0}")]
    ScrapeError(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl ProfragError {
    /// Whether the failure came from an external provider and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_)
                | Self::EmbeddingError(_)
                | Self::VectorIndexError(_)
                | Self::Request(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProfragError>;
