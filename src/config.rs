use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::ProfragError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

/// Which embedding API the client speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    pub provider: EmbeddingProviderKind,
    pub endpoint: String,
    pub model: String,
    pub dimension: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub llm_endpoint: String,
    #[serde(default)]
    pub llm_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Index host, e.g. `https://rag-abc123.svc.us-east-1.pinecone.io`
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Namespace searched by the chat endpoint. Falls back to `ingest_namespace`;
    /// an empty string searches the index's default namespace.
    #[serde(default)]
    pub query_namespace: Option<String>,
    #[serde(default = "default_ingest_namespace")]
    pub ingest_namespace: String,
}

fn default_ingest_namespace() -> String {
    "ns1".to_string()
}

/// Delay growth between retrieval attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    None,
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub backoff: BackoffKind,
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_fallback_limit() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: 0,
            backoff: BackoffKind::None,
            fallback_limit: default_fallback_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the default file locations, then overlay secrets
    /// from the environment.
    pub fn load() -> crate::Result<Self> {
        let mut config = if Path::new("config.toml").exists() {
            Self::from_file("config.toml")?
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")?
        } else {
            tracing::warn!("No config file found, using built-in defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, then overlay secrets from the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Fill credentials and the index host from process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            if self.embeddings.api_key.is_none() {
                self.embeddings.api_key = Some(key.clone());
            }
            if self.llm.llm_key.is_none() {
                self.llm.llm_key = Some(key);
            }
        }
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.vector_index.api_key = Some(key);
        }
        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            self.vector_index.host = host;
        }
    }

    /// Reject configurations that cannot serve a single request.
    pub fn validate(&self) -> crate::Result<()> {
        if self.vector_index.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(ProfragError::ConfigError(
                "vector index API key missing (set PINECONE_API_KEY)".to_string(),
            ));
        }
        if self.vector_index.host.trim().is_empty() {
            return Err(ProfragError::ConfigError(
                "vector index host missing (set PINECONE_INDEX_HOST)".to_string(),
            ));
        }
        if self.embeddings.provider == EmbeddingProviderKind::OpenAI
            && self.embeddings.api_key.as_deref().unwrap_or("").is_empty()
        {
            return Err(ProfragError::ConfigError(
                "embedding API key missing (set OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.llm.llm_key.as_deref().unwrap_or("").is_empty()
            && self.llm.llm_endpoint.contains("api.openai.com")
        {
            return Err(ProfragError::ConfigError(
                "LLM API key missing (set OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.retrieval.max_attempts == 0 {
            return Err(ProfragError::ConfigError(
                "retrieval.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ProfragError::ConfigError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy of the configuration with secrets masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.embeddings.api_key = copy.embeddings.api_key.as_deref().map(redact);
        copy.llm.llm_key = copy.llm.llm_key.as_deref().map(redact);
        copy.vector_index.api_key = copy.vector_index.api_key.as_deref().map(redact);
        copy
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.llm_endpoint
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.llm_model
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Namespace chat retrieval searches, `None` meaning the default namespace
    pub fn query_namespace(&self) -> Option<&str> {
        let namespace = self
            .vector_index
            .query_namespace
            .as_deref()
            .unwrap_or(&self.vector_index.ingest_namespace);
        (!namespace.is_empty()).then_some(namespace)
    }

    /// Delay before the second retrieval attempt
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retrieval.retry_delay_ms)
    }
}

fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 10 {
        return "*****".to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}...{tail}")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
                log_dir: default_log_dir(),
            },
            embeddings: EmbeddingsConfig {
                provider: EmbeddingProviderKind::OpenAI,
                endpoint: "https://api.openai.com/v1".to_string(),
                model: "text-embedding-ada-002".to_string(),
                dimension: crate::embeddings::DEFAULT_EMBEDDING_DIM,
                api_key: None,
            },
            llm: LlmConfig {
                llm_endpoint: "https://api.openai.com/v1".to_string(),
                llm_key: None,
                llm_model: default_llm_model(),
                temperature: None,
            },
            vector_index: VectorIndexConfig {
                host: String::new(),
                api_key: None,
                query_namespace: None,
                ingest_namespace: default_ingest_namespace(),
            },
            retrieval: RetrievalConfig::default(),
        }
    }
}
