use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coursemate: CoursemateConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Process-wide settings
#[derive(Debug, Clone, Deserialize)]
pub struct CoursemateConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoursemateConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Chat-completion service configuration (any OpenAI-compatible endpoint)
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Send a tiny completion before serving to reject bad credentials early
    #[serde(default = "default_true")]
    pub validate_on_start: bool,
}

/// Embeddings configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embeddings_base_url")]
    pub base_url: String,
    #[serde(default = "default_embeddings_model")]
    pub model: String,
    #[serde(default = "default_embeddings_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: default_embeddings_base_url(),
            model: default_embeddings_model(),
            api_key_env: default_embeddings_api_key_env(),
            batch_size: default_batch_size(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Which search backend indexes the loaded material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalBackend {
    /// Embedding vectors + cosine similarity
    Embeddings,
    /// Offline BM25 keyword scoring, no embedding API needed
    Keyword,
}

/// Retrieval configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_backend")]
    pub backend: RetrievalBackend,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_chunk_size_chars")]
    pub chunk_size_chars: usize,
    #[serde(default = "default_chunk_overlap_chars")]
    pub chunk_overlap_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            top_k: default_top_k(),
            chunk_size_chars: default_chunk_size_chars(),
            chunk_overlap_chars: default_chunk_overlap_chars(),
        }
    }
}

/// Per-session request policy
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_http_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub authless: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            api_key_env: default_http_api_key_env(),
            allowed_origins: Vec::new(),
            authless: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_llm_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_embeddings_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embeddings_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embeddings_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_backend() -> RetrievalBackend {
    RetrievalBackend::Embeddings
}

fn default_top_k() -> usize {
    15
}

fn default_chunk_size_chars() -> usize {
    1000
}

fn default_chunk_overlap_chars() -> usize {
    150
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_max_upload_bytes() -> usize {
    200 * 1024 * 1024
}

fn default_http_port() -> u16 {
    8080
}

fn default_http_api_key_env() -> String {
    "COURSEMATE_API_KEY".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in COURSEMATE_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("COURSEMATE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        std::env::var(&self.llm.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your LLM API key.",
                self.llm.api_key_env
            )
        })?;

        if self.retrieval.backend == RetrievalBackend::Embeddings {
            std::env::var(&self.embeddings.api_key_env).with_context(|| {
                format!(
                    "Environment variable {} not set. Set it, or use retrieval.backend = \"keyword\".",
                    self.embeddings.api_key_env
                )
            })?;
        }

        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be greater than 0");
        }

        if self.retrieval.chunk_size_chars == 0 {
            anyhow::bail!("retrieval.chunk_size_chars must be greater than 0");
        }

        if self.retrieval.chunk_overlap_chars >= self.retrieval.chunk_size_chars {
            anyhow::bail!("retrieval.chunk_overlap_chars must be less than chunk_size_chars");
        }

        if self.embeddings.batch_size == 0 {
            anyhow::bail!("embeddings.batch_size must be greater than 0");
        }

        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Read the LLM API key from the configured environment variable
    pub fn llm_api_key(&self) -> Result<String> {
        std::env::var(&self.llm.api_key_env)
            .with_context(|| format!("Environment variable {} not set", self.llm.api_key_env))
    }

    /// Read the embeddings API key from the configured environment variable
    pub fn embeddings_api_key(&self) -> Result<String> {
        std::env::var(&self.embeddings.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set",
                self.embeddings.api_key_env
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const FULL_CONFIG: &str = r#"
[coursemate]
log_level = "debug"

[llm]
model = "llama-3.1-8b-instant"
api_key_env = "COURSEMATE_TEST_LLM_KEY"

[embeddings]
api_key_env = "COURSEMATE_TEST_EMBED_KEY"
batch_size = 50

[retrieval]
backend = "embeddings"
top_k = 15
chunk_size_chars = 1000
chunk_overlap_chars = 150

[session]
cooldown_ms = 500
"#;

    fn with_keys(llm: Option<&str>, embed: Option<&str>, f: impl FnOnce()) {
        match llm {
            Some(k) => std::env::set_var("COURSEMATE_TEST_LLM_KEY", k),
            None => std::env::remove_var("COURSEMATE_TEST_LLM_KEY"),
        }
        match embed {
            Some(k) => std::env::set_var("COURSEMATE_TEST_EMBED_KEY", k),
            None => std::env::remove_var("COURSEMATE_TEST_EMBED_KEY"),
        }
        f();
        std::env::remove_var("COURSEMATE_TEST_LLM_KEY");
        std::env::remove_var("COURSEMATE_TEST_EMBED_KEY");
    }

    #[test]
    fn test_config_parse_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_keys(Some("llm-key"), Some("embed-key"), || {
            let config = Config::from_toml_str(FULL_CONFIG);
            assert!(config.is_ok(), "parse failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.coursemate.log_level, "debug");
            assert_eq!(config.retrieval.top_k, 15);
            assert_eq!(config.embeddings.batch_size, 50);
            assert_eq!(config.session.cooldown_ms, 500);
            // Untouched sections fall back to defaults
            assert_eq!(config.http_server.port, 8080);
            assert_eq!(config.llm.base_url, "https://api.groq.com/openai/v1");
        });
    }

    #[test]
    fn test_config_missing_llm_key() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_keys(None, Some("embed-key"), || {
            let err = Config::from_toml_str(FULL_CONFIG).unwrap_err();
            assert!(err.to_string().contains("COURSEMATE_TEST_LLM_KEY"));
        });
    }

    #[test]
    fn test_keyword_backend_needs_no_embedding_key() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let toml = FULL_CONFIG.replace("backend = \"embeddings\"", "backend = \"keyword\"");
        with_keys(Some("llm-key"), None, || {
            let config = Config::from_toml_str(&toml).unwrap();
            assert_eq!(config.retrieval.backend, RetrievalBackend::Keyword);
        });
    }

    #[test]
    fn test_config_rejects_overlap_not_smaller_than_chunk() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let toml = FULL_CONFIG.replace("chunk_overlap_chars = 150", "chunk_overlap_chars = 1000");
        with_keys(Some("llm-key"), Some("embed-key"), || {
            let err = Config::from_toml_str(&toml).unwrap_err();
            assert!(err.to_string().contains("chunk_overlap_chars"));
        });
    }

    #[test]
    fn test_config_rejects_zero_top_k() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let toml = FULL_CONFIG.replace("top_k = 15", "top_k = 0");
        with_keys(Some("llm-key"), Some("embed-key"), || {
            assert!(Config::from_toml_str(&toml).is_err());
        });
    }

    #[test]
    fn test_config_load_from_file() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, FULL_CONFIG).unwrap();

        let original = std::env::var("COURSEMATE_CONFIG").ok();
        std::env::set_var("COURSEMATE_CONFIG", config_path.to_str().unwrap());
        with_keys(Some("llm-key"), Some("embed-key"), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
        });
        std::env::remove_var("COURSEMATE_CONFIG");
        if let Some(v) = original {
            std::env::set_var("COURSEMATE_CONFIG", v);
        }
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("COURSEMATE_CONFIG").ok();
        std::env::set_var("COURSEMATE_CONFIG", "nonexistent.toml");
        assert!(Config::load().is_err());
        std::env::remove_var("COURSEMATE_CONFIG");
        if let Some(v) = original {
            std::env::set_var("COURSEMATE_CONFIG", v);
        }
    }
}
