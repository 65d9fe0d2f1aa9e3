use serde::Deserialize;
use validator::Validate;

/// Main configuration for the Evidence Assistant service
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct Config {
    /// HTTP server port
    #[validate(range(min = 1024, max = 65535))]
    pub server_port: u16,

    /// Database URL (SeaORM / SQLite)
    pub database_url: String,

    /// Hosted LLM text-generation endpoint
    pub llm_url: String,

    /// Model name sent to the LLM endpoint
    pub llm_model: String,

    /// Generation knobs forwarded with every LLM call
    pub llm_max_output_tokens: u32,
    pub llm_temperature: f32,
    pub llm_top_p: f32,
    pub llm_top_k: u32,

    /// Hosted document-retrieval endpoint
    pub search_url: String,

    /// Data store id queried on the search endpoint
    pub search_data_store: String,

    /// Passages requested per retrieval
    #[validate(range(min = 1, max = 100))]
    pub retrieval_limit: usize,

    /// Object storage endpoint and bucket for generated graphics
    pub storage_url: String,
    pub storage_bucket: String,

    /// Local directory where rendered graphics are written before upload
    pub image_dir: String,

    /// Bounded cache capacities (LRU eviction, no TTL)
    #[validate(range(min = 1))]
    pub retrieval_cache_size: usize,
    #[validate(range(min = 1))]
    pub response_cache_size: usize,

    /// Timeout applied to every outbound call, in seconds
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    /// Longest sanitized filename component
    #[validate(range(min = 8, max = 255))]
    pub max_filename_length: usize,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            // Core defaults
            .set_default("server_port", 8080)?
            .set_default("database_url", "sqlite://evidence.db")?
            .set_default("llm_url", "http://localhost:5001")?
            .set_default("llm_model", "gemini-2.0-flash-exp")?
            .set_default("llm_max_output_tokens", 2048)?
            .set_default("llm_temperature", 0.7)?
            .set_default("llm_top_p", 0.9)?
            .set_default("llm_top_k", 40)?
            .set_default("search_url", "http://localhost:5002")?
            .set_default("search_data_store", "evaluation-reports")?
            .set_default("retrieval_limit", 5)?
            .set_default("storage_url", "http://localhost:9000")?
            .set_default("storage_bucket", "evidence-assistant")?
            .set_default("image_dir", "static_img")?
            .set_default("retrieval_cache_size", 50)?
            .set_default("response_cache_size", 128)?
            .set_default("request_timeout_secs", 30)?
            .set_default("max_filename_length", 100)?
            .set_default("log_level", "info")?
            // Load from ~/.evidence/config.toml (if present)
            .add_source(
                config::File::with_name(&format!(
                    "{}/.evidence/config",
                    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
                ))
                .required(false),
            )
            // Environment overrides: EVIDENCE__SERVER_PORT, EVIDENCE__LLM_URL, etc.
            .add_source(config::Environment::with_prefix("EVIDENCE").separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config() -> Config {
        Config {
            server_port: 8080,
            database_url: "sqlite::memory:".to_string(),
            llm_url: "http://localhost:5001".to_string(),
            llm_model: "gemini-2.0-flash-exp".to_string(),
            llm_max_output_tokens: 2048,
            llm_temperature: 0.7,
            llm_top_p: 0.9,
            llm_top_k: 40,
            search_url: "http://localhost:5002".to_string(),
            search_data_store: "evaluation-reports".to_string(),
            retrieval_limit: 5,
            storage_url: "http://localhost:9000".to_string(),
            storage_bucket: "evidence-assistant".to_string(),
            image_dir: "static_img".to_string(),
            retrieval_cache_size: 50,
            response_cache_size: 128,
            request_timeout_secs: 30,
            max_filename_length: 100,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        let mut cfg = test_config();
        cfg.retrieval_cache_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn privileged_port_is_rejected() {
        let mut cfg = test_config();
        cfg.server_port = 80;
        assert!(cfg.validate().is_err());
    }
}
