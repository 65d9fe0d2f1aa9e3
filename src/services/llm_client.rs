use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Trait for hosted text-generation providers. Prompt in, text out; the
/// provider carries its own model name and generation settings.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Knobs forwarded with every generation call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 2048,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_HARASSMENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: "BLOCK_ONLY_HIGH",
    })
    .collect()
}

const SYSTEM_INSTRUCTION: &[&str] = &[
    "You are a helpful, knowledgeable, and human-like assistant.",
    "Generate a clear, concise, and fluent response in natural language based on the query and relevant chunks.",
    "Ensure the response is coherent, well-structured, and easy to understand.",
];

#[derive(Clone)]
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    generation_config: GenerationConfig,
    timeout: Duration,
}

impl HttpLlmClient {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            generation_config: GenerationConfig::default(),
            timeout,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.llm_url.clone(),
            model: cfg.llm_model.clone(),
            generation_config: GenerationConfig {
                max_output_tokens: cfg.llm_max_output_tokens,
                temperature: cfg.llm_temperature,
                top_p: cfg.llm_top_p,
                top_k: cfg.llm_top_k,
            },
            timeout: Duration::from_secs(cfg.request_timeout_secs),
        }
    }
}

#[async_trait]
impl LlmProvider for HttpLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system_instruction: SYSTEM_INSTRUCTION.iter().map(|s| s.to_string()).collect(),
            generation_config: self.generation_config.clone(),
            safety_settings: default_safety_settings(),
        };

        let response = self
            .client
            .post(format!("{}/v1/generate", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: GenerateResponse = response.json().await?;
        if body.text.is_empty() {
            return Err(LlmError::InvalidResponse("empty generation".to_string()));
        }
        Ok(body.text)
    }
}

// Request/Response Models
#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    system_instruction: Vec<String>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Mock provider for testing: serves canned replies in order, then repeats
/// the last one. Counts upstream calls.
pub struct MockLlm {
    replies: std::sync::Mutex<Vec<Result<String, String>>>,
    pub call_count: std::sync::Arc<std::sync::Mutex<usize>>,
}

impl MockLlm {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies),
            call_count: std::sync::Arc::new(std::sync::Mutex::new(0)),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing() -> Self {
        Self::new(vec![Err("upstream unavailable".to_string())])
    }

    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        *self.call_count.lock().unwrap() += 1;
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies[0].clone()
        };
        reply.map_err(LlmError::InvalidResponse)
    }
}
