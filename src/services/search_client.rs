use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::models::internal::Chunk;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Trait for the hosted document-retrieval endpoint: query in, ranked
/// passages plus source metadata out.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Chunk>, SearchError>;
}

#[derive(Clone)]
pub struct HttpSearchClient {
    client: reqwest::Client,
    base_url: String,
    data_store: String,
    timeout: Duration,
}

impl HttpSearchClient {
    pub fn new(base_url: String, data_store: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            data_store,
            timeout,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.search_url.clone(),
            cfg.search_data_store.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }
}

#[async_trait]
impl Retriever for HttpSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Chunk>, SearchError> {
        let request = SearchRequest {
            query: query.to_string(),
            data_store: self.data_store.clone(),
            page_size: limit as u32,
            extractive_answers: true,
        };

        let response = self
            .client
            .post(format!("{}/v1/search", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body
            .results
            .into_iter()
            .take(limit)
            .map(|hit| Chunk {
                chunk: hit.content,
                source: hit.source.unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect())
    }
}

// Request/Response Models
#[derive(Serialize)]
struct SearchRequest {
    query: String,
    data_store: String,
    page_size: u32,
    extractive_answers: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    content: String,
    source: Option<String>,
}

/// Mock retriever for testing, with call counting.
pub struct MockRetriever {
    response: Result<Vec<Chunk>, String>,
    pub call_count: std::sync::Arc<std::sync::Mutex<usize>>,
}

impl MockRetriever {
    pub fn returning(chunks: Vec<Chunk>) -> Self {
        Self {
            response: Ok(chunks),
            call_count: std::sync::Arc::new(std::sync::Mutex::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err("retriever unavailable".to_string()),
            call_count: std::sync::Arc::new(std::sync::Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<Chunk>, SearchError> {
        *self.call_count.lock().unwrap() += 1;
        match &self.response {
            Ok(chunks) => Ok(chunks.iter().take(limit).cloned().collect()),
            Err(message) => Err(SearchError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }
}
