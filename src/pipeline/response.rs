use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::pipeline::cache::BoundedCache;
use crate::services::llm_client::LlmProvider;

/// Fixed reply returned when the generation call fails.
pub const FALLBACK_RESPONSE: &str = "Sorry, I couldn't generate a response at the moment.";

/// Whether a reply came from the model or from the failure path. Callers can
/// always tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Answered,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub status: GenerationStatus,
}

/// Response stage: memoizes `(query, combined_input) -> text` against the
/// hosted LLM. Only successful generations are cached; a failure is reported
/// as the fallback reply and retried on the next identical request.
pub struct ResponseStage {
    llm: Arc<dyn LlmProvider>,
    cache: BoundedCache<(String, String), String>,
}

impl ResponseStage {
    pub fn new(llm: Arc<dyn LlmProvider>, cache_capacity: usize) -> Self {
        Self {
            llm,
            cache: BoundedCache::new(cache_capacity),
        }
    }

    pub async fn generate(&self, query: &str, combined_input: &str) -> Generated {
        let key = (query.to_string(), combined_input.to_string());
        if let Some(text) = self.cache.get(&key) {
            tracing::debug!("Response cache hit for query: {}", query);
            return Generated {
                text,
                status: GenerationStatus::Answered,
            };
        }

        let prompt = format!(
            "Query: {}\nCombined Input: {}\n\nAnswer the query based on the provided combined input.",
            query, combined_input
        );

        let start = std::time::Instant::now();
        let result = self.llm.generate(&prompt).await;
        tracing::info!("Time taken to generate text: {:?}", start.elapsed());

        match result {
            Ok(text) => {
                self.cache.put(key, text.clone());
                Generated {
                    text,
                    status: GenerationStatus::Answered,
                }
            }
            Err(e) => {
                tracing::error!("Error generating response for query {}: {}", query, e);
                Generated {
                    text: FALLBACK_RESPONSE.to_string(),
                    status: GenerationStatus::Fallback,
                }
            }
        }
    }
}
