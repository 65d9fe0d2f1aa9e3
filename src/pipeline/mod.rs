//! Query-to-reply pipeline: retrieval, generation, and the optional graphic.

pub mod analysis;
pub mod cache;
pub mod chart;
pub mod graphic;
pub mod response;
pub mod retrieval;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::config::Config;
use crate::pipeline::chart::render_chart;
use crate::pipeline::graphic::GraphicStage;
use crate::pipeline::response::{GenerationStatus, ResponseStage};
use crate::pipeline::retrieval::{combine_chunks, RetrievalStage};
use crate::services::llm_client::LlmProvider;
use crate::services::object_storage::{sanitize_filename, StorageClient};
use crate::services::search_client::Retriever;

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub status: GenerationStatus,
    pub graphic_url: Option<String>,
}

/// End-to-end chat pipeline. A query always yields a reply; retrieval and
/// graphic failures degrade the reply instead of failing the request.
pub struct ChatPipeline {
    retrieval: RetrievalStage,
    response: ResponseStage,
    graphic: GraphicStage,
    storage: StorageClient,
    image_dir: PathBuf,
    max_filename_length: usize,
}

impl ChatPipeline {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LlmProvider>,
        storage: StorageClient,
        cfg: &Config,
    ) -> Self {
        Self {
            retrieval: RetrievalStage::new(
                retriever,
                cfg.retrieval_cache_size,
                cfg.retrieval_limit,
            ),
            response: ResponseStage::new(llm.clone(), cfg.response_cache_size),
            graphic: GraphicStage::new(llm),
            storage,
            image_dir: PathBuf::from(&cfg.image_dir),
            max_filename_length: cfg.max_filename_length,
        }
    }

    pub async fn chat(&self, query: &str) -> ChatReply {
        let chunks = self.retrieval.retrieve_chunks(query).await;
        let combined = combine_chunks(query, &chunks);
        let generated = self.response.generate(query, &combined).await;

        // A fallback reply carries no data worth charting
        let graphic_url = if generated.status == GenerationStatus::Answered {
            self.maybe_render_graphic(query, &generated.text).await
        } else {
            None
        };

        ChatReply {
            response: generated.text,
            status: generated.status,
            graphic_url,
        }
    }

    /// Runs the graphic side-channel. Every failure along the way drops the
    /// graphic and returns `None`.
    async fn maybe_render_graphic(&self, query: &str, response: &str) -> Option<String> {
        if !self.graphic.needs_graphic(query, response).await {
            return None;
        }
        let spec = self.graphic.generate_chart_spec(query, response).await?;

        let filename = format!(
            "{}_{}_generated_graph.png",
            sanitize_filename(query, self.max_filename_length),
            Utc::now().timestamp()
        );
        let local_path = self.image_dir.join(&filename);

        if let Err(e) = tokio::fs::create_dir_all(&self.image_dir).await {
            tracing::error!("Could not create image directory: {}", e);
            return None;
        }

        let render_path = local_path.clone();
        match tokio::task::spawn_blocking(move || render_chart(&spec, &render_path)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("Chart rendering failed: {}", e);
                return None;
            }
            Err(e) => {
                tracing::error!("Chart rendering task failed: {}", e);
                return None;
            }
        }

        match self
            .storage
            .upload(&local_path, &format!("images/{}", filename))
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Graphic upload failed, dropping graphic: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_client::MockLlm;
    use crate::services::search_client::MockRetriever;
    use std::time::Duration;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SPEC_JSON: &str = r#"{
        "kind": "bar",
        "title": "Budget by year",
        "labels": ["2021", "2022"],
        "series": [{"name": "Budget", "values": [10.0, 12.5]}]
    }"#;

    fn test_config(image_dir: &std::path::Path) -> Config {
        let mut cfg = crate::config::tests::test_config();
        cfg.image_dir = image_dir.to_string_lossy().to_string();
        cfg
    }

    fn pipeline(llm: Arc<MockLlm>, storage: StorageClient, cfg: &Config) -> ChatPipeline {
        ChatPipeline::new(
            Arc::new(MockRetriever::returning(Vec::new())),
            llm,
            storage,
            cfg,
        )
    }

    fn local_storage(uri: &str) -> StorageClient {
        StorageClient::new(
            uri.to_string(),
            "evidence".to_string(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn chat_without_graphic() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let llm = Arc::new(MockLlm::new(vec![
            Ok("The budget rose.".to_string()),
            Ok("no".to_string()),
        ]));
        let pipe = pipeline(llm, local_storage("http://localhost:1"), &cfg);

        let reply = pipe.chat("What happened to the budget?").await;
        assert_eq!(reply.response, "The budget rose.");
        assert_eq!(reply.status, GenerationStatus::Answered);
        assert!(reply.graphic_url.is_none());
    }

    #[tokio::test]
    async fn fallback_skips_the_graphic_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let llm = Arc::new(MockLlm::failing());
        let pipe = pipeline(llm.clone(), local_storage("http://localhost:1"), &cfg);

        let reply = pipe.chat("q").await;
        assert_eq!(reply.status, GenerationStatus::Fallback);
        assert!(reply.graphic_url.is_none());
        // Only the response stage called upstream; no classifier call
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn chat_with_graphic_uploads_and_returns_url() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/evidence/images/.*_generated_graph\.png$"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let llm = Arc::new(MockLlm::new(vec![
            Ok("Budgets: 10 then 12.5.".to_string()),
            Ok("yes".to_string()),
            Ok(SPEC_JSON.to_string()),
        ]));
        let pipe = pipeline(llm, local_storage(&server.uri()), &cfg);

        let reply = pipe.chat("Show the budget trend").await;
        assert_eq!(reply.status, GenerationStatus::Answered);

        let url = reply.graphic_url.expect("graphic url");
        assert!(url.starts_with(&server.uri()));
        assert!(url.ends_with("_generated_graph.png"));

        // The rendered PNG stays on disk for the local image route
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn upload_failure_drops_the_graphic() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let llm = Arc::new(MockLlm::new(vec![
            Ok("Budgets: 10 then 12.5.".to_string()),
            Ok("yes".to_string()),
            Ok(SPEC_JSON.to_string()),
        ]));
        let pipe = pipeline(llm, local_storage(&server.uri()), &cfg);

        let reply = pipe.chat("Show the budget trend").await;
        assert_eq!(reply.status, GenerationStatus::Answered);
        assert!(reply.graphic_url.is_none());
    }
}
