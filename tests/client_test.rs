use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use evidence_assistant::services::llm_client::{HttpLlmClient, LlmError, LlmProvider};
use evidence_assistant::services::object_storage::StorageClient;
use evidence_assistant::services::search_client::{HttpSearchClient, Retriever};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn llm_client_posts_model_and_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "gemini-2.0-flash-exp"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "The answer."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpLlmClient::new(
        server.uri(),
        "gemini-2.0-flash-exp".to_string(),
        TIMEOUT,
    );
    assert_eq!(client.generate("prompt").await.unwrap(), "The answer.");
}

#[tokio::test]
async fn llm_client_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = HttpLlmClient::new(server.uri(), "m".to_string(), TIMEOUT);
    match client.generate("prompt").await {
        Err(LlmError::Api { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected Api error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn llm_client_rejects_empty_generations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": ""})))
        .mount(&server)
        .await;

    let client = HttpLlmClient::new(server.uri(), "m".to_string(), TIMEOUT);
    assert!(matches!(
        client.generate("prompt").await,
        Err(LlmError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn search_client_maps_hits_and_defaults_missing_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .and(body_partial_json(serde_json::json!({
            "data_store": "evaluation-reports",
            "page_size": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                {"content": "first passage", "source": "report-a.pdf"},
                {"content": "second passage"},
                {"content": "third passage", "source": "report-c.pdf"}
            ]
        })))
        .mount(&server)
        .await;

    let client = HttpSearchClient::new(
        server.uri(),
        "evaluation-reports".to_string(),
        TIMEOUT,
    );
    let chunks = client.search("coverage", 2).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].source, "report-a.pdf");
    assert_eq!(chunks[1].source, "Unknown");
}

#[tokio::test]
async fn search_client_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpSearchClient::new(server.uri(), "ds".to_string(), TIMEOUT);
    assert!(client.search("q", 5).await.is_err());
}

#[tokio::test]
async fn storage_client_uploads_and_returns_the_object_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/evidence/images/graph.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("graph.png");
    std::fs::write(&local, b"png bytes").unwrap();

    let client = StorageClient::new(server.uri(), "evidence".to_string(), TIMEOUT);
    let url = client.upload(&local, "images/graph.png").await.unwrap();
    assert_eq!(url, format!("{}/evidence/images/graph.png", server.uri()));
}

#[tokio::test]
async fn storage_client_download_writes_the_object_locally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/evidence/images/graph.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("fetched.png");

    let client = StorageClient::new(server.uri(), "evidence".to_string(), TIMEOUT);
    client.download("images/graph.png", &local).await.unwrap();
    assert_eq!(std::fs::read(&local).unwrap(), b"png bytes");
}

#[tokio::test]
async fn storage_client_upload_failure_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("graph.png");
    std::fs::write(&local, b"png bytes").unwrap();

    let client = StorageClient::new(server.uri(), "evidence".to_string(), TIMEOUT);
    assert!(client.upload(&local, "images/graph.png").await.is_err());
}
