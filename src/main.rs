use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evidence_assistant::{
    api::{create_router, AppState},
    config::Config,
    pipeline::{analysis::DocumentAnalyzer, ChatPipeline},
    services::{
        llm_client::HttpLlmClient, object_storage::StorageClient,
        search_client::HttpSearchClient,
    },
    storage::{self, SeaOrmConversationStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evidence_assistant=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let config = Arc::new(Config::load()?);

    // Initialize database
    let db_conn = storage::db::init_db(&config.database_url).await?;
    let store = Arc::new(SeaOrmConversationStore::new(db_conn));

    // Rendered graphics land here before upload and are served from here
    tokio::fs::create_dir_all(&config.image_dir).await?;

    // Outbound clients
    let llm = Arc::new(HttpLlmClient::from_config(&config));
    let retriever = Arc::new(HttpSearchClient::from_config(&config));
    let object_storage = StorageClient::from_config(&config);

    let pipeline = Arc::new(ChatPipeline::new(
        retriever,
        llm.clone(),
        object_storage,
        &config,
    ));
    let analyzer = Arc::new(DocumentAnalyzer::new(llm));

    let state = AppState {
        config: config.clone(),
        store,
        pipeline,
        analyzer,
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("127.0.0.1:{}", config.server_port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 Server listening on {}", addr);
    tracing::info!("🧠 LLM endpoint: {}", config.llm_url);
    tracing::info!("🔍 Search endpoint: {}", config.search_url);
    tracing::info!("🗄️ Object storage: {}", config.storage_url);

    axum::serve(listener, app).await?;

    Ok(())
}
