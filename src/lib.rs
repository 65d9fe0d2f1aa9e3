//! Evidence Assistant - retrieval-augmented chat over evaluation reports

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;

// Re-export main types for convenience
pub use crate::api::{create_router, AppState};
pub use crate::config::Config;
pub use crate::models::internal::{Conversation, Feedback, Message, NewMessage};
pub use crate::pipeline::analysis::DocumentAnalyzer;
pub use crate::pipeline::ChatPipeline;
pub use crate::services::llm_client::{HttpLlmClient, LlmProvider};
pub use crate::services::object_storage::StorageClient;
pub use crate::services::search_client::{HttpSearchClient, Retriever};
pub use crate::storage::db::init_db;
pub use crate::storage::{ConversationStore, SeaOrmConversationStore};
