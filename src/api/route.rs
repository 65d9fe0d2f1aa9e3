use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::routes::*;

// Uploaded evaluation reports run tens of megabytes
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/analyze", post(analyze))
        .route("/query", post(query_document))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route(
            "/users/{user_id}/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/users/{user_id}/conversations/{conversation_id}",
            delete(delete_conversation),
        )
        .route(
            "/users/{user_id}/conversations/{conversation_id}/chat",
            post(conversation_chat),
        )
        .route(
            "/users/{user_id}/conversations/{conversation_id}/messages",
            get(list_messages).post(save_message),
        )
        .route(
            "/users/{user_id}/conversations/{conversation_id}/messages/{message_id}",
            delete(delete_message),
        )
        .route(
            "/users/{user_id}/conversations/{conversation_id}/messages/{message_id}/feedback",
            put(update_feedback),
        )
        .route("/images/{filename}", get(get_image))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
