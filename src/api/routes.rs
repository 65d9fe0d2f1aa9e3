use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::dto::*,
    auth,
    config::Config,
    models::internal::{derive_title, Feedback, NewMessage},
    pipeline::analysis::{text_to_table, DocumentAnalyzer},
    pipeline::ChatPipeline,
    services::document_text::{detect_kind, extract_text, ExtractError},
    storage::{ConversationStore, StoreError},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ConversationStore>,
    pub pipeline: Arc<ChatPipeline>,
    pub analyzer: Arc<DocumentAnalyzer>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: status.as_u16() as u32,
        }),
    )
}

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(_) => error(StatusCode::NOT_FOUND, e.to_string()),
        StoreError::InvalidInput(_) => error(StatusCode::BAD_REQUEST, e.to_string()),
        StoreError::Db(_) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn extract_error(e: ExtractError) -> ApiError {
    match e {
        ExtractError::Unsupported(_) => error(
            StatusCode::BAD_REQUEST,
            "Unsupported file type. Please upload a PDF or DOCX file.",
        ),
        ExtractError::Empty => error(StatusCode::BAD_REQUEST, e.to_string()),
        ExtractError::Pdf(_) | ExtractError::Docx(_) => {
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn require(field: Option<String>, name: &str) -> Result<String, ApiError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(error(StatusCode::BAD_REQUEST, format!("Missing {}", name))),
    }
}

// ==================== CHAT ====================

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let query = require(req.query, "query")?;
    let reply = state.pipeline.chat(&query).await;

    Ok(Json(ChatResponse {
        query,
        response: reply.response,
        status: reply.status,
        graphic_url: reply.graphic_url,
    }))
}

/// Chat inside a conversation: runs the pipeline, persists the exchange,
/// then lazily titles the conversation from its first query.
pub async fn conversation_chat(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ChatRequest>,
) -> Result<(StatusCode, Json<ConversationChatResponse>), ApiError> {
    let query = require(req.query, "query")?;

    state
        .store
        .find_conversation(user_id, conversation_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Conversation not found"))?;

    let reply = state.pipeline.chat(&query).await;

    let message = state
        .store
        .save_message(
            user_id,
            conversation_id,
            NewMessage {
                query: query.clone(),
                response: reply.response,
                graphic_url: reply.graphic_url,
            },
        )
        .await
        .map_err(store_error)?;

    state
        .store
        .set_title_if_empty(user_id, conversation_id, &derive_title(&query))
        .await
        .map_err(store_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ConversationChatResponse {
            message,
            status: reply.status,
        }),
    ))
}

// ==================== AUTH ====================

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = require(req.email, "email")?;
    let password = require(req.password, "password")?;

    if state
        .store
        .find_user_by_email(&email)
        .await
        .map_err(store_error)?
        .is_some()
    {
        return Err(error(StatusCode::BAD_REQUEST, "Email already registered"));
    }

    let user = state
        .store
        .create_user(&email, &auth::hash_password(&password))
        .await
        .map_err(store_error)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = require(req.email, "email")?;
    let password = require(req.password, "password")?;

    let user = state
        .store
        .find_user_by_email(&email)
        .await
        .map_err(store_error)?;

    match user {
        Some(user) if auth::verify_password(&password, &user.password_hash) => {
            Ok(Json(AuthResponse {
                message: "Login successful".to_string(),
                user_id: user.id,
            }))
        }
        _ => Err(error(StatusCode::UNAUTHORIZED, "Invalid email or password")),
    }
}

// ==================== CONVERSATIONS ====================

pub async fn create_conversation(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<crate::models::internal::Conversation>), ApiError> {
    let conversation = state
        .store
        .create_conversation(user_id, req.title.as_deref().unwrap_or_default())
        .await
        .map_err(store_error)?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<crate::models::internal::Conversation>>, ApiError> {
    let conversations = state
        .store
        .get_conversations(user_id)
        .await
        .map_err(store_error)?;
    Ok(Json(conversations))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .delete_conversation(user_id, conversation_id)
        .await
        .map_err(store_error)?;
    Ok(Json(MessageResponse {
        message: "Conversation deleted".to_string(),
    }))
}

// ==================== MESSAGES ====================

pub async fn list_messages(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<crate::models::internal::Message>>, ApiError> {
    let messages = state
        .store
        .get_messages(user_id, conversation_id)
        .await
        .map_err(store_error)?;
    Ok(Json(messages))
}

pub async fn save_message(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SaveMessageRequest>,
) -> Result<(StatusCode, Json<crate::models::internal::Message>), ApiError> {
    let query = require(req.query, "query")?;
    let response = require(req.response, "response")?;

    let message = state
        .store
        .save_message(
            user_id,
            conversation_id,
            NewMessage {
                query,
                response,
                graphic_url: req.graphic_url,
            },
        )
        .await
        .map_err(store_error)?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path((user_id, conversation_id, message_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .delete_message(user_id, conversation_id, message_id)
        .await
        .map_err(store_error)?;
    Ok(Json(MessageResponse {
        message: "Message deleted".to_string(),
    }))
}

pub async fn update_feedback(
    State(state): State<AppState>,
    Path((user_id, conversation_id, message_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .update_message_feedback(
            user_id,
            conversation_id,
            message_id,
            Feedback {
                rating: req.rating,
                comment: req.comment,
            },
        )
        .await
        .map_err(store_error)?;
    Ok(Json(MessageResponse {
        message: "Feedback updated".to_string(),
    }))
}

// ==================== DOCUMENT ANALYSIS ====================

struct UploadedFile {
    content_type: String,
    bytes: Vec<u8>,
}

/// Pulls the `file` part (and optionally `query`) out of a multipart body.
async fn read_upload(
    multipart: &mut Multipart,
) -> Result<(Option<UploadedFile>, Option<String>), ApiError> {
    let mut file = None;
    let mut query = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
                file = Some(UploadedFile {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("query") => {
                query = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?,
                );
            }
            _ => {}
        }
    }
    Ok((file, query))
}

async fn extract_upload_text(file: UploadedFile) -> Result<String, ApiError> {
    let kind = detect_kind(&file.content_type).map_err(extract_error)?;
    // PDF extraction is CPU-bound on large reports
    tokio::task::spawn_blocking(move || extract_text(kind, &file.bytes))
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(extract_error)
}

pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (file, _) = read_upload(&mut multipart).await?;
    let file = file.ok_or_else(|| error(StatusCode::BAD_REQUEST, "No file part"))?;

    let text = extract_upload_text(file).await?;
    let analysis = state
        .analyzer
        .analyze(&text)
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let table = text_to_table(&analysis);
    Ok(Json(AnalyzeResponse { analysis, table }))
}

pub async fn query_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<QueryDocumentResponse>, ApiError> {
    let (file, query) = read_upload(&mut multipart).await?;
    let file = file.ok_or_else(|| error(StatusCode::BAD_REQUEST, "No file part"))?;
    let query = require(query, "query")?;

    let text = extract_upload_text(file).await?;
    let response = state
        .analyzer
        .query(&text, &query)
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(QueryDocumentResponse { response }))
}

// ==================== IMAGES / HEALTH ====================

pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Path traversal guard; generated filenames never contain separators
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(error(StatusCode::NOT_FOUND, "Image not found"));
    }

    let path = std::path::Path::new(&state.config.image_dir).join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| error(StatusCode::NOT_FOUND, "Image not found"))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

pub async fn health() -> &'static str {
    "OK"
}
