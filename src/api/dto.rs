use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::internal::Message;
use crate::pipeline::analysis::AnalysisTable;
use crate::pipeline::response::GenerationStatus;

// ==================== REQUEST DTOs ====================

// Fields arrive as Options so a missing field maps to an explicit 400
// instead of a serde rejection.

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ChatRequest {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SaveMessageRequest {
    pub query: Option<String>,
    pub response: Option<String>,
    pub graphic_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct FeedbackRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

// ==================== RESPONSE DTOs ====================

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub query: String,
    pub response: String,
    pub status: GenerationStatus,
    pub graphic_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationChatResponse {
    pub message: Message,
    pub status: GenerationStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub analysis: String,
    pub table: AnalysisTable,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryDocumentResponse {
    pub response: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u32,
}
