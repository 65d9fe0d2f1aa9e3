use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Longest conversation title before truncation kicks in.
pub const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub query: String,
    pub response: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: NaiveDateTime,
    pub feedback_rating: Option<i32>,
    pub feedback_comment: Option<String>,
    pub graphic_url: Option<String>,
}

/// Message payload as supplied by callers. The store stamps the timestamp
/// and generates the id at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub query: String,
    pub response: String,
    pub graphic_url: Option<String>,
}

/// Mutable post-hoc feedback fields of a message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Feedback {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// One retrieved passage plus its origin reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Chunk {
    pub chunk: String,
    pub source: String,
}

/// Derives a conversation display name from its first query: the first
/// [`TITLE_MAX_CHARS`] characters, with an ellipsis marker when truncated.
pub fn derive_title(query: &str) -> String {
    let mut title: String = query.chars().take(TITLE_MAX_CHARS).collect();
    if query.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}
