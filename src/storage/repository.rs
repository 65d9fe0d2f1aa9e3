use async_trait::async_trait;
use sea_orm::{prelude::*, QueryOrder, Set};
use uuid::Uuid;

use crate::models::internal::{Conversation, Feedback, Message, NewMessage, User};
use crate::storage::entities::{conversations, messages, users};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// ============================================
// TRAIT DEFINITION
// ============================================
//
// The hierarchy mirrors the document-store path scheme
// users/{user_id}/conversations/{conversation_id}/messages/{message_id}.
// Path ids scope every query; there is no session-to-path authorization
// check beyond that, matching the original contract.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Creates a conversation, stamping `created_at` = now (UTC) in the store.
    async fn create_conversation(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<Conversation, StoreError>;

    /// All conversations of a user, newest first. Unbounded, no pagination.
    async fn get_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError>;

    async fn find_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Deletes the conversation record only. Its messages are deliberately
    /// left orphaned; see migrations/002.
    async fn delete_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(), StoreError>;

    /// First non-empty title wins under normal flow. Concurrent callers race
    /// with last-write-wins; no lock is taken. Returns whether the title was
    /// written.
    async fn set_title_if_empty(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        title: &str,
    ) -> Result<bool, StoreError>;

    /// Inserts a message, stamping `timestamp` = now (UTC) in the store, not
    /// the caller.
    async fn save_message(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> Result<Message, StoreError>;

    /// All messages of a conversation, timestamp ascending. Two messages
    /// written within the same clock tick have no defined relative order.
    async fn get_messages(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, StoreError>;

    async fn delete_message(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Updates only the feedback fields of the message addressed by its
    /// stable id. Positional indexes are never accepted here.
    async fn update_message_feedback(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        feedback: Feedback,
    ) -> Result<(), StoreError>;
}

// ============================================
// IMPLEMENTATION STRUCT
// ============================================
pub struct SeaOrmConversationStore {
    db: DatabaseConnection,
}

impl SeaOrmConversationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn now() -> chrono::NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }
}

#[async_trait]
impl ConversationStore for SeaOrmConversationStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        if email.is_empty() {
            return Err(StoreError::InvalidInput("email must not be empty".into()));
        }

        let id = Uuid::new_v4();
        let now = Self::now();

        let user = users::ActiveModel {
            id: Set(id.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            created_at: Set(now.to_string()),
        };
        user.insert(&self.db).await?;
        tracing::info!("Registered user: {}", id);

        Ok(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?;

        Ok(model.map(User::from))
    }

    async fn create_conversation(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let id = Uuid::new_v4();
        let now = Self::now();

        let conversation = conversations::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(user_id.to_string()),
            title: Set(title.to_string()),
            created_at: Set(now.to_string()),
        };
        conversation.insert(&self.db).await?;
        tracing::info!("Created conversation {} for user {}", id, user_id);

        Ok(Conversation {
            id,
            user_id,
            title: title.to_string(),
            created_at: now,
        })
    }

    async fn get_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        let models = conversations::Entity::find()
            .filter(conversations::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(conversations::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Conversation::from).collect())
    }

    async fn find_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, StoreError> {
        let model = conversations::Entity::find_by_id(conversation_id.to_string())
            .filter(conversations::Column::UserId.eq(user_id.to_string()))
            .one(&self.db)
            .await?;

        Ok(model.map(Conversation::from))
    }

    async fn delete_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(), StoreError> {
        let result = conversations::Entity::delete_many()
            .filter(conversations::Column::Id.eq(conversation_id.to_string()))
            .filter(conversations::Column::UserId.eq(user_id.to_string()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!(
                "Conversation {} not found",
                conversation_id
            )));
        }

        tracing::info!(
            "Deleted conversation {} (messages left in place)",
            conversation_id
        );
        Ok(())
    }

    async fn set_title_if_empty(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        title: &str,
    ) -> Result<bool, StoreError> {
        let model = conversations::Entity::find_by_id(conversation_id.to_string())
            .filter(conversations::Column::UserId.eq(user_id.to_string()))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("Conversation {} not found", conversation_id))
            })?;

        if !model.title.is_empty() {
            return Ok(false);
        }

        let mut active: conversations::ActiveModel = model.into();
        active.title = Set(title.to_string());
        active.update(&self.db).await?;
        Ok(true)
    }

    async fn save_message(
        &self,
        _user_id: Uuid,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> Result<Message, StoreError> {
        let id = Uuid::new_v4();
        let now = Self::now();

        let model = messages::ActiveModel {
            id: Set(id.to_string()),
            conversation_id: Set(conversation_id.to_string()),
            query: Set(message.query.clone()),
            response: Set(message.response.clone()),
            timestamp: Set(now.to_string()),
            feedback_rating: Set(None),
            feedback_comment: Set(None),
            graphic_url: Set(message.graphic_url.clone()),
        };
        model.insert(&self.db).await?;
        tracing::debug!("Stored message {} in conversation {}", id, conversation_id);

        Ok(Message {
            id,
            conversation_id,
            query: message.query,
            response: message.response,
            timestamp: now,
            feedback_rating: None,
            feedback_comment: None,
            graphic_url: message.graphic_url,
        })
    }

    async fn get_messages(
        &self,
        _user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, StoreError> {
        let models = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .order_by_asc(messages::Column::Timestamp)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Message::from).collect())
    }

    async fn delete_message(
        &self,
        _user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), StoreError> {
        let result = messages::Entity::delete_many()
            .filter(messages::Column::Id.eq(message_id.to_string()))
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!(
                "Message {} not found",
                message_id
            )));
        }
        Ok(())
    }

    async fn update_message_feedback(
        &self,
        _user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        feedback: Feedback,
    ) -> Result<(), StoreError> {
        let model = messages::Entity::find_by_id(message_id.to_string())
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Message {} not found", message_id)))?;

        let mut active: messages::ActiveModel = model.into();
        active.feedback_rating = Set(feedback.rating);
        active.feedback_comment = Set(feedback.comment);
        active.update(&self.db).await?;
        Ok(())
    }
}

// ============================================
// Conversions
// ============================================

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: Uuid::parse_str(&model.id).unwrap(),
            email: model.email,
            password_hash: model.password_hash,
            created_at: chrono::NaiveDateTime::parse_from_str(&model.created_at, TIMESTAMP_FORMAT)
                .unwrap(),
        }
    }
}

impl From<conversations::Model> for Conversation {
    fn from(model: conversations::Model) -> Self {
        Self {
            id: Uuid::parse_str(&model.id).unwrap(),
            user_id: Uuid::parse_str(&model.user_id).unwrap(),
            title: model.title,
            created_at: chrono::NaiveDateTime::parse_from_str(&model.created_at, TIMESTAMP_FORMAT)
                .unwrap(),
        }
    }
}

impl From<messages::Model> for Message {
    fn from(model: messages::Model) -> Self {
        Self {
            id: Uuid::parse_str(&model.id).unwrap(),
            conversation_id: Uuid::parse_str(&model.conversation_id).unwrap(),
            query: model.query,
            response: model.response,
            timestamp: chrono::NaiveDateTime::parse_from_str(&model.timestamp, TIMESTAMP_FORMAT)
                .unwrap(),
            feedback_rating: model.feedback_rating,
            feedback_comment: model.feedback_comment,
            graphic_url: model.graphic_url,
        }
    }
}
