pub mod document_text;
pub mod llm_client;
pub mod object_storage;
pub mod search_client;

pub use llm_client::{HttpLlmClient, LlmError, LlmProvider};
pub use object_storage::{sanitize_filename, StorageClient, StorageError};
pub use search_client::{HttpSearchClient, Retriever, SearchError};
