//! Conversational turn pipeline for Parley.
//!
//! Each incoming user message runs through summarize, classify intent,
//! retrieve memories and respond, and the exchange is persisted only once
//! every step has succeeded.

pub mod error;
pub mod generator;
pub mod memory;
pub mod openai;
pub mod orchestrator;
pub mod store;
pub mod templates;
pub mod transcript;

pub use error::ChatError;
pub use generator::{Operation, TemplateArgs, TextGenerator};
pub use memory::{
    render_memories, DocumentIngestor, HttpMemoryClient, MemoryResult, MemoryRetriever,
    UploadReceipt,
};
pub use openai::OpenAiTextGenerator;
pub use orchestrator::{OrchestratorSettings, TurnOrchestrator, MEMORY_SEARCH_LIMIT};
pub use store::{ConversationStore, InMemoryConversationStore, SqliteConversationStore};
pub use templates::PromptTemplates;
pub use transcript::render_transcript;
