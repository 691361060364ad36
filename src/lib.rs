//! Chatmind - topic-aware chat memory for LLM conversations
//!
//! This library keeps a streaming chat session together with a bounded
//! history of saved conversations and keyword topics, and feeds related
//! topics back into new prompts as context.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod memory;
pub mod render;
pub mod session;
pub mod storage;
pub mod utils;

pub use config::Settings;
pub use error::{CompletionError, DiagramRenderError, ExtractionError, StorageError};
pub use memory::{Conversation, Message, Role, Topic};
pub use session::{ChatController, SendOutcome, SessionState};

use crate::config::KeywordStrategy;
use crate::core::{CompletionService, LLMClient};
use crate::memory::{KeywordExtractor, LocalKeywordExtractor, RemoteKeywordExtractor};
use std::sync::Arc;

/// Keyword extractor for the configured strategy
pub fn build_extractor(
    settings: &Settings,
    completion: Arc<dyn CompletionService>,
) -> Arc<dyn KeywordExtractor> {
    match settings.keywords.strategy {
        KeywordStrategy::Remote => Arc::new(RemoteKeywordExtractor::new(completion)),
        KeywordStrategy::Local => Arc::new(LocalKeywordExtractor::new(
            settings.keywords.max_local_keywords,
        )),
    }
}

/// Build a controller from settings: HTTP client, extractor and storage
/// backend, with the persisted session restored.
pub async fn init(settings: &Settings, api_key: String) -> anyhow::Result<ChatController> {
    let completion: Arc<dyn CompletionService> =
        Arc::new(LLMClient::new(api_key, settings.llm.clone())?);
    let extractor = build_extractor(settings, completion.clone());
    let storage = storage::open_backend(&settings.storage).await?;

    let controller = ChatController::load(completion, extractor, storage, settings).await;

    tracing::info!(
        "Chatmind initialized (model: {}, storage: {:?})",
        settings.llm.model,
        settings.storage.backend
    );
    Ok(controller)
}
