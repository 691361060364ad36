//! Chat Controller - Active Session State Machine
//!
//! Information Hiding:
//! - Storage backend and completion backend injected, never global
//! - Keyword extraction, topic matching and conversation saving happen as
//!   side effects of `send_message`
//! - Streaming is a spawned producer feeding a channel; the controller consumes

use crate::config::Settings;
use crate::core::llm::{ChatMessage, CompletionService};
use crate::error::{CompletionError, StorageResult};
use crate::memory::{
    ContextRetriever, Conversation, ConversationStore, KeywordExtractor, Message, Role, Topic,
    TopicStore,
};
use crate::storage::{keys, load_json, save_json, KeyValueStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No request in flight
    Idle,
    /// User message appended, request dispatched
    Sending,
    /// Receiving deltas
    Streaming,
    /// Request failed; transient, the controller returns to `Idle`
    Errored,
}

/// Result of one `send_message` call
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank input, nothing appended or sent
    Ignored,
    Completed(Message),
    /// Stopped by the caller; carries the partial reply if any text arrived
    Cancelled(Option<Message>),
    /// Completion failed; carries the error text shown in the transcript
    Failed(String),
}

pub struct ChatController {
    completion: Arc<dyn CompletionService>,
    extractor: Arc<dyn KeywordExtractor>,
    storage: Arc<dyn KeyValueStore>,
    topics: TopicStore,
    conversations: ConversationStore,
    messages: Vec<Message>,
    current_id: Option<String>,
    state: SessionState,
    system_prompt: Option<String>,
    stream_buffer_size: usize,
}

impl ChatController {
    /// Controller with empty stores
    pub fn new(
        completion: Arc<dyn CompletionService>,
        extractor: Arc<dyn KeywordExtractor>,
        storage: Arc<dyn KeyValueStore>,
        settings: &Settings,
    ) -> Self {
        Self {
            topics: TopicStore::new(storage.clone(), &settings.topics),
            conversations: ConversationStore::new(storage.clone(), &settings.conversations),
            completion,
            extractor,
            storage,
            messages: Vec::new(),
            current_id: None,
            state: SessionState::Idle,
            system_prompt: settings.llm.system_prompt.clone(),
            stream_buffer_size: settings.llm.stream_buffer_size.max(1),
        }
    }

    /// Controller with persisted topics, conversations and the active session
    pub async fn load(
        completion: Arc<dyn CompletionService>,
        extractor: Arc<dyn KeywordExtractor>,
        storage: Arc<dyn KeyValueStore>,
        settings: &Settings,
    ) -> Self {
        let mut controller = Self::new(completion, extractor, storage.clone(), settings);
        controller.topics = TopicStore::load(storage.clone(), &settings.topics).await;
        controller.conversations =
            ConversationStore::load(storage.clone(), &settings.conversations).await;

        let active = controller.conversations.active().cloned();
        let transcript: Option<Vec<Message>> = load_json(storage.as_ref(), keys::CHAT_HISTORY).await;

        controller.messages = match (transcript, &active) {
            (Some(messages), _) if !messages.is_empty() => messages,
            (_, Some(conversation)) => conversation.messages.clone(),
            _ => Vec::new(),
        };
        controller.current_id = active.map(|c| c.id);

        tracing::info!(
            "[ChatController] Restored session with {} messages, {} topics, {} conversations",
            controller.messages.len(),
            controller.topics.len(),
            controller.conversations.len()
        );
        controller
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_conversation_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn topics(&self) -> &TopicStore {
        &self.topics
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Send a message and stream the reply. `on_update` sees the visible
    /// transcript after the user message is appended, after every delta and
    /// once more when the turn is finished.
    pub async fn send_message<F>(&mut self, input: &str, on_update: F) -> SendOutcome
    where
        F: FnMut(&[Message]),
    {
        self.send_message_with_cancel(input, CancellationToken::new(), on_update)
            .await
    }

    pub async fn send_message_with_cancel<F>(
        &mut self,
        input: &str,
        cancel: CancellationToken,
        mut on_update: F,
    ) -> SendOutcome
    where
        F: FnMut(&[Message]),
    {
        let content = input.trim();
        if content.is_empty() {
            return SendOutcome::Ignored;
        }

        let user_message = Message::user(content);
        self.messages.push(user_message.clone());
        self.state = SessionState::Sending;
        self.persist_transcript().await;
        on_update(&self.messages);

        // Extraction may be a remote model call and must observe `cancel` too
        let retriever = ContextRetriever::new(&self.topics, self.extractor.as_ref());
        let retrieved = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            context = retriever.retrieve(content) => Some(context),
        };
        let Some(context) = retrieved else {
            tracing::info!("[ChatController] Request cancelled before dispatch");
            self.state = SessionState::Idle;
            on_update(&self.messages);
            return SendOutcome::Cancelled(None);
        };
        let request = self.outgoing_request(&context.prompt);

        tracing::debug!(
            "[ChatController] Dispatching {} messages ({} related topics)",
            request.len(),
            context.related.len()
        );

        let (tx, mut rx) = mpsc::channel(self.stream_buffer_size);
        let completion = Arc::clone(&self.completion);
        let producer =
            tokio::spawn(async move { completion.stream_completion(request, tx).await });

        let mut streaming = false;
        let mut cancelled = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    producer.abort();
                    cancelled = true;
                    break;
                }
                delta = rx.recv() => match delta {
                    Some(delta) => {
                        if !streaming {
                            streaming = true;
                            self.state = SessionState::Streaming;
                            self.messages.push(Message::assistant(String::new()));
                        }
                        if let Some(partial) = self.messages.last_mut() {
                            partial.content.push_str(&delta);
                        }
                        on_update(&self.messages);
                    }
                    None => break,
                }
            }
        }

        if cancelled {
            tracing::info!("[ChatController] Request cancelled");
            let partial = if streaming {
                Some(self.finish_reply(&user_message, &context.keywords).await)
            } else {
                self.state = SessionState::Idle;
                None
            };
            on_update(&self.messages);
            return SendOutcome::Cancelled(partial);
        }

        let result = match producer.await {
            Ok(result) => result,
            Err(e) => Err(CompletionError::Task(e.to_string())),
        };
        let result = match result {
            Ok(()) if !streaming => Err(CompletionError::Stream("empty response".to_string())),
            other => other,
        };

        let outcome = match result {
            Ok(()) => SendOutcome::Completed(self.finish_reply(&user_message, &context.keywords).await),
            Err(e) => SendOutcome::Failed(self.fail_turn(e, streaming).await),
        };
        on_update(&self.messages);
        outcome
    }

    /// Prior transcript without synthetic error entries, then the (possibly
    /// context-augmented) question. The stored user message is not touched.
    fn outgoing_request(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut request = Vec::with_capacity(self.messages.len() + 1);

        if let Some(system) = &self.system_prompt {
            request.push(ChatMessage::new("system", system.clone()));
        }

        let prior = &self.messages[..self.messages.len().saturating_sub(1)];
        request.extend(
            prior
                .iter()
                .filter(|m| m.role != Role::System)
                .map(Message::to_chat_message),
        );
        request.push(ChatMessage::new("user", prompt));
        request
    }

    async fn finish_reply(&mut self, user_message: &Message, keywords: &[String]) -> Message {
        let reply = match self.messages.last_mut() {
            Some(last) => {
                let trimmed_len = last.content.trim_end().len();
                last.content.truncate(trimmed_len);
                last.clone()
            }
            None => Message::assistant(String::new()),
        };

        self.persist_transcript().await;

        match self.topics.update_topic(user_message, keywords).await {
            Ok(Some(key)) => tracing::debug!("[ChatController] Message filed under topic '{}'", key),
            Ok(None) => {}
            Err(e) => tracing::warn!("[ChatController] Failed to save topics: {}", e),
        }

        match self
            .conversations
            .upsert(&self.messages, self.current_id.as_deref(), keywords)
            .await
        {
            Ok(Some(conversation)) => self.current_id = Some(conversation.id),
            Ok(None) => {}
            Err(e) => tracing::warn!("[ChatController] Failed to save conversation: {}", e),
        }

        self.state = SessionState::Idle;
        reply
    }

    async fn fail_turn(&mut self, error: CompletionError, streaming: bool) -> String {
        tracing::error!("[ChatController] Completion failed: {}", error);
        self.state = SessionState::Errored;

        if streaming {
            self.messages.pop();
        }

        let text = format!("Sorry, the assistant could not answer: {}", error);
        self.messages.push(Message::system(text.clone()));
        self.persist_transcript().await;

        self.state = SessionState::Idle;
        text
    }

    async fn persist_transcript(&self) {
        if let Err(e) = save_json(self.storage.as_ref(), keys::CHAT_HISTORY, &self.messages).await {
            tracing::warn!("[ChatController] Failed to save chat history: {}", e);
        }
    }

    /// Topics related to `query`, most recently updated first
    pub async fn find_related_topics(&self, query: &str) -> Vec<Topic> {
        self.topics
            .find_related_topics(self.extractor.as_ref(), query)
            .await
    }

    /// Load a saved conversation into the active session
    pub async fn select_conversation(&mut self, id: &str) -> StorageResult<Option<Conversation>> {
        let Some(conversation) = self.conversations.select(id).await? else {
            return Ok(None);
        };

        self.messages = conversation.messages.clone();
        self.current_id = Some(conversation.id.clone());
        save_json(self.storage.as_ref(), keys::CHAT_HISTORY, &self.messages).await?;

        tracing::info!("[ChatController] Switched to conversation '{}'", conversation.id);
        Ok(Some(conversation))
    }

    /// Start an empty session; saved conversations are kept
    pub async fn new_conversation(&mut self) -> StorageResult<()> {
        self.messages.clear();
        self.current_id = None;
        self.conversations.new_conversation().await?;
        self.storage.remove(keys::CHAT_HISTORY).await
    }

    /// Forget every conversation, topic and the active session.
    /// Callers are expected to confirm with the user first.
    pub async fn clear_all(&mut self) -> StorageResult<()> {
        self.messages.clear();
        self.current_id = None;
        self.conversations.clear_all().await?;
        self.topics.clear().await
    }
}
