//! Conversation store: bounded, most-recent-first list of saved exchanges
//!
//! Information Hiding:
//! - Record building (id, summary, content compression) happens here
//! - Persistence keys and the active-conversation slot are internal

use super::keywords::clean_keywords;
use super::types::{timestamp_id, Conversation, Message, Role};
use crate::config::ConversationConfig;
use crate::error::StorageResult;
use crate::storage::{keys, load_json, save_json, KeyValueStore};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const SUMMARY_CHARS: usize = 100;

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\n\s*").expect("line break pattern is valid"));
static INLINE_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]+").expect("inline space pattern is valid"));

/// Collapse blank lines and runs of spaces/tabs; trim the ends.
pub fn compress_content(content: &str) -> String {
    let single_breaks = LINE_BREAKS.replace_all(content, "\n");
    INLINE_SPACE.replace_all(&single_breaks, " ").trim().to_string()
}

/// First 100 characters of the (compressed) text, with "..." when cut
pub fn summarize(content: &str) -> String {
    let compressed = compress_content(content);
    let mut summary: String = compressed.chars().take(SUMMARY_CHARS).collect();
    if compressed.chars().count() > SUMMARY_CHARS {
        summary.push_str("...");
    }
    summary
}

pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active: Option<Conversation>,
    storage: Arc<dyn KeyValueStore>,
    max_conversations: usize,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, config: &ConversationConfig) -> Self {
        Self {
            conversations: Vec::new(),
            active: None,
            storage,
            max_conversations: config.max_conversations.max(1),
        }
    }

    /// Restore the saved list and the active conversation.
    pub async fn load(storage: Arc<dyn KeyValueStore>, config: &ConversationConfig) -> Self {
        let mut store = Self::new(storage, config);

        let mut conversations: Vec<Conversation> =
            load_json(store.storage.as_ref(), keys::CONVERSATIONS)
                .await
                .unwrap_or_default();
        conversations.retain(|c| !c.messages.is_empty());
        conversations.truncate(store.max_conversations);

        store.active = load_json::<Conversation>(store.storage.as_ref(), keys::CURRENT_CONVERSATION)
            .await
            .filter(|c| !c.messages.is_empty());
        store.conversations = conversations;

        tracing::debug!(
            "[ConversationStore] Loaded {} conversations (active: {})",
            store.conversations.len(),
            store.active.as_ref().map(|c| c.id.as_str()).unwrap_or("none")
        );
        store
    }

    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active.as_ref()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    fn build_record(
        &self,
        messages: &[Message],
        current_id: Option<&str>,
        keywords: &[String],
    ) -> Option<Conversation> {
        let first = messages.first()?;
        let id = current_id
            .map(str::to_string)
            .unwrap_or_else(|| timestamp_id(&first.timestamp));
        let existing = self.get(&id);

        let summary_source = messages
            .iter()
            .find(|m| m.role == Role::User)
            .unwrap_or(first);

        let merged_keywords = match existing {
            Some(conversation) => {
                clean_keywords(conversation.keywords.iter().chain(keywords.iter()))
            }
            None => clean_keywords(keywords),
        };

        let last_update = messages
            .iter()
            .map(|m| m.timestamp)
            .max()
            .unwrap_or_else(Utc::now);

        Some(Conversation {
            timestamp: existing.map(|c| c.timestamp).unwrap_or(first.timestamp),
            id,
            last_update,
            summary: summarize(&summary_source.content),
            keywords: merged_keywords,
            messages: messages
                .iter()
                .map(|m| Message {
                    content: compress_content(&m.content),
                    ..m.clone()
                })
                .collect(),
        })
    }

    /// Save the session transcript as a conversation.
    ///
    /// An existing id is replaced in place; a new id goes to the front and the
    /// list is trimmed to the bound. Returns `None` for an empty transcript.
    pub async fn upsert(
        &mut self,
        messages: &[Message],
        current_id: Option<&str>,
        keywords: &[String],
    ) -> StorageResult<Option<Conversation>> {
        let Some(record) = self.build_record(messages, current_id, keywords) else {
            return Ok(None);
        };

        match self.conversations.iter_mut().find(|c| c.id == record.id) {
            Some(slot) => *slot = record.clone(),
            None => {
                self.conversations.insert(0, record.clone());
                if self.conversations.len() > self.max_conversations {
                    let dropped = self.conversations.len() - self.max_conversations;
                    self.conversations.truncate(self.max_conversations);
                    tracing::debug!("[ConversationStore] Evicted {} oldest conversations", dropped);
                }
            }
        }

        self.active = Some(record.clone());
        self.persist().await?;

        tracing::debug!(
            "[ConversationStore] Saved conversation '{}' ({} messages)",
            record.id,
            record.messages.len()
        );
        Ok(Some(record))
    }

    /// Make a saved conversation active. Returns `None` for unknown ids.
    pub async fn select(&mut self, id: &str) -> StorageResult<Option<Conversation>> {
        let Some(conversation) = self.get(id).cloned() else {
            tracing::debug!("[ConversationStore] Conversation '{}' not found", id);
            return Ok(None);
        };

        save_json(self.storage.as_ref(), keys::CURRENT_CONVERSATION, &conversation).await?;
        self.active = Some(conversation.clone());
        Ok(Some(conversation))
    }

    /// Forget the active conversation; the saved list is untouched.
    pub async fn new_conversation(&mut self) -> StorageResult<()> {
        self.active = None;
        self.storage.remove(keys::CURRENT_CONVERSATION).await
    }

    /// Drop every saved conversation and the active session.
    pub async fn clear_all(&mut self) -> StorageResult<()> {
        self.conversations.clear();
        self.active = None;

        for key in [keys::CONVERSATIONS, keys::CURRENT_CONVERSATION, keys::CHAT_HISTORY] {
            self.storage.remove(key).await?;
        }

        tracing::info!("[ConversationStore] Cleared all conversations");
        Ok(())
    }

    async fn persist(&self) -> StorageResult<()> {
        save_json(self.storage.as_ref(), keys::CONVERSATIONS, &self.conversations).await?;
        if let Some(active) = &self.active {
            save_json(self.storage.as_ref(), keys::CURRENT_CONVERSATION, active).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStorage;
    use chrono::{DateTime, Duration, TimeZone};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn exchange(seconds: i64, question: &str) -> Vec<Message> {
        vec![
            Message::at(Role::User, question, ts(seconds)),
            Message::at(Role::Assistant, "answer", ts(seconds + 1)),
        ]
    }

    fn store() -> (ConversationStore, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        (
            ConversationStore::new(storage.clone(), &ConversationConfig::default()),
            storage,
        )
    }

    #[test]
    fn test_compress_content() {
        assert_eq!(compress_content("  a   b\t\tc  "), "a b c");
        assert_eq!(compress_content("line one\n\n\n   line two\n"), "line one\nline two");
        let once = compress_content(" x \n\n y  z ");
        assert_eq!(compress_content(&once), once);
    }

    #[test]
    fn test_summarize_truncates_with_ellipsis() {
        let long = "word ".repeat(40);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 103);
        assert!(summary.ends_with("..."));
        assert_eq!(summarize("short question"), "short question");
    }

    #[tokio::test]
    async fn test_empty_transcript_is_not_persisted() {
        let (mut store, storage) = store();
        let saved = store.upsert(&[], None, &[]).await.unwrap();

        assert!(saved.is_none());
        assert!(store.is_empty());
        assert!(!storage.contains(keys::CONVERSATIONS).await.unwrap());
    }

    #[tokio::test]
    async fn test_id_defaults_to_first_timestamp() {
        let (mut store, _) = store();
        let saved = store
            .upsert(&exchange(0, "Hello   there"), None, &["greeting".to_string()])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(saved.id, "2024-06-01T08:00:00.000000Z");
        assert_eq!(saved.timestamp, ts(0));
        assert_eq!(saved.last_update, ts(1));
        assert_eq!(saved.summary, "Hello there");
        assert_eq!(saved.messages[0].content, "Hello there");
        assert_eq!(store.active().unwrap().id, saved.id);
    }

    #[tokio::test]
    async fn test_existing_id_replaced_in_place() {
        let (mut store, _) = store();
        let first = store.upsert(&exchange(0, "first"), None, &[]).await.unwrap().unwrap();
        store.upsert(&exchange(10, "second"), None, &[]).await.unwrap();

        let mut messages = exchange(0, "first");
        messages.push(Message::at(Role::User, "follow-up", ts(20)));
        store
            .upsert(&messages, Some(&first.id), &["rust".to_string()])
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
        // Replacement keeps position: "second" is still in front
        assert_eq!(store.list()[0].summary, "second");
        let updated = &store.list()[1];
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.messages.len(), 3);
        assert_eq!(updated.last_update, ts(20));
        assert_eq!(updated.keywords, vec!["rust"]);
    }

    #[tokio::test]
    async fn test_keywords_accumulate_across_upserts() {
        let (mut store, _) = store();
        let messages = exchange(0, "q");
        let id = timestamp_id(&ts(0));

        store
            .upsert(&messages, Some(&id), &["dog".to_string(), "blue".to_string()])
            .await
            .unwrap();
        let saved = store
            .upsert(&messages, Some(&id), &["Dog".to_string(), "chien".to_string()])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(saved.keywords, vec!["dog", "blue", "chien"]);
    }

    #[tokio::test]
    async fn test_retention_bound() {
        let (mut store, _) = store();

        for i in 0..51 {
            store
                .upsert(&exchange(i * 10, &format!("question {}", i)), None, &[])
                .await
                .unwrap();
        }

        assert_eq!(store.len(), 50);
        assert_eq!(store.list()[0].summary, "question 50");
        assert_eq!(store.list()[49].summary, "question 1");
        assert!(store.get(&timestamp_id(&ts(0))).is_none());
    }

    #[tokio::test]
    async fn test_round_trip_persistence() {
        let (mut store, storage) = store();
        let saved = store
            .upsert(&exchange(0, "persist me"), None, &["persist".to_string()])
            .await
            .unwrap()
            .unwrap();

        let reloaded = ConversationStore::load(storage, &ConversationConfig::default()).await;
        assert_eq!(reloaded.get(&saved.id), Some(&saved));
        assert_eq!(reloaded.active(), Some(&saved));
    }

    #[tokio::test]
    async fn test_select_and_new_conversation() {
        let (mut store, storage) = store();
        let first = store.upsert(&exchange(0, "first"), None, &[]).await.unwrap().unwrap();
        store.upsert(&exchange(10, "second"), None, &[]).await.unwrap();

        let selected = store.select(&first.id).await.unwrap().unwrap();
        assert_eq!(selected.summary, "first");
        assert_eq!(store.active().unwrap().id, first.id);
        assert!(store.select("missing").await.unwrap().is_none());

        store.new_conversation().await.unwrap();
        assert!(store.active().is_none());
        assert_eq!(store.len(), 2);
        assert!(!storage.contains(keys::CURRENT_CONVERSATION).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let (mut store, storage) = store();
        store.upsert(&exchange(0, "first"), None, &[]).await.unwrap();
        storage.set(keys::CHAT_HISTORY, "[]").await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.is_empty());
        assert!(store.active().is_none());
        for key in [keys::CONVERSATIONS, keys::CURRENT_CONVERSATION, keys::CHAT_HISTORY] {
            assert!(!storage.contains(key).await.unwrap());
        }
    }
}
