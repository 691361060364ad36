//! Topic store: keyword clusters with merge-on-similarity
//!
//! Topics are kept most-recently-updated first. That order is the iteration
//! order for matching and for `find_related`, and the eviction order when the
//! store is full (the tail goes first).

use super::extractor::{extract_clean_keywords, KeywordExtractor};
use super::keywords::{clean_keywords, similarity};
use super::types::{Message, Topic};
use crate::config::TopicConfig;
use crate::error::StorageResult;
use crate::storage::{keys, load_json, save_json, KeyValueStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

const SUMMARY_CHARS: usize = 100;

pub struct TopicStore {
    topics: Vec<Topic>,
    storage: Arc<dyn KeyValueStore>,
    threshold: f64,
    max_topics: usize,
}

impl TopicStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, config: &TopicConfig) -> Self {
        Self {
            topics: Vec::new(),
            storage,
            threshold: config.similarity_threshold,
            max_topics: config.max_topics.max(1),
        }
    }

    /// Restore persisted topics; missing or corrupt state starts empty.
    pub async fn load(storage: Arc<dyn KeyValueStore>, config: &TopicConfig) -> Self {
        let mut store = Self::new(storage, config);
        let mut topics: Vec<Topic> = load_json(store.storage.as_ref(), keys::CONVERSATION_TOPICS)
            .await
            .unwrap_or_default();

        topics.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        topics.truncate(store.max_topics);
        tracing::debug!("[TopicStore] Loaded {} topics", topics.len());

        store.topics = topics;
        store
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn get(&self, key: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.key == key)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Best merge target: highest similarity at or above the threshold. Ties go
    /// to the earlier entry, i.e. the most recently updated topic.
    fn best_match(&self, keywords: &[String]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (index, topic) in self.topics.iter().enumerate() {
            let score = similarity(&topic.keywords, keywords);
            if score <= 0.0 || score < self.threshold {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        best.map(|(index, _)| index)
    }

    fn derive_key(&self, keywords: &[String]) -> String {
        let mut sorted: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        sorted.sort();
        let base = sorted.join("-");

        if self.get(&base).is_none() {
            return base;
        }

        (2..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or(base)
    }

    /// Merge `keywords` into the most similar topic or create a new one.
    ///
    /// Returns the key of the touched topic, or `None` when there are no usable
    /// keywords. `message` supplies the summary of a new topic and the time.
    pub async fn update_topic(
        &mut self,
        message: &Message,
        keywords: &[String],
    ) -> StorageResult<Option<String>> {
        let keywords = clean_keywords(keywords);
        if keywords.is_empty() {
            tracing::debug!("[TopicStore] No keywords, topic store untouched");
            return Ok(None);
        }

        let key = match self.best_match(&keywords) {
            Some(index) => self.merge_into(index, &keywords, message.timestamp),
            None => self.create(&keywords, message),
        };

        self.persist().await?;
        Ok(Some(key))
    }

    /// Extract keywords from the message, then [`TopicStore::update_topic`]
    pub async fn update_topic_from_message(
        &mut self,
        extractor: &dyn KeywordExtractor,
        message: &Message,
    ) -> StorageResult<Option<String>> {
        let keywords = extract_clean_keywords(extractor, &message.content).await;
        self.update_topic(message, &keywords).await
    }

    fn merge_into(&mut self, index: usize, keywords: &[String], now: DateTime<Utc>) -> String {
        let mut topic = self.topics.remove(index);
        topic.keywords = clean_keywords(topic.keywords.iter().chain(keywords.iter()));
        topic.last_update = now;

        tracing::debug!(
            "[TopicStore] Merged {} keywords into topic '{}'",
            keywords.len(),
            topic.key
        );

        let key = topic.key.clone();
        self.topics.insert(0, topic);
        key
    }

    fn create(&mut self, keywords: &[String], message: &Message) -> String {
        let key = self.derive_key(keywords);
        let topic = Topic {
            key: key.clone(),
            keywords: keywords.to_vec(),
            created: message.timestamp,
            last_update: message.timestamp,
            summary: message.content.chars().take(SUMMARY_CHARS).collect(),
        };

        self.topics.insert(0, topic);
        if self.topics.len() > self.max_topics {
            if let Some(evicted) = self.topics.pop() {
                tracing::debug!("[TopicStore] Evicted least recently updated topic '{}'", evicted.key);
            }
        }

        tracing::debug!("[TopicStore] Created topic '{}'", key);
        key
    }

    /// Every topic similar to `keywords`, most recently updated first
    pub fn find_related(&self, keywords: &[String]) -> Vec<Topic> {
        let keywords = clean_keywords(keywords);
        if keywords.is_empty() {
            return Vec::new();
        }

        self.topics
            .iter()
            .filter(|topic| {
                let score = similarity(&topic.keywords, &keywords);
                score > 0.0 && score >= self.threshold
            })
            .cloned()
            .collect()
    }

    /// Extract keywords from free text, then [`TopicStore::find_related`]
    pub async fn find_related_topics(
        &self,
        extractor: &dyn KeywordExtractor,
        query: &str,
    ) -> Vec<Topic> {
        let keywords = extract_clean_keywords(extractor, query).await;
        self.find_related(&keywords)
    }

    pub async fn clear(&mut self) -> StorageResult<()> {
        self.topics.clear();
        self.storage.remove(keys::CONVERSATION_TOPICS).await
    }

    async fn persist(&self) -> StorageResult<()> {
        save_json(self.storage.as_ref(), keys::CONVERSATION_TOPICS, &self.topics).await
    }
}
