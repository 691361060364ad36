//! Context retrieval: turn related topics into a contextual prompt

use super::extractor::{extract_clean_keywords, KeywordExtractor};
use super::topics::TopicStore;
use super::types::Topic;

const CONTEXT_HEADER: &str = "Context from previous conversations about similar topics:";

/// Prefix `content` with the summaries of `related` topics.
///
/// Returns `content` unchanged when nothing is related.
pub fn build_contextual_prompt(related: &[Topic], content: &str) -> String {
    if related.is_empty() {
        return content.to_string();
    }

    let summaries: Vec<String> = related
        .iter()
        .map(|topic| format!("- {}", topic.summary))
        .collect();

    format!(
        "{}\n{}\n\nCurrent question: {}",
        CONTEXT_HEADER,
        summaries.join("\n"),
        content
    )
}

/// Related topics and the prompt built from them for one outgoing question
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Cleaned keywords of the question, reused for the topic update
    pub keywords: Vec<String>,
    pub related: Vec<Topic>,
    pub prompt: String,
}

pub struct ContextRetriever<'a> {
    topics: &'a TopicStore,
    extractor: &'a dyn KeywordExtractor,
}

impl<'a> ContextRetriever<'a> {
    pub fn new(topics: &'a TopicStore, extractor: &'a dyn KeywordExtractor) -> Self {
        Self { topics, extractor }
    }

    pub async fn retrieve(&self, content: &str) -> RetrievedContext {
        let keywords = extract_clean_keywords(self.extractor, content).await;
        self.retrieve_with_keywords(keywords, content)
    }

    pub fn retrieve_with_keywords(&self, keywords: Vec<String>, content: &str) -> RetrievedContext {
        let related = self.topics.find_related(&keywords);
        if !related.is_empty() {
            tracing::debug!("[ContextRetriever] Found {} related topics", related.len());
        }

        RetrievedContext {
            prompt: build_contextual_prompt(&related, content),
            keywords,
            related,
        }
    }
}
