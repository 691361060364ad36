//! Keyword extraction strategies
//!
//! Information Hiding:
//! - Whether keywords come from the model or from a local tokenizer is hidden
//!   behind `KeywordExtractor`
//! - Extraction is best effort; `extract_clean_keywords` turns failures into an
//!   empty list

use super::keywords::clean_keywords;
use crate::core::llm::{ChatMessage, CompletionService};
use crate::error::ExtractionError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

const KEYWORD_PROMPT: &str = "Extract the most important keywords from the user's text. \
     Return only the keywords, separated by commas, with no other text.";

static TOKEN_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("token pattern is valid"));

/// Tokens of four or more characters that carry no topic information
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English
        "about", "above", "after", "again", "also", "been", "before", "being", "below",
        "between", "both", "could", "does", "doing", "down", "during", "each", "from",
        "further", "have", "having", "here", "into", "just", "like", "make", "more", "most",
        "much", "only", "other", "over", "please", "same", "should", "some", "such", "than",
        "that", "their", "them", "then", "there", "these", "they", "this", "those", "through",
        "under", "until", "very", "want", "what", "when", "where", "which", "while", "with",
        "would", "your", "yours", "will", "shall", "cannot", "know", "tell", "explain",
        // French
        "avec", "dans", "pour", "sont", "cette", "ceci", "cela", "comme", "mais", "nous",
        "vous", "leur", "leurs", "elle", "elles", "être", "avoir", "fait", "faire", "plus",
        "moins", "tout", "tous", "toute", "toutes", "quoi", "quel", "quelle", "quels",
        "quelles", "comment", "pourquoi", "aussi", "donc", "alors", "entre", "sans", "sous",
        "votre", "notre", "peux", "peut", "veux",
    ]
    .into_iter()
    .collect()
});

#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Raw keywords, in the order the source produced them. Not yet cleaned.
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, ExtractionError>;
}

/// Asks the completion service for a comma-separated keyword list
pub struct RemoteKeywordExtractor {
    completion: Arc<dyn CompletionService>,
}

impl RemoteKeywordExtractor {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

/// Split a model reply into trimmed, non-empty comma-separated tokens
pub fn split_keyword_reply(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl KeywordExtractor for RemoteKeywordExtractor {
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, ExtractionError> {
        let messages = vec![
            ChatMessage::new("system", KEYWORD_PROMPT),
            ChatMessage::new("user", text),
        ];

        let reply = self.completion.complete(messages).await?;
        let keywords = split_keyword_reply(&reply);

        tracing::debug!("[RemoteKeywordExtractor] Extracted {} raw keywords", keywords.len());
        Ok(keywords)
    }
}

/// Tokenizes locally: first `max_keywords` distinct words longer than three
/// characters that are not stop words.
pub struct LocalKeywordExtractor {
    max_keywords: usize,
}

impl LocalKeywordExtractor {
    pub fn new(max_keywords: usize) -> Self {
        Self {
            max_keywords: max_keywords.max(1),
        }
    }

    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();

        TOKEN_SPLIT
            .split(text)
            .map(str::to_lowercase)
            .filter(|token| token.chars().count() > 3)
            .filter(|token| !STOP_WORDS.contains(token.as_str()))
            .filter(|token| seen.insert(token.clone()))
            .take(self.max_keywords)
            .collect()
    }
}

impl Default for LocalKeywordExtractor {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl KeywordExtractor for LocalKeywordExtractor {
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, ExtractionError> {
        Ok(self.extract(text))
    }
}

/// Extract then clean. Extraction failures are logged and yield no keywords.
pub async fn extract_clean_keywords(extractor: &dyn KeywordExtractor, text: &str) -> Vec<String> {
    match extractor.extract_keywords(text).await {
        Ok(raw) => clean_keywords(raw),
        Err(e) => {
            tracing::warn!("[KeywordExtractor] Extraction failed, continuing without keywords: {}", e);
            Vec::new()
        }
    }
}
