//! Conversation memory: keywords, topics, saved conversations and context
//!
//! Information Hiding:
//! - Keyword normalization rules live in `keywords` only
//! - Stores own their persistence keys; callers see typed records
//! - Retrieval turns stored topics into prompt text without exposing matching

pub mod context;
pub mod conversations;
pub mod extractor;
pub mod history;
pub mod keywords;
pub mod topics;
pub mod types;

pub use context::{build_contextual_prompt, ContextRetriever, RetrievedContext};
pub use conversations::ConversationStore;
pub use extractor::{KeywordExtractor, LocalKeywordExtractor, RemoteKeywordExtractor};
pub use keywords::{clean_keyword_string, clean_keywords, is_similar, similarity};
pub use topics::TopicStore;
pub use types::{Conversation, Message, Role, Topic};
