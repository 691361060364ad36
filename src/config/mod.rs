mod settings;

pub use settings::{
    ConversationConfig, KeywordConfig, KeywordStrategy, LLMConfig, LoggingConfig, Settings,
    StorageBackend, StorageConfig, TopicConfig,
};
