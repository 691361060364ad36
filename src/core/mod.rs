pub mod llm;

pub use llm::{ChatMessage, CompletionService, LLMClient};
