//! Error types for chatmind
//!
//! Each variant family maps to one failure domain. Extraction failures are
//! absorbed by callers, completion failures are surfaced in the transcript,
//! diagram failures stay inside their block and storage failures are logged.

use thiserror::Error;

/// Keyword extraction / summarization call failed
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Keyword extraction request failed: {0}")]
    Request(#[from] CompletionError),
}

/// Main chat completion call failed or the stream ended abnormally
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("Completion task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Diagram source failed to parse or render
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagramRenderError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Render error: {0}")]
    Render(String),
}

/// Key-value persistence failure
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
