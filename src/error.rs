//! Error types for the super agent router

use std::fmt;
use thiserror::Error;

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Turn-fatal Errors
    // =============================

    #[error("Conversation is empty")]
    EmptyConversation,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Generation error: {0}")]
    Generation(String),

    // =============================
    // Backend Errors (absorbed by retrieval stages)
    // =============================

    #[error("Index error: {0}")]
    Index(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AgentError {
    /// Errors that abort a turn and roll the conversation back.
    pub fn is_turn_fatal(&self) -> bool {
        matches!(
            self,
            AgentError::EmptyConversation
                | AgentError::InvalidMessage(_)
                | AgentError::Generation(_)
        )
    }
}

/// A retrieval stage that produced nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    LoadExisting,
    QueryIndex,
    DirectSearch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Ingest => "ingest",
            Stage::LoadExisting => "load_existing",
            Stage::QueryIndex => "query_index",
            Stage::DirectSearch => "direct_search",
        };
        write!(f, "{}", s)
    }
}

/// Non-fatal stage outcome: the stage had nothing to offer and the
/// pipeline moves on to the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unavailable {
    pub stage: Stage,
    pub reason: String,
    /// false when the stage simply had no input (nothing staged, nothing
    /// persisted); true when a backend call went wrong
    pub failed: bool,
}

impl Unavailable {
    /// The stage tried and failed
    pub fn new(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
            failed: true,
        }
    }

    /// The stage had nothing to work with
    pub fn nothing(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            failed: false,
            ..Self::new(stage, reason)
        }
    }
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable: {}", self.stage, self.reason)
    }
}

/// Outcome of a single retrieval stage
pub type StageResult<T> = std::result::Result<T, Unavailable>;
