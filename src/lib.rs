//! Super Agent Router
//!
//! Routes each conversational turn to one of two handlers:
//! - Chat: single-turn passthrough to the generative backend
//! - Retrieval: best-effort grounding with graceful degradation across
//!   document ingestion, a persisted index, and a full-text search backend
//!
//! TURN LOOP:
//! INPUT → ROUTE → {CHAT | INGEST → LOAD → QUERY → SEARCH → SYNTHESIZE} → APPEND

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod documents;
pub mod error;
pub mod executor;
pub mod generation;
pub mod graph;
pub mod index;
pub mod models;
pub mod search;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{AgentError, Result};

// Re-export common types
pub use classifier::IntentRouter;
pub use executor::TurnExecutor;
pub use models::*;
pub use state::ConversationState;
