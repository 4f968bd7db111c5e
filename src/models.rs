//! Core data models for the super agent router

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Messages =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single immutable conversation message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

//
// ================= Routing =================
//

/// Handler chosen for a single graph execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    ChatHandler,
    RetrievalHandler,
}

//
// ================= Retrieval =================
//

/// Snippets gathered by whichever retrieval stage succeeded.
/// Empty means no grounding is available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievedContext {
    snippets: Vec<String>,
}

impl RetrievedContext {
    pub fn new(snippets: Vec<String>) -> Self {
        Self { snippets }
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn snippets(&self) -> &[String] {
        &self.snippets
    }
}

//
// ================= Turn Result =================
//

/// What a caller sees after one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub route: Route,
    /// Assistant-role messages produced this turn, in order
    pub replies: Vec<Message>,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::ChatHandler => "chat_handler",
            Route::RetrievalHandler => "retrieval_handler",
        };
        write!(f, "{}", s)
    }
}
