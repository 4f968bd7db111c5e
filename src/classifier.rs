//! Intent Router
//!
//! Classifies the latest user message as either:
//! - Retrieval: knowledge lookups (e.g., "find the release notes", "tell me about eclipses")
//! - Chat: everything else, answered directly by the generative backend

use crate::error::AgentError;
use crate::models::{Role, Route};
use crate::state::ConversationState;
use crate::Result;

/// Static keyword list, zero allocation
const RETRIEVAL_KEYWORDS: &[&str] = &["find", "search", "tell me about"];

/// Text of the latest message, which must be a non-blank user message.
pub fn latest_user_text(state: &ConversationState) -> Result<&str> {
    let latest = state.latest().ok_or(AgentError::EmptyConversation)?;

    if latest.role != Role::User {
        return Err(AgentError::InvalidMessage(format!(
            "latest message has role '{}', expected 'user'",
            latest.role
        )));
    }

    if latest.content.trim().is_empty() {
        return Err(AgentError::InvalidMessage(
            "latest user message is blank".to_string(),
        ));
    }

    Ok(&latest.content)
}

/// Keyword-based intent router
pub struct IntentRouter;

impl IntentRouter {
    /// Pick the handler for the latest user message
    pub fn route(state: &ConversationState) -> Result<Route> {
        let text = latest_user_text(state)?.to_lowercase();

        if RETRIEVAL_KEYWORDS.iter().any(|kw| text.contains(kw)) {
            Ok(Route::RetrievalHandler)
        } else {
            Ok(Route::ChatHandler)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use tokio_test::assert_err;

    fn state_with(text: &str) -> ConversationState {
        ConversationState::from_messages(vec![Message::user(text)])
    }

    #[test]
    fn test_retrieval_phrases() {
        let cases = vec![
            "Tell me about eclipses",
            "can you FIND the onboarding doc?",
            "Search for invoices from March",
            "please do a research-style search",
            "TELL ME ABOUT the roadmap",
        ];

        for c in cases {
            assert_eq!(
                IntentRouter::route(&state_with(c)).unwrap(),
                Route::RetrievalHandler,
                "{c}"
            );
        }
    }

    #[test]
    fn test_chat_phrases() {
        let cases = vec!["hello", "what's 2 + 2?", "tell me a joke", "explain lifetimes"];

        for c in cases {
            assert_eq!(
                IntentRouter::route(&state_with(c)).unwrap(),
                Route::ChatHandler,
                "{c}"
            );
        }
    }

    #[test]
    fn test_only_latest_message_counts() {
        let state = ConversationState::from_messages(vec![
            Message::user("search the archive"),
            Message::assistant("No relevant text was retrieved."),
            Message::user("thanks anyway"),
        ]);
        assert_eq!(IntentRouter::route(&state).unwrap(), Route::ChatHandler);
    }

    #[test]
    fn test_empty_conversation() {
        let err = assert_err!(IntentRouter::route(&ConversationState::new()));
        assert!(matches!(err, AgentError::EmptyConversation));
    }

    #[test]
    fn test_invalid_latest_message() {
        let state = ConversationState::from_messages(vec![
            Message::user("find x"),
            Message::assistant("done"),
        ]);
        let err = assert_err!(IntentRouter::route(&state));
        assert!(matches!(err, AgentError::InvalidMessage(_)));

        let err = assert_err!(IntentRouter::route(&state_with("   ")));
        assert!(matches!(err, AgentError::InvalidMessage(_)));
    }

    #[test]
    fn test_routing_is_idempotent() {
        let state = state_with("Find me something");
        let first = IntentRouter::route(&state).unwrap();
        let second = IntentRouter::route(&state).unwrap();
        assert_eq!(first, second);
        assert_eq!(state.len(), 1);
    }
}
