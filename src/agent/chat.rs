//! Chat handler
//!
//! Single-turn passthrough: only the latest user message is sent to the
//! generative backend, earlier history is ignored. No retries here.

use super::{with_timeout, Handler};
use crate::classifier::latest_user_text;
use crate::error::AgentError;
use crate::generation::Generator;
use crate::models::{Message, Route};
use crate::state::ConversationState;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct ChatHandler {
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

impl ChatHandler {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }
}

#[async_trait]
impl Handler for ChatHandler {
    fn route(&self) -> Route {
        Route::ChatHandler
    }

    async fn handle(&self, state: &ConversationState) -> Result<Message> {
        let text = latest_user_text(state)?;
        let prompt = [Message::user(text)];

        let answer = with_timeout(self.timeout, "chat generation", self.generator.generate(&prompt))
            .await
            .map_err(|e| {
                warn!(error = %e, "Chat generation failed");
                match e {
                    AgentError::Generation(_) => e,
                    other => AgentError::Generation(other.to_string()),
                }
            })?;

        info!(chars = answer.len(), "Chat handler replied");

        Ok(Message::assistant(answer))
    }
}
