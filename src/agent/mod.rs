//! Response handlers
//!
//! Every graph handler node implements the same async contract, whether or
//! not it ever suspends.

use crate::error::AgentError;
use crate::models::{Message, Route};
use crate::state::ConversationState;
use crate::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

pub mod chat;
pub mod retrieval;

pub use chat::ChatHandler;
pub use retrieval::{RetrievalHandler, NO_CONTEXT_MESSAGE};

/// A node that answers the latest user message
#[async_trait]
pub trait Handler: Send + Sync {
    /// Route this handler serves
    fn route(&self) -> Route;

    /// Produce the assistant reply for `state`. The state is read-only.
    async fn handle(&self, state: &ConversationState) -> Result<Message>;
}

/// Run `fut`, mapping an elapsed deadline to `AgentError::Timeout`
pub(crate) async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AgentError::Timeout(format!(
            "{} exceeded {} ms",
            what,
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_secs(1), "fast call", async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_with_timeout_elapses() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), "slow call", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));
        assert!(err.to_string().contains("slow call"));
    }
}
