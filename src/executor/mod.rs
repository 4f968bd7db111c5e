//! Turn executor
//!
//! One graph execution per user input. Turns on the same conversation are
//! serialized; different conversations run independently. A failed turn
//! leaves the conversation exactly as it was.

use crate::agent::{ChatHandler, RetrievalHandler};
use crate::config::AppConfig;
use crate::documents::StagingDirectory;
use crate::generation::{GeminiGenerator, Generator};
use crate::graph::AgentGraph;
use crate::index::LocalIndexBackend;
use crate::models::{Message, TurnOutcome};
use crate::search::ElasticsearchBackend;
use crate::state::ConversationState;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct TurnExecutor {
    graph: AgentGraph,
    conversations: RwLock<HashMap<Uuid, Arc<Mutex<ConversationState>>>>,
}

impl TurnExecutor {
    pub fn new(graph: AgentGraph) -> Self {
        Self {
            graph,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    async fn conversation(&self, conversation_id: Uuid) -> Arc<Mutex<ConversationState>> {
        {
            let locked = self.conversations.read().await;
            if let Some(slot) = locked.get(&conversation_id) {
                return slot.clone();
            }
        }

        let mut locked = self.conversations.write().await;
        locked.entry(conversation_id).or_default().clone()
    }

    /// Run one turn for `conversation_id` with the user's `input`
    pub async fn run_turn(&self, conversation_id: Uuid, input: &str) -> Result<TurnOutcome> {
        let start = Instant::now();
        let slot = self.conversation(conversation_id).await;

        // Held for the whole turn: one execution in flight per conversation
        let mut current = slot.lock().await;

        let snapshot = current.with_message(Message::user(input));
        let produced_from = snapshot.len();

        let output = match self.graph.invoke(snapshot).await {
            Ok(output) => output,
            Err(e) => {
                if e.is_turn_fatal() {
                    warn!(
                        conversation_id = %conversation_id,
                        error = %e,
                        "Turn failed, conversation left unchanged"
                    );
                } else {
                    error!(
                        conversation_id = %conversation_id,
                        error = %e,
                        "Backend error escaped the graph, conversation left unchanged"
                    );
                }

                let never_committed = current.is_empty();
                drop(current);
                if never_committed {
                    self.forget_if_idle(conversation_id, &slot).await;
                }
                return Err(e);
            }
        };

        let replies: Vec<Message> = output
            .state
            .since(produced_from)
            .iter()
            .filter(|m| m.is_assistant())
            .cloned()
            .collect();

        *current = output.state;

        info!(
            conversation_id = %conversation_id,
            route = %output.route,
            replies = replies.len(),
            messages = current.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Turn complete"
        );

        Ok(TurnOutcome {
            route: output.route,
            replies,
        })
    }

    /// Drop a conversation that never committed a turn, unless another
    /// caller holds it. Clones are only handed out under the map lock, so
    /// the count is stable while we hold it for writing.
    async fn forget_if_idle(&self, conversation_id: Uuid, slot: &Arc<Mutex<ConversationState>>) {
        let mut locked = self.conversations.write().await;
        let idle = locked
            .get(&conversation_id)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && Arc::strong_count(held) == 2);
        if idle {
            locked.remove(&conversation_id);
        }
    }

    /// Snapshot of a conversation with at least one committed turn
    pub async fn history(&self, conversation_id: Uuid) -> Option<ConversationState> {
        let slot = self.conversations.read().await.get(&conversation_id).cloned()?;
        let state = slot.lock().await.clone();
        (!state.is_empty()).then_some(state)
    }

    /// Number of conversations currently tracked
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

/// Wire the production collaborators from configuration
pub fn build_default_executor(config: &AppConfig) -> Result<TurnExecutor> {
    let generator: Arc<dyn Generator> = Arc::new(GeminiGenerator::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    )?);

    let search = Arc::new(ElasticsearchBackend::new(
        &config.elasticsearch_url,
        &config.elasticsearch_index,
        config.timeouts.search,
    )?);

    let retrieval = RetrievalHandler::new(
        Arc::new(StagingDirectory::new(&config.staging_dir)),
        Arc::new(LocalIndexBackend::new(
            &config.index_storage_dir,
            generator.clone(),
        )),
        search,
        generator.clone(),
        config.timeouts,
    )
    .with_top_k(config.search_top_k);

    let chat = ChatHandler::new(generator, config.timeouts.generation);

    let graph = AgentGraph::new(Arc::new(chat), Arc::new(retrieval))?;

    Ok(TurnExecutor::new(graph))
}
