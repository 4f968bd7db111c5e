//! Retrieval handler - staged fallback pipeline
//!
//! INGEST → LOAD EXISTING → QUERY INDEX → DIRECT SEARCH → SYNTHESIZE
//!
//! Stages run strictly in order. Each of the first four either yields a
//! value or reports `Unavailable` and defers to the next one; only the final
//! generative call can fail the turn.

use super::{with_timeout, Handler};
use crate::classifier::latest_user_text;
use crate::config::{Timeouts, DEFAULT_SEARCH_TOP_K};
use crate::documents::DocumentSource;
use crate::error::{AgentError, Stage, StageResult, Unavailable};
use crate::generation::Generator;
use crate::index::{IndexBackend, IndexHandle};
use crate::models::{Message, RetrievedContext, Route};
use crate::search::SearchBackend;
use crate::state::ConversationState;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Reply used when no stage produced any grounding
pub const NO_CONTEXT_MESSAGE: &str = "No relevant text was retrieved.";

pub struct RetrievalHandler {
    documents: Arc<dyn DocumentSource>,
    index_backend: Arc<dyn IndexBackend>,
    search: Arc<dyn SearchBackend>,
    generator: Arc<dyn Generator>,
    timeouts: Timeouts,
    top_k: usize,
    /// Current index; replaced wholesale, never edited
    index: RwLock<Option<Arc<dyn IndexHandle>>>,
    /// Single writer for ingestion (staged docs + index swap)
    ingest_lock: Mutex<()>,
}

impl RetrievalHandler {
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        index_backend: Arc<dyn IndexBackend>,
        search: Arc<dyn SearchBackend>,
        generator: Arc<dyn Generator>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            documents,
            index_backend,
            search,
            generator,
            timeouts,
            top_k: DEFAULT_SEARCH_TOP_K,
            index: RwLock::new(None),
            ingest_lock: Mutex::new(()),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    // -------------------------------------------------
    // S1: TRY INGEST
    // -------------------------------------------------
    async fn try_ingest(&self) -> StageResult<Arc<dyn IndexHandle>> {
        let unavailable = |reason: String| Unavailable::new(Stage::Ingest, reason);

        // Another turn is ingesting; its handle lands in the slot for S2
        let Ok(_writer) = self.ingest_lock.try_lock() else {
            return Err(Unavailable::nothing(Stage::Ingest, "ingest in progress"));
        };

        let staged = self
            .documents
            .list_staged()
            .await
            .map_err(|e| unavailable(format!("listing staged documents failed: {}", e)))?;

        if staged.is_empty() {
            return Err(Unavailable::nothing(Stage::Ingest, "no staged documents"));
        }

        let mut texts = Vec::with_capacity(staged.len());
        for doc in &staged {
            let text = self
                .documents
                .read(doc)
                .await
                .map_err(|e| unavailable(format!("reading {} failed: {}", doc.name, e)))?;
            texts.push(text);
        }

        let handle = with_timeout(
            self.timeouts.index_build,
            "index build",
            self.index_backend.build_index(&texts),
        )
        .await
        .map_err(|e| unavailable(format!("index build failed: {}", e)))?;

        *self.index.write().await = Some(handle.clone());

        // Staged files are consumed only once the index covering them exists
        for doc in &staged {
            if let Err(e) = self.documents.delete(doc).await {
                warn!(document = %doc.name, error = %e, "Failed to delete ingested document");
            }
        }

        info!(documents = staged.len(), "Ingested staged documents");

        Ok(handle)
    }

    // -------------------------------------------------
    // S2: TRY LOAD EXISTING
    // -------------------------------------------------
    async fn try_load_existing(&self) -> StageResult<Arc<dyn IndexHandle>> {
        if let Some(handle) = self.index.read().await.clone() {
            debug!("Reusing in-memory index");
            return Ok(handle);
        }

        let loaded = with_timeout(
            self.timeouts.index_build,
            "index load",
            self.index_backend.load_existing(),
        )
        .await
        .map_err(|e| Unavailable::new(Stage::LoadExisting, e.to_string()))?
        .ok_or_else(|| Unavailable::nothing(Stage::LoadExisting, "no persisted index"))?;

        // A concurrent ingest may have swapped in a newer handle meanwhile
        let mut slot = self.index.write().await;
        Ok(slot.get_or_insert(loaded).clone())
    }

    // -------------------------------------------------
    // S3: QUERY INDEX
    // -------------------------------------------------
    async fn query_index(
        &self,
        index: &Arc<dyn IndexHandle>,
        question: &str,
    ) -> StageResult<Message> {
        let answer = with_timeout(self.timeouts.index_query, "index query", index.query(question))
            .await
            .map_err(|e| Unavailable::new(Stage::QueryIndex, e.to_string()))?;

        Ok(Message::assistant(answer))
    }

    // -------------------------------------------------
    // S4: DIRECT SEARCH
    // -------------------------------------------------
    async fn direct_search(&self, question: &str) -> StageResult<RetrievedContext> {
        let hits = with_timeout(
            self.timeouts.search,
            "search",
            self.search.search(question, self.top_k),
        )
        .await
        .map_err(|e| Unavailable::new(Stage::DirectSearch, e.to_string()))?;

        let snippets: Vec<String> = hits
            .into_iter()
            .map(|hit| hit.content)
            .filter(|content| !content.trim().is_empty())
            .take(self.top_k)
            .collect();

        debug!(hits = snippets.len(), "Direct search complete");

        Ok(RetrievedContext::new(snippets))
    }

    // -------------------------------------------------
    // S5: SYNTHESIZE
    // -------------------------------------------------
    async fn synthesize(&self, question: &str, context: &RetrievedContext) -> Result<Message> {
        if context.is_empty() {
            info!("No context retrieved, returning fixed reply");
            return Ok(Message::assistant(NO_CONTEXT_MESSAGE));
        }

        let prompt = [Message::user(build_grounded_prompt(question, context))];

        let answer = with_timeout(
            self.timeouts.generation,
            "grounded generation",
            self.generator.generate(&prompt),
        )
        .await
        .map_err(|e| match e {
            AgentError::Generation(_) => e,
            other => AgentError::Generation(other.to_string()),
        })?;

        info!(snippets = context.len(), "Synthesized grounded answer");

        Ok(Message::assistant(answer))
    }
}

#[async_trait]
impl Handler for RetrievalHandler {
    fn route(&self) -> Route {
        Route::RetrievalHandler
    }

    async fn handle(&self, state: &ConversationState) -> Result<Message> {
        let question = latest_user_text(state)?;

        let index = match self.try_ingest().await {
            Ok(handle) => Some(handle),
            Err(skipped) => {
                log_fallthrough(&skipped);
                match self.try_load_existing().await {
                    Ok(handle) => Some(handle),
                    Err(missing) => {
                        log_fallthrough(&missing);
                        None
                    }
                }
            }
        };

        if let Some(index) = index {
            match self.query_index(&index, question).await {
                Ok(reply) => {
                    info!(stage = %Stage::QueryIndex, "Answered from index");
                    return Ok(reply);
                }
                Err(failed) => log_fallthrough(&failed),
            }
        }

        let context = self.direct_search(question).await.unwrap_or_else(|failed| {
            log_fallthrough(&failed);
            RetrievedContext::default()
        });

        self.synthesize(question, &context).await
    }
}

fn log_fallthrough(skipped: &Unavailable) {
    if skipped.failed {
        warn!(stage = %skipped.stage, reason = %skipped.reason, "Retrieval stage failed, falling through");
    } else {
        debug!(stage = %skipped.stage, reason = %skipped.reason, "Retrieval stage skipped");
    }
}

fn build_grounded_prompt(question: &str, context: &RetrievedContext) -> String {
    let mut prompt = String::from(
        "Use ONLY the context below to answer the question when it is relevant. \
         If the context does not help, say that you could not find the answer.\n\nContext:\n",
    );

    for (i, snippet) in context.snippets().iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, snippet));
    }

    prompt.push_str("\nQuestion: ");
    prompt.push_str(question);
    prompt
}
