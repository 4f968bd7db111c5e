//! Recording collaborators for unit tests

use crate::documents::{DocumentRef, DocumentSource};
use crate::error::AgentError;
use crate::generation::Generator;
use crate::index::{IndexBackend, IndexHandle};
use crate::models::Message;
use crate::search::{SearchBackend, SearchHit};
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

//
// ================= Generator =================
//

pub struct RecordingGenerator {
    reply: std::result::Result<String, String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl RecordingGenerator {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(reason.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            delay: Some(delay),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }

    /// All message contents of the most recent prompt, joined
    pub fn last_prompt_text(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|p| {
                p.iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.reply.clone().map_err(AgentError::Generation)
    }
}

//
// ================= Index =================
//

pub struct MockIndexHandle {
    answer: std::result::Result<String, String>,
    delay: Option<Duration>,
    queries: Arc<AtomicUsize>,
}

#[async_trait]
impl IndexHandle for MockIndexHandle {
    async fn query(&self, _question: &str) -> Result<String> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone().map_err(AgentError::Index)
    }
}

pub struct MockIndexBackend {
    build_ok: bool,
    persisted: bool,
    corrupt: bool,
    answer: std::result::Result<String, String>,
    build_delay: Option<Duration>,
    query_delay: Option<Duration>,
    builds: Mutex<Vec<Vec<String>>>,
    loads: AtomicUsize,
    queries: Arc<AtomicUsize>,
}

impl MockIndexBackend {
    fn base() -> Self {
        Self {
            build_ok: true,
            persisted: false,
            corrupt: false,
            answer: Ok("index answer".to_string()),
            build_delay: None,
            query_delay: None,
            builds: Mutex::new(Vec::new()),
            loads: AtomicUsize::new(0),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Builds succeed, nothing persisted yet
    pub fn empty() -> Self {
        Self::base()
    }

    /// A persisted index exists and can be loaded
    pub fn persisted() -> Self {
        Self {
            persisted: true,
            ..Self::base()
        }
    }

    /// Builds fail, nothing persisted
    pub fn broken() -> Self {
        Self {
            build_ok: false,
            ..Self::base()
        }
    }

    /// A persisted store exists but cannot be read
    pub fn corrupt() -> Self {
        Self {
            corrupt: true,
            ..Self::base()
        }
    }

    pub fn answering(mut self, answer: &str) -> Self {
        self.answer = Ok(answer.to_string());
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.answer = Err("query engine unavailable".to_string());
        self
    }

    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = Some(delay);
        self
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn builds(&self) -> Vec<Vec<String>> {
        self.builds.lock().unwrap().clone()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn handle(&self) -> Arc<dyn IndexHandle> {
        Arc::new(MockIndexHandle {
            answer: self.answer.clone(),
            delay: self.query_delay,
            queries: self.queries.clone(),
        })
    }
}

#[async_trait]
impl IndexBackend for MockIndexBackend {
    async fn build_index(&self, documents: &[String]) -> Result<Arc<dyn IndexHandle>> {
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }
        self.builds.lock().unwrap().push(documents.to_vec());

        if self.build_ok {
            Ok(self.handle())
        } else {
            Err(AgentError::Index("embedding service down".to_string()))
        }
    }

    async fn load_existing(&self) -> Result<Option<Arc<dyn IndexHandle>>> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if self.corrupt {
            Err(AgentError::Index("index store is not valid JSON".to_string()))
        } else if self.persisted {
            Ok(Some(self.handle()))
        } else {
            Ok(None)
        }
    }
}

//
// ================= Search =================
//

pub struct MockSearch {
    hits: std::result::Result<Vec<SearchHit>, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_limit: AtomicUsize,
}

impl MockSearch {
    fn build(hits: std::result::Result<Vec<SearchHit>, String>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            delay,
            calls: AtomicUsize::new(0),
            last_limit: AtomicUsize::new(0),
        })
    }

    fn hits(contents: &[&str]) -> Vec<SearchHit> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| SearchHit {
                content: c.to_string(),
                score: 10.0 - i as f64,
            })
            .collect()
    }

    pub fn returning(contents: &[&str]) -> Arc<Self> {
        Self::build(Ok(Self::hits(contents)), None)
    }

    pub fn empty() -> Arc<Self> {
        Self::returning(&[])
    }

    pub fn down() -> Arc<Self> {
        Self::build(Err("connection refused".to_string()), None)
    }

    /// Answers only after `delay`
    pub fn slow(contents: &[&str], delay: Duration) -> Arc<Self> {
        Self::build(Ok(Self::hits(contents)), Some(delay))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> usize {
        self.last_limit.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for MockSearch {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.hits.clone().map_err(AgentError::Search)
    }
}

//
// ================= Documents =================
//

#[derive(Default)]
pub struct MemoryDocuments {
    docs: Mutex<BTreeMap<String, String>>,
    unreadable: Mutex<Vec<String>>,
}

impl MemoryDocuments {
    pub fn with(docs: &[(&str, &str)]) -> Arc<Self> {
        let source = Self::default();
        {
            let mut map = source.docs.lock().unwrap();
            for (name, text) in docs {
                map.insert(name.to_string(), text.to_string());
            }
        }
        Arc::new(source)
    }

    pub fn empty() -> Arc<Self> {
        Self::with(&[])
    }

    pub fn mark_unreadable(&self, name: &str) {
        self.unreadable.lock().unwrap().push(name.to_string());
    }

    pub fn names(&self) -> Vec<String> {
        self.docs.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl DocumentSource for MemoryDocuments {
    async fn list_staged(&self) -> Result<Vec<DocumentRef>> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .keys()
            .map(|name| DocumentRef {
                name: name.clone(),
                path: PathBuf::from(name),
            })
            .collect())
    }

    async fn read(&self, doc: &DocumentRef) -> Result<String> {
        if self.unreadable.lock().unwrap().contains(&doc.name) {
            return Err(AgentError::Document(format!("{} is locked", doc.name)));
        }

        self.docs
            .lock()
            .unwrap()
            .get(&doc.name)
            .cloned()
            .ok_or_else(|| AgentError::Document(format!("{} vanished", doc.name)))
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<()> {
        self.docs.lock().unwrap().remove(&doc.name);
        Ok(())
    }
}
