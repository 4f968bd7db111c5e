//! In-process vector index with brute-force cosine similarity search.
//!
//! Documents are split into paragraph chunks and embedded as sparse
//! term-frequency vectors. Only chunk text is persisted; embeddings are
//! recomputed on load. Answers are synthesized by the generative backend
//! from the best matching chunks.

use super::{IndexBackend, IndexHandle};
use crate::error::AgentError;
use crate::generation::Generator;
use crate::models::Message;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const STORE_FILE: &str = "index.json";
const STORE_VERSION: u32 = 1;
const MAX_CHUNK_CHARS: usize = 800;
const DEFAULT_TOP_K: usize = 3;

const SYNTHESIS_INSTRUCTION: &str =
    "Answer the question using the provided excerpts. If they do not contain the answer, say so.";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    id: String,
    text: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexStore {
    version: u32,
    chunks: Vec<StoredChunk>,
}

/// Index backend persisting chunk text under a storage directory
pub struct LocalIndexBackend {
    storage_dir: PathBuf,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl LocalIndexBackend {
    pub fn new(storage_dir: impl Into<PathBuf>, generator: Arc<dyn Generator>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    fn store_path(&self) -> PathBuf {
        self.storage_dir.join(STORE_FILE)
    }

    async fn read_store(&self) -> Result<Option<IndexStore>> {
        let path = self.store_path();
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let raw = tokio::fs::read(&path).await?;
        let store: IndexStore = serde_json::from_slice(&raw)?;

        if store.version != STORE_VERSION {
            return Err(AgentError::Index(format!(
                "unsupported index store version {}",
                store.version
            )));
        }

        Ok(Some(store))
    }

    /// Write to a sibling temp file, then rename over the store
    async fn write_store(&self, store: &IndexStore) -> Result<()> {
        tokio::fs::create_dir_all(&self.storage_dir).await?;

        let tmp = self.storage_dir.join(format!("{}.tmp", STORE_FILE));
        tokio::fs::write(&tmp, serde_json::to_vec(store)?).await?;
        tokio::fs::rename(&tmp, self.store_path()).await?;

        Ok(())
    }

    fn handle_from(&self, store: IndexStore) -> Arc<dyn IndexHandle> {
        Arc::new(LocalIndex::new(
            store.chunks,
            self.generator.clone(),
            self.top_k,
        ))
    }
}

#[async_trait]
impl IndexBackend for LocalIndexBackend {
    async fn build_index(&self, documents: &[String]) -> Result<Arc<dyn IndexHandle>> {
        let mut store = self.read_store().await?.unwrap_or(IndexStore {
            version: STORE_VERSION,
            chunks: Vec::new(),
        });

        let mut seen: HashSet<String> = store.chunks.iter().map(|c| c.id.clone()).collect();
        let before = store.chunks.len();

        for doc in documents {
            for text in chunk_text(doc) {
                let id = chunk_id(&text);
                if seen.insert(id.clone()) {
                    store.chunks.push(StoredChunk { id, text });
                }
            }
        }

        if store.chunks.is_empty() {
            return Err(AgentError::Index(
                "documents contained no indexable text".to_string(),
            ));
        }

        self.write_store(&store).await?;

        info!(
            dir = %self.storage_dir.display(),
            added = store.chunks.len() - before,
            total = store.chunks.len(),
            "Index built"
        );

        Ok(self.handle_from(store))
    }

    async fn load_existing(&self) -> Result<Option<Arc<dyn IndexHandle>>> {
        let Some(store) = self.read_store().await? else {
            debug!(dir = %self.storage_dir.display(), "No persisted index");
            return Ok(None);
        };

        debug!(chunks = store.chunks.len(), "Loaded persisted index");

        Ok(Some(self.handle_from(store)))
    }
}

#[derive(Debug)]
struct IndexedChunk {
    text: String,
    embedding: SparseVector,
}

/// Immutable in-memory index over a fixed set of chunks
pub struct LocalIndex {
    chunks: Vec<IndexedChunk>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl LocalIndex {
    fn new(stored: Vec<StoredChunk>, generator: Arc<dyn Generator>, top_k: usize) -> Self {
        let chunks = stored
            .into_iter()
            .map(|c| IndexedChunk {
                embedding: embed(&c.text),
                text: c.text,
            })
            .collect();

        Self {
            chunks,
            generator,
            top_k,
        }
    }

    /// Chunks scored against `question`, best first, zero-score chunks dropped
    fn nearest(&self, question: &str) -> Vec<(&str, f64)> {
        let query = embed(question);

        let mut scored: Vec<(&str, f64)> = self
            .chunks
            .iter()
            .map(|c| (c.text.as_str(), cosine_similarity(&query, &c.embedding)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_k);
        scored
    }
}

#[async_trait]
impl IndexHandle for LocalIndex {
    async fn query(&self, question: &str) -> Result<String> {
        let nearest = self.nearest(question);

        if nearest.is_empty() {
            return Err(AgentError::Index(
                "no indexed chunk matched the question".to_string(),
            ));
        }

        debug!(
            matches = nearest.len(),
            best_score = nearest[0].1,
            "Synthesizing answer from index"
        );

        let excerpts = nearest
            .iter()
            .enumerate()
            .map(|(i, (text, _))| format!("[{}] {}", i + 1, text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = vec![
            Message::system(SYNTHESIS_INSTRUCTION),
            Message::user(format!(
                "Excerpts:\n{}\n\nQuestion: {}",
                excerpts, question
            )),
        ];

        self.generator
            .generate(&prompt)
            .await
            .map_err(|e| AgentError::Index(format!("index synthesis failed: {}", e)))
    }
}

/// Split text into paragraph chunks of at most MAX_CHUNK_CHARS.
/// Oversized paragraphs are split on word boundaries.
fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        for piece in split_long(paragraph) {
            if !current.is_empty() && current.len() + piece.len() + 2 > MAX_CHUNK_CHARS {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&piece);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_long(paragraph: &str) -> Vec<String> {
    if paragraph.len() <= MAX_CHUNK_CHARS {
        return vec![paragraph.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in paragraph.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > MAX_CHUNK_CHARS {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

fn chunk_id(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
}

type SparseVector = HashMap<String, f32>;

/// Term-frequency embedding over lower-cased alphanumeric tokens
fn embed(text: &str) -> SparseVector {
    let mut vector = SparseVector::new();
    for token in tokens(text) {
        *vector.entry(token).or_insert(0.0) += 1.0;
    }
    vector
}

fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let dot: f64 = small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| (*x as f64) * (*y as f64)))
        .sum();

    let mag_a: f64 = a.values().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.values().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
