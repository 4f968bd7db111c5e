//! Full-text search backend
//!
//! Queried directly by the retrieval handler when no index is usable.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod elasticsearch;
pub use elasticsearch::ElasticsearchBackend;

/// One scored document returned by a search backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub score: f64,
}

/// Trait for full-text search
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}
