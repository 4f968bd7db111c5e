//! Document index backend
//!
//! An index is built from raw document text (or loaded from its persisted
//! store) and answers questions with its own synthesis.

use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod local;
pub use local::LocalIndexBackend;

/// Queryable, immutable index handle
#[async_trait]
pub trait IndexHandle: Send + Sync {
    /// Answer `question` from the indexed documents
    async fn query(&self, question: &str) -> Result<String>;
}

/// Builds and loads index handles
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Index `documents` and return a fresh handle covering them
    async fn build_index(&self, documents: &[String]) -> Result<Arc<dyn IndexHandle>>;

    /// Wrap the persisted index store as a handle; `None` if nothing is
    /// persisted yet
    async fn load_existing(&self) -> Result<Option<Arc<dyn IndexHandle>>>;
}
