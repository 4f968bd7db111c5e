//! Staged document source
//!
//! New documents dropped into a staging directory are picked up by the
//! retrieval handler, indexed, and then removed.

use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Reference to one staged document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub name: String,
    pub path: PathBuf,
}

/// Trait for listing, reading and consuming staged documents
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn list_staged(&self) -> Result<Vec<DocumentRef>>;
    async fn read(&self, doc: &DocumentRef) -> Result<String>;
    async fn delete(&self, doc: &DocumentRef) -> Result<()>;
}

/// Documents staged as plain files in a directory
pub struct StagingDirectory {
    root: PathBuf,
}

impl StagingDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for StagingDirectory {
    async fn list_staged(&self) -> Result<Vec<DocumentRef>> {
        if !tokio::fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut docs = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            docs.push(DocumentRef {
                name,
                path: entry.path(),
            });
        }

        docs.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(dir = %self.root.display(), count = docs.len(), "Listed staged documents");

        Ok(docs)
    }

    async fn read(&self, doc: &DocumentRef) -> Result<String> {
        let bytes = tokio::fs::read(&doc.path).await?;
        String::from_utf8(bytes)
            .map_err(|_| AgentError::Document(format!("{} is not valid UTF-8", doc.name)))
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<()> {
        tokio::fs::remove_file(&doc.path).await?;
        debug!(document = %doc.name, "Deleted staged document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_directory_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let source = StagingDirectory::new(dir.path().join("does-not-exist"));
        assert!(source.list_staged().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_read_delete() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("a.txt"), "first").unwrap();
        std::fs::write(dir.path().join(".hidden"), "skip").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let source = StagingDirectory::new(dir.path());
        let docs = source.list_staged().await.unwrap();

        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(source.read(&docs[0]).await.unwrap(), "first");

        source.delete(&docs[0]).await.unwrap();
        let remaining = source.list_staged().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "b.txt");
    }

    #[tokio::test]
    async fn test_non_utf8_document() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();

        let source = StagingDirectory::new(dir.path());
        let docs = source.list_staged().await.unwrap();
        let err = source.read(&docs[0]).await.unwrap_err();
        assert!(matches!(err, AgentError::Document(_)));
    }
}
