//! Vector store trait for storing and searching vector embeddings.

use std::path::Path;

use async_trait::async_trait;

use crate::document::{EmbeddedChunk, RetrievalResult};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// Entries are keyed by [`DocumentChunk::id`](crate::DocumentChunk::id), so
/// upserting a chunk that is already present replaces it. Every entry in one
/// store has the same dimensionality.
///
/// # Example
///
/// ```rust,ignore
/// use parley_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(embedded_chunks).await?;
/// let results = store.search(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add or replace entries. A batch containing a vector whose
    /// dimensionality disagrees with the store is rejected as a whole.
    async fn upsert(&self, entries: Vec<EmbeddedChunk>) -> Result<()>;

    /// Return at most `k` entries ordered by descending similarity score.
    ///
    /// An empty store or `k == 0` yields an empty result, never an error.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>>;

    /// Number of stored entries.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;

    /// Write a snapshot of the store to `path`.
    async fn save(&self, path: &Path) -> Result<()>;

    /// Replace the store's contents with the snapshot at `path`.
    async fn load(&self, path: &Path) -> Result<()>;
}
