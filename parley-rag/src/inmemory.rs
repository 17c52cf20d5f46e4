//! In-memory vector store using exact cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps every entry in a `BTreeMap` behind a
//! `tokio::sync::RwLock` and scores the whole map on each search. Snapshots
//! are plain JSON.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{EmbeddedChunk, RetrievalResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    dimensions: Option<usize>,
    entries: BTreeMap<String, EmbeddedChunk>,
}

/// An in-memory vector store scored by `(1 + cosine) / 2`.
///
/// # Example
///
/// ```rust,ignore
/// use parley_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(entries).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    state: RwLock<Snapshot>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimensionality of stored vectors, fixed by the first upsert.
    pub async fn dimensions(&self) -> Option<usize> {
        self.state.read().await.dimensions
    }
}

/// Cosine similarity mapped into `[0, 1]`. Zero vectors score `0.5`.
fn similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let cosine = if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) };
    ((1.0 + cosine) / 2.0).clamp(0.0, 1.0)
}

fn store_error(message: String) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.to_string(), message }
}

/// Check that every vector in `entries` has the store's dimensionality,
/// returning the dimensionality the store will have afterwards.
fn check_dimensions(current: Option<usize>, entries: &[EmbeddedChunk]) -> Result<Option<usize>> {
    let mut expected = current;
    for entry in entries {
        let len = entry.vector.len();
        if len == 0 {
            return Err(store_error(format!("chunk '{}' has an empty vector", entry.chunk.id())));
        }
        match expected {
            Some(dimensions) if dimensions != len => {
                return Err(store_error(format!(
                    "dimension mismatch for chunk '{}': expected {dimensions}, got {len}",
                    entry.chunk.id()
                )));
            }
            Some(_) => {}
            None => expected = Some(len),
        }
    }
    Ok(expected)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, entries: Vec<EmbeddedChunk>) -> Result<()> {
        let mut state = self.state.write().await;
        state.dimensions = check_dimensions(state.dimensions, &entries)?;
        let count = entries.len();
        for entry in entries {
            state.entries.insert(entry.chunk.id(), entry);
        }
        debug!(backend = BACKEND, count, total = state.entries.len(), "upserted entries");
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        let state = self.state.read().await;
        if k == 0 || state.entries.is_empty() {
            return Ok(Vec::new());
        }
        match state.dimensions {
            Some(dimensions) if dimensions != query.len() => {
                return Err(store_error(format!(
                    "query has {} dimensions, store has {dimensions}",
                    query.len()
                )));
            }
            _ => {}
        }

        let mut scored: Vec<(&String, f32)> = state
            .entries
            .iter()
            .map(|(id, entry)| (id, similarity(&entry.vector, query)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .filter_map(|(id, similarity_score)| {
                state.entries.get(id).map(|entry| RetrievalResult {
                    chunk: entry.chunk.clone(),
                    similarity_score,
                })
            })
            .collect())
    }

    async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.dimensions = None;
        Ok(())
    }

    async fn save(&self, path: &Path) -> Result<()> {
        let json = {
            let state = self.state.read().await;
            serde_json::to_vec(&*state).map_err(|e| RagError::PersistenceError {
                path: path.display().to_string(),
                message: format!("failed to serialize index: {e}"),
            })?
        };
        tokio::fs::write(path, json).await.map_err(|e| RagError::PersistenceError {
            path: path.display().to_string(),
            message: format!("failed to write index: {e}"),
        })?;
        info!(backend = BACKEND, path = %path.display(), "saved index snapshot");
        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await.map_err(|e| RagError::PersistenceError {
            path: path.display().to_string(),
            message: format!("failed to read index: {e}"),
        })?;
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| RagError::PersistenceError {
                path: path.display().to_string(),
                message: format!("invalid index snapshot: {e}"),
            })?;

        let entries: Vec<EmbeddedChunk> = snapshot.entries.values().cloned().collect();
        let dimensions = check_dimensions(snapshot.dimensions, &entries)?;

        let mut state = self.state.write().await;
        *state = Snapshot { dimensions, entries: snapshot.entries };
        info!(backend = BACKEND, entries = state.entries.len(), "loaded index snapshot");
        Ok(())
    }
}
