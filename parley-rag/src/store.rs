//! Document store: ingestion, statistics and persistence.
//!
//! The [`DocumentStore`] coordinates the ingest workflow (read → extract →
//! chunk → embed → index) by composing a [`TextExtractor`], a [`Chunker`],
//! an [`EmbeddingProvider`] and a [`VectorStore`], and keeps a registry of
//! every ingested chunk for statistics.
//!
//! # Example
//!
//! ```rust,ignore
//! use parley_rag::{DocumentSource, DocumentStore, HashingEmbeddingProvider, RagConfig};
//!
//! let store = DocumentStore::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .build()?;
//!
//! let ingested = store.add_document(DocumentSource::path("guide.txt"), HashMap::new()).await?;
//! let results = store.retriever().retrieve("what is the guide about?", 3).await?;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{DocumentChunk, DocumentId, DocumentSource, EmbeddedChunk, FileKind};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::{DefaultTextExtractor, TextExtractor};
use crate::inmemory::InMemoryVectorStore;
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

const VECTORS_FILE: &str = "vectors.json";
const REGISTRY_FILE: &str = "registry.json";

/// Outcome of a successful [`DocumentStore::add_document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestedDocument {
    pub id: DocumentId,
    pub file_name: String,
    pub chunk_count: usize,
}

/// Aggregate view of everything ingested so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub document_count: usize,
    pub chunk_count: usize,
    /// Sorted, without duplicates.
    pub distinct_file_names: Vec<String>,
    pub has_index: bool,
}

/// Owns ingested chunks and the vector index built from them.
///
/// Construct one via [`DocumentStore::builder()`].
pub struct DocumentStore {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    extractor: Arc<dyn TextExtractor>,
    registry: RwLock<Vec<DocumentChunk>>,
}

impl DocumentStore {
    /// Create a new [`DocumentStoreBuilder`].
    pub fn builder() -> DocumentStoreBuilder {
        DocumentStoreBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// A retriever over this store's index.
    pub fn retriever(&self) -> Retriever {
        Retriever::new(Arc::clone(&self.embedding_provider), Arc::clone(&self.vector_store))
    }

    /// Ingest one document: extract → chunk → embed → index.
    ///
    /// Every chunk carries the caller's `metadata` plus `source`, `file_name`,
    /// `document_id` and `chunk_id`. Ingestion is all-or-nothing: on any
    /// error neither the index nor the registry changes.
    ///
    /// # Errors
    ///
    /// - [`RagError::UnsupportedFileType`] for anything but `.pdf` / `.txt`
    /// - [`RagError::ExtractionError`] if the file cannot be read or yields no text
    /// - [`RagError::EmbeddingError`] if the embedding backend fails
    /// - [`RagError::VectorStoreError`] if the index rejects the vectors
    pub async fn add_document(
        &self,
        source: DocumentSource,
        metadata: HashMap<String, String>,
    ) -> Result<IngestedDocument> {
        let file_name = source.file_name();
        let location = source.location();
        let kind = FileKind::from_file_name(&file_name)?;

        let bytes = source.read().await?;
        let extractor = Arc::clone(&self.extractor);
        let name = file_name.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&name, &bytes, kind))
            .await
            .map_err(|e| RagError::ExtractionError {
                file: file_name.clone(),
                message: format!("extraction task failed: {e}"),
            })
            .and_then(|extracted| extracted)
            .inspect_err(|e| error!(file = %file_name, error = %e, "text extraction failed"))?;

        let pieces = self.chunker.split(&text);
        if pieces.is_empty() {
            return Err(RagError::ExtractionError {
                file: file_name,
                message: "document contains no text".to_string(),
            });
        }

        let id = DocumentId::new();
        let chunks: Vec<DocumentChunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| {
                let mut extra_metadata = metadata.clone();
                extra_metadata.insert("source".to_string(), location.clone());
                extra_metadata.insert("file_name".to_string(), file_name.clone());
                extra_metadata.insert("document_id".to_string(), id.to_string());
                extra_metadata.insert("chunk_id".to_string(), chunk_index.to_string());
                DocumentChunk {
                    content,
                    source_file: file_name.clone(),
                    chunk_index,
                    document_id: id.clone(),
                    extra_metadata,
                }
            })
            .collect();

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let vectors = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %id, error = %e, "embedding failed during ingestion");
            RagError::EmbeddingError(e)
        })?;
        if vectors.len() != chunks.len() {
            return Err(RagError::VectorStoreError {
                backend: "embedding".to_string(),
                message: format!("expected {} vectors, got {}", chunks.len(), vectors.len()),
            });
        }

        let entries: Vec<EmbeddedChunk> = chunks
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect();

        let chunk_count = chunks.len();
        {
            let mut registry = self.registry.write().await;
            self.vector_store.upsert(entries).await.map_err(|e| {
                error!(document.id = %id, error = %e, "upsert failed during ingestion");
                e
            })?;
            registry.extend(chunks);
        }

        info!(document.id = %id, file = %file_name, chunk_count, "ingested document");
        Ok(IngestedDocument { id, file_name, chunk_count })
    }

    /// Counts and file names of everything ingested.
    ///
    /// Documents are counted by distinct file name. Uploading a file name twice
    /// indexes both copies, so `chunk_count` includes each of them.
    pub async fn get_stats(&self) -> DocumentStats {
        let registry = self.registry.read().await;
        let file_names: BTreeSet<&str> = registry.iter().map(|c| c.source_file.as_str()).collect();
        DocumentStats {
            document_count: file_names.len(),
            chunk_count: registry.len(),
            distinct_file_names: file_names.into_iter().map(str::to_string).collect(),
            has_index: !self.vector_store.is_empty().await,
        }
    }

    /// Write `vectors.json` and `registry.json` into `dir`, creating it if needed.
    pub async fn persist(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| persistence_error(dir, e))?;

        let registry = self.registry.read().await;
        self.vector_store.save(&dir.join(VECTORS_FILE)).await?;

        let registry_path = dir.join(REGISTRY_FILE);
        let json = serde_json::to_vec(&*registry).map_err(|e| persistence_error(&registry_path, e))?;
        tokio::fs::write(&registry_path, json)
            .await
            .map_err(|e| persistence_error(&registry_path, e))?;

        info!(path = %dir.display(), chunk_count = registry.len(), "persisted document store");
        Ok(())
    }

    /// Replace the store's contents with a snapshot written by [`persist`](Self::persist).
    ///
    /// Returns `false`, leaving the store untouched, when `dir` holds no snapshot.
    pub async fn restore(&self, dir: &Path) -> Result<bool> {
        let registry_path = dir.join(REGISTRY_FILE);
        let vectors_path = dir.join(VECTORS_FILE);
        if !registry_path.exists() || !vectors_path.exists() {
            return Ok(false);
        }

        let bytes =
            tokio::fs::read(&registry_path).await.map_err(|e| persistence_error(&registry_path, e))?;
        let chunks: Vec<DocumentChunk> =
            serde_json::from_slice(&bytes).map_err(|e| persistence_error(&registry_path, e))?;

        let mut registry = self.registry.write().await;
        self.vector_store.load(&vectors_path).await?;
        *registry = chunks;

        info!(path = %dir.display(), chunk_count = registry.len(), "restored document store");
        Ok(true)
    }
}

fn persistence_error(path: &Path, e: impl std::fmt::Display) -> RagError {
    RagError::PersistenceError { path: path.display().to_string(), message: e.to_string() }
}

/// Builder for constructing a [`DocumentStore`].
///
/// Only the embedding provider is required. The chunker defaults to a
/// [`RecursiveChunker`] sized from the config, the vector store to an
/// [`InMemoryVectorStore`], and the extractor to [`DefaultTextExtractor`].
#[derive(Default)]
pub struct DocumentStoreBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl DocumentStoreBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the [`DocumentStore`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no embedding provider was set.
    pub fn build(self) -> Result<DocumentStore> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });

        Ok(DocumentStore {
            config,
            embedding_provider,
            vector_store: self.vector_store.unwrap_or_else(|| Arc::new(InMemoryVectorStore::new())),
            chunker,
            extractor: self.extractor.unwrap_or_else(|| Arc::new(DefaultTextExtractor)),
            registry: RwLock::new(Vec::new()),
        })
    }
}
