//! # parley-rag
//!
//! Document ingestion, vector retrieval and grounded answers.
//!
//! ## Overview
//!
//! - [`RecursiveChunker`] — paragraph → line → word → character splitting with overlap
//! - [`EmbeddingProvider`] — the embedding seam; [`HashingEmbeddingProvider`] ships for
//!   tests and offline runs, `openai::OpenAIEmbeddingProvider` behind the `openai` feature
//! - [`VectorStore`] / [`InMemoryVectorStore`] — exact cosine search with JSON snapshots
//! - [`DocumentStore`] — extract → chunk → embed → index, plus stats and persistence
//! - [`Retriever`] — top-k chunks for a query
//! - [`AnswerComposer`] — context-grounded answers with sources and confidence
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parley_rag::{AnswerComposer, DocumentSource, DocumentStore, HashingEmbeddingProvider};
//!
//! let store = DocumentStore::builder()
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .build()?;
//! store.add_document(DocumentSource::path("handbook.pdf"), Default::default()).await?;
//!
//! let composer = AnswerComposer::new(store.retriever(), backend);
//! let answer = composer.answer("How many vacation days do I get?", 3).await;
//! ```

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod hashing;
pub mod inmemory;
#[cfg(feature = "openai")]
pub mod openai;
pub mod retriever;
pub mod store;
pub mod vectorstore;

pub use answer::{Answer, AnswerComposer, NO_CONTEXT_ANSWER, Source};
pub use chunking::{Chunker, RecursiveChunker, split_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    DocumentChunk, DocumentId, DocumentSource, EmbeddedChunk, FileKind, RetrievalResult,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::{DefaultTextExtractor, TextExtractor};
pub use hashing::HashingEmbeddingProvider;
pub use inmemory::InMemoryVectorStore;
pub use retriever::Retriever;
pub use store::{DocumentStats, DocumentStore, DocumentStoreBuilder, IngestedDocument};
pub use vectorstore::VectorStore;
