//! Query-time retrieval: embed the question, search the index.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Finds the chunks most similar to a query.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { embedding_provider, vector_store }
    }

    /// Return up to `k` chunks ordered by descending similarity.
    ///
    /// An empty index short-circuits to an empty result without calling the
    /// embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the query cannot be embedded,
    /// or the vector store's error if the search fails.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        if k == 0 || self.vector_store.is_empty().await {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::EmbeddingError(e)
        })?;

        let results = self.vector_store.search(&query_embedding, k).await.map_err(|e| {
            error!(error = %e, "vector store search failed");
            e
        })?;

        debug!(result_count = results.len(), k, "retrieval completed");
        Ok(results)
    }
}
