//! The embedding seam.

use async_trait::async_trait;
use parley_core::BackendError;

/// Turns text into fixed-length vectors.
///
/// Every vector a provider returns has [`dimensions`](Self::dimensions)
/// entries. Batch results come back in input order; providers with a native
/// batch endpoint override [`embed_batch`](Self::embed_batch), the rest get
/// one [`embed`](Self::embed) call per input.
///
/// ```rust,ignore
/// let provider = HashingEmbeddingProvider::default();
/// let vectors = provider.embed_batch(&["first chunk", "second chunk"]).await?;
/// assert_eq!(vectors[0].len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError>;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, BackendError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize;
}
