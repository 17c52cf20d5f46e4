//! OpenAI / Azure OpenAI embedding provider.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_openai::types::CreateEmbeddingRequestArgs;
use async_trait::async_trait;
use parley_core::{ApiEndpoint, BackendError, RetryPolicy};
use parley_model::ApiClient;
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Dimensionality of `text-embedding-ada-002`.
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// Inputs sent per embeddings request.
const BATCH_SIZE: usize = 16;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// An [`EmbeddingProvider`] backed by the `embeddings` operation of an
/// Azure OpenAI deployment or an OpenAI-compatible API.
///
/// Transient failures are retried according to the configured [`RetryPolicy`].
///
/// # Example
///
/// ```rust,ignore
/// use parley_core::ApiEndpoint;
/// use parley_rag::openai::OpenAIEmbeddingProvider;
///
/// let endpoint = ApiEndpoint::azure("https://res.openai.azure.com", key, "2024-05-01-preview");
/// let provider = OpenAIEmbeddingProvider::new(endpoint, "text-embedding-ada-002")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    api: ApiClient,
    model: String,
    dimensions: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for `model` (the deployment name on Azure).
    pub fn new(endpoint: ApiEndpoint, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if endpoint.api_key.is_empty() {
            return Err(RagError::ConfigError("embedding API key must not be empty".into()));
        }
        if model.is_empty() {
            return Err(RagError::ConfigError("embedding model must not be empty".into()));
        }
        let api =
            ApiClient::new(&endpoint, &model).map_err(|e| RagError::ConfigError(e.to_string()))?;

        Ok(Self {
            api,
            model,
            dimensions: DEFAULT_DIMENSIONS,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        })
    }

    /// Declare the dimensionality of the model's vectors.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn provider(&self) -> &'static str {
        self.api.provider()
    }

    async fn request(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, BackendError> {
        let input: Vec<String> = texts.iter().map(|text| text.to_string()).collect();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(input)
            .build()
            .map_err(|e| self.api.map_error(e))?;

        let response = tokio::time::timeout(self.timeout, self.api.embeddings(request))
            .await
            .map_err(|_| BackendError::Timeout {
                provider: self.provider().into(),
                seconds: self.timeout.as_secs(),
            })?
            .inspect_err(|e| error!(provider = self.provider(), error = %e, "embedding request failed"))?;

        debug!(
            provider = self.provider(),
            prompt_tokens = response.usage.prompt_tokens,
            total_tokens = response.usage.total_tokens,
            "embedding usage"
        );

        let mut data = response.data;
        if data.len() != texts.len() {
            return Err(BackendError::Decode {
                provider: self.provider().into(),
                message: format!("expected {} embeddings, got {}", texts.len(), data.len()),
            });
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, BackendError> {
        debug!(provider = self.provider(), text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::EmptyResponse { provider: self.provider().into() })
    }

    async fn embed_batch(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, BackendError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            debug!(
                provider = self.provider(),
                batch_size = batch.len(),
                model = %self.model,
                "embedding batch"
            );
            vectors.extend(self.retry.run("embeddings", || self.request(batch)).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
