//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use parley_chat::SessionManager;
use parley_core::{ApiEndpoint, CompletionBackend, RetryPolicy};
use parley_model::{ModelConfig, OpenAIClient, RetryingBackend};
use parley_rag::openai::OpenAIEmbeddingProvider;
use parley_rag::{AnswerComposer, DocumentStore};
use tracing::info;

use crate::config::AppConfig;

/// Upload cap enforced by `/api/upload-document`.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Everything the handlers share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn CompletionBackend>,
    pub sessions: SessionManager,
    pub documents: Arc<DocumentStore>,
    pub answers: AnswerComposer,
    /// Where the index is persisted after each ingestion, if anywhere.
    pub index_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        documents: Arc<DocumentStore>,
        history_exchanges: usize,
    ) -> Self {
        let answers = AnswerComposer::new(documents.retriever(), Arc::clone(&backend));
        Self {
            sessions: SessionManager::with_max_exchanges(Arc::clone(&backend), history_exchanges),
            backend,
            documents,
            answers,
            index_path: None,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

/// Build the production state: Azure OpenAI completions with retries and
/// Azure OpenAI embeddings.
///
/// # Errors
///
/// Fails when no API key can be resolved or a client rejects its settings.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let api_key = config.resolve_api_key().await?;
    let endpoint = ApiEndpoint::azure(config.endpoint.clone(), api_key, config.api_version.clone());

    let client = OpenAIClient::new(
        ModelConfig::new(endpoint.clone(), config.deployment.clone()).with_timeout(config.request_timeout),
    )?;
    let backend: Arc<dyn CompletionBackend> =
        Arc::new(RetryingBackend::new(Arc::new(client), RetryPolicy::default()));

    let embedder = OpenAIEmbeddingProvider::new(endpoint, config.embedding_deployment.clone())?
        .with_timeout(config.request_timeout);

    let documents = DocumentStore::builder()
        .config(config.rag_config()?)
        .embedding_provider(Arc::new(embedder))
        .build()?;

    info!(
        deployment = %config.deployment,
        embedding_deployment = %config.embedding_deployment,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        "backends configured"
    );

    let mut state = AppState::new(backend, Arc::new(documents), config.history_exchanges);
    if let Some(path) = &config.index_path {
        state = state.with_index_path(path.clone());
    }
    Ok(state)
}
