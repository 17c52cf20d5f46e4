//! Ingestion, retrieval and answering against a scripted completion backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::{BackendError, Role};
use parley_model::MockBackend;
use parley_rag::{
    AnswerComposer, DocumentSource, DocumentStore, EmbeddingProvider, FileKind,
    HashingEmbeddingProvider, NO_CONTEXT_ANSWER, RagConfig, RagError, TextExtractor,
};

const SKY: &str = "The sky is blue. The grass is green.";

/// Delegates to feature hashing and counts calls; optionally always fails.
struct CountingEmbedder {
    inner: HashingEmbeddingProvider,
    calls: AtomicUsize,
    fail: bool,
}

impl CountingEmbedder {
    fn new(fail: bool) -> Self {
        Self { inner: HashingEmbeddingProvider::new(128), calls: AtomicUsize::new(0), fail }
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BackendError::Status {
                provider: "test".into(),
                status: 400,
                message: "bad input".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Blocks its thread for a while before returning the text unchanged.
struct SlowExtractor(Duration);

impl TextExtractor for SlowExtractor {
    fn extract_text(&self, _file_name: &str, bytes: &[u8], _kind: FileKind) -> parley_rag::Result<String> {
        std::thread::sleep(self.0);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

struct PanickingExtractor;

impl TextExtractor for PanickingExtractor {
    fn extract_text(&self, _file_name: &str, _bytes: &[u8], _kind: FileKind) -> parley_rag::Result<String> {
        panic!("corrupt font table");
    }
}

fn small_config() -> RagConfig {
    RagConfig::builder().chunk_size(20).chunk_overlap(5).build().unwrap()
}

fn store_with(embedder: Arc<dyn EmbeddingProvider>) -> DocumentStore {
    DocumentStore::builder().config(small_config()).embedding_provider(embedder).build().unwrap()
}

fn sky_source() -> DocumentSource {
    DocumentSource::bytes("sky.txt", SKY)
}

#[tokio::test]
async fn sky_document_end_to_end() {
    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    let ingested = store.add_document(sky_source(), HashMap::new()).await.unwrap();
    assert!(ingested.chunk_count >= 2);
    assert_eq!(ingested.file_name, "sky.txt");

    let results = store.retriever().retrieve("What color is the sky?", 3).await.unwrap();
    assert!(!results.is_empty());
    assert!(results[0].chunk.content.contains("sky"));

    let backend = Arc::new(MockBackend::new().with_reply("The sky is blue."));
    let composer = AnswerComposer::new(store.retriever(), backend.clone());
    let answer = composer.answer("What color is the sky?", 3).await;

    assert_eq!(answer.answer, "The sky is blue.");
    assert!(answer.confidence > 0.0);
    let min = answer.sources.iter().map(|s| s.similarity_score).fold(f32::INFINITY, f32::min);
    assert_eq!(answer.confidence, min);
    assert!(answer.sources.iter().all(|s| s.file_name == "sky.txt"));

    let request = backend.last_request().unwrap();
    assert_eq!(request.temperature, 0.1);
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert!(request.messages[0].content.contains("Source: sky.txt\n"));
    assert_eq!(request.messages[1].content, "What color is the sky?");
}

#[tokio::test]
async fn empty_store_answers_with_fallback_without_embedding() {
    let embedder = Arc::new(CountingEmbedder::new(false));
    let store = store_with(embedder.clone());
    let backend = Arc::new(MockBackend::new());

    let answer = AnswerComposer::new(store.retriever(), backend.clone()).answer("anything?", 3).await;

    assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.confidence, 0.0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn completion_failure_becomes_error_answer() {
    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    store.add_document(sky_source(), HashMap::new()).await.unwrap();

    let backend = Arc::new(MockBackend::new().with_failure(BackendError::Timeout {
        provider: "mock".into(),
        seconds: 60,
    }));
    let answer = AnswerComposer::new(store.retriever(), backend).answer("sky?", 2).await;

    assert!(answer.answer.starts_with("Error processing question: "));
    assert!(answer.sources.is_empty());
    assert_eq!(answer.confidence, 0.0);
}

#[tokio::test]
async fn completion_failure_is_typed() {
    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    store.add_document(sky_source(), HashMap::new()).await.unwrap();

    let backend = Arc::new(MockBackend::new().with_failure(BackendError::Timeout {
        provider: "mock".into(),
        seconds: 60,
    }));
    let err = AnswerComposer::new(store.retriever(), backend).try_answer("sky?", 2).await.unwrap_err();

    assert!(matches!(err, RagError::CompletionError(BackendError::Timeout { seconds: 60, .. })));
    assert_eq!(err.to_string(), "Completion error: mock request timed out after 60s");
}

#[tokio::test]
async fn embedding_failure_leaves_store_untouched() {
    let store = store_with(Arc::new(CountingEmbedder::new(true)));

    let err = store.add_document(sky_source(), HashMap::new()).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError(_)));

    let stats = store.get_stats().await;
    assert_eq!(stats.chunk_count, 0);
    assert_eq!(stats.document_count, 0);
    assert!(!stats.has_index);
}

#[tokio::test]
async fn unsupported_extension_is_rejected_before_reading() {
    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    let err = store
        .add_document(DocumentSource::path("/does/not/exist/slides.pptx"), HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFileType { extension } if extension == "pptx"));
}

#[tokio::test]
async fn missing_file_is_an_extraction_error() {
    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    let err = store
        .add_document(DocumentSource::path("/does/not/exist/notes.txt"), HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::ExtractionError { .. }));
}

#[tokio::test]
async fn stats_count_documents_and_sort_file_names() {
    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    store.add_document(DocumentSource::bytes("zeta.txt", SKY), HashMap::new()).await.unwrap();
    store.add_document(DocumentSource::bytes("alpha.txt", "short"), HashMap::new()).await.unwrap();
    store.add_document(DocumentSource::bytes("zeta.txt", SKY), HashMap::new()).await.unwrap();

    let stats = store.get_stats().await;
    assert_eq!(stats.document_count, 2);
    assert_eq!(stats.distinct_file_names, vec!["alpha.txt", "zeta.txt"]);
    assert!(stats.chunk_count >= 5);
    assert!(stats.has_index);
    assert_eq!(store.vector_store().len().await, stats.chunk_count);
}

#[tokio::test]
async fn reuploaded_file_counts_once_but_indexes_both_copies() {
    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    let first = store.add_document(DocumentSource::bytes("a.txt", "alpha"), HashMap::new()).await.unwrap();
    let second = store.add_document(DocumentSource::bytes("a.txt", "alpha"), HashMap::new()).await.unwrap();
    assert_ne!(first.id, second.id);

    let stats = store.get_stats().await;
    assert_eq!(stats.document_count, 1);
    assert_eq!(stats.distinct_file_names, vec!["a.txt"]);
    assert_eq!(stats.chunk_count, 2);
}

#[tokio::test]
async fn extraction_does_not_block_the_runtime() {
    let store = DocumentStore::builder()
        .config(small_config())
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .extractor(Arc::new(SlowExtractor(Duration::from_millis(300))))
        .build()
        .unwrap();
    let order = Mutex::new(Vec::new());

    let ingest = async {
        store.add_document(sky_source(), HashMap::new()).await.unwrap();
        order.lock().unwrap().push("ingested");
    };
    let tick = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().unwrap().push("tick");
    };
    tokio::join!(ingest, tick);

    assert_eq!(*order.lock().unwrap(), vec!["tick", "ingested"]);
}

#[tokio::test]
async fn panicking_extractor_is_an_extraction_error() {
    let store = DocumentStore::builder()
        .config(small_config())
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .extractor(Arc::new(PanickingExtractor))
        .build()
        .unwrap();

    let err = store.add_document(sky_source(), HashMap::new()).await.unwrap_err();
    match err {
        RagError::ExtractionError { file, message } => {
            assert_eq!(file, "sky.txt");
            assert!(message.starts_with("extraction task failed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.get_stats().await.chunk_count, 0);
}

#[tokio::test]
async fn documents_on_disk_are_ingested_with_their_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guide.txt");
    std::fs::write(&path, SKY).unwrap();

    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    let ingested = store.add_document(DocumentSource::path(&path), HashMap::new()).await.unwrap();
    assert_eq!(ingested.file_name, "guide.txt");

    let results = store.retriever().retrieve("grass", 1).await.unwrap();
    assert_eq!(results[0].chunk.extra_metadata["source"], path.display().to_string());
}

#[tokio::test]
async fn persist_and_restore_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("index");

    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    store.add_document(sky_source(), HashMap::new()).await.unwrap();
    store.persist(&snapshot).await.unwrap();

    let restored = store_with(Arc::new(HashingEmbeddingProvider::default()));
    assert!(restored.restore(&snapshot).await.unwrap());
    assert_eq!(restored.get_stats().await, store.get_stats().await);

    let results = restored.retriever().retrieve("What color is the sky?", 1).await.unwrap();
    assert!(results[0].chunk.content.contains("sky"));
}

#[tokio::test]
async fn restore_from_missing_directory_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(Arc::new(HashingEmbeddingProvider::default()));
    assert!(!store.restore(&dir.path().join("nothing-here")).await.unwrap());
    assert_eq!(store.get_stats().await.chunk_count, 0);
}
