//! Grounded question answering over retrieved chunks.

use std::sync::Arc;

use parley_core::{CompletionBackend, CompletionRequest};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::document::RetrievalResult;
use crate::error::{RagError, Result};
use crate::retriever::Retriever;

/// Answer returned when retrieval finds nothing.
pub const NO_CONTEXT_ANSWER: &str = "I don't have enough information to answer that question.";

const ANSWER_TEMPERATURE: f32 = 0.1;

/// A chunk's attribution in an [`Answer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub file_name: String,
    pub similarity_score: f32,
}

/// A grounded answer with its sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Source>,
    /// The lowest similarity score among the sources; `0.0` without sources.
    pub confidence: f32,
}

impl Answer {
    fn without_sources(answer: String) -> Self {
        Self { answer, sources: Vec::new(), confidence: 0.0 }
    }
}

/// Retrieves context for a question and asks the completion backend to
/// answer from that context alone.
///
/// # Example
///
/// ```rust,ignore
/// let composer = AnswerComposer::new(store.retriever(), backend);
/// let answer = composer.answer("What color is the sky?", 3).await;
/// ```
#[derive(Clone)]
pub struct AnswerComposer {
    retriever: Retriever,
    backend: Arc<dyn CompletionBackend>,
}

impl AnswerComposer {
    pub fn new(retriever: Retriever, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { retriever, backend }
    }

    /// Answer `question` using at most `context_limit` chunks.
    ///
    /// Never fails: retrieval or completion errors become an answer of the
    /// form `Error processing question: <message>` with no sources.
    pub async fn answer(&self, question: &str, context_limit: usize) -> Answer {
        match self.try_answer(question, context_limit).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "question answering failed");
                Answer::without_sources(format!("Error processing question: {e}"))
            }
        }
    }

    /// Like [`answer`](Self::answer), but surfacing failures.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingError`] or [`RagError::VectorStoreError`] from
    /// retrieval, [`RagError::CompletionError`] from the backend.
    pub async fn try_answer(&self, question: &str, context_limit: usize) -> Result<Answer> {
        let results = self.retriever.retrieve(question, context_limit).await?;
        if results.is_empty() {
            return Ok(Answer::without_sources(NO_CONTEXT_ANSWER.to_string()));
        }

        let request = CompletionRequest::with_system(system_prompt(&results), question)
            .temperature(ANSWER_TEMPERATURE);
        let answer = self.backend.complete(request).await.map_err(RagError::CompletionError)?;

        let confidence =
            results.iter().map(|r| r.similarity_score).fold(f32::INFINITY, f32::min);
        let sources = results
            .into_iter()
            .map(|r| Source { file_name: r.chunk.source_file, similarity_score: r.similarity_score })
            .collect::<Vec<_>>();

        info!(source_count = sources.len(), confidence, "answered question");
        Ok(Answer { answer, sources, confidence })
    }
}

fn system_prompt(results: &[RetrievalResult]) -> String {
    let context = results
        .iter()
        .map(|r| format!("Source: {}\n{}", r.chunk.source_file, r.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a helpful assistant that answers questions based on the provided context. \
         Use only the information from the context to answer questions. If the context \
         doesn't contain enough information, say so clearly.\n\nContext:\n{context}"
    )
}
