//! Data types for document sources, chunks, and retrieval results.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RagError, Result};

/// Opaque identifier assigned to every ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// Determine the kind from a file name's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFileType`] for anything but `.pdf` and `.txt`.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Text),
            _ => Err(RagError::UnsupportedFileType { extension }),
        }
    }
}

/// Where a document's bytes come from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file on disk.
    Path(PathBuf),
    /// An in-memory upload with its original file name.
    Bytes { file_name: String, data: Vec<u8> },
}

impl DocumentSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes { file_name: file_name.into(), data: data.into() }
    }

    /// The full source location, recorded as the `source` metadata field.
    pub fn location(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    /// The base file name, used for attribution.
    pub fn file_name(&self) -> String {
        let location = self.location();
        Path::new(&location)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or(location)
    }

    /// Read the raw bytes.
    pub(crate) async fn read(self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => tokio::fs::read(&path).await.map_err(|e| RagError::ExtractionError {
                file: path.display().to_string(),
                message: format!("failed to read file: {e}"),
            }),
            Self::Bytes { data, .. } => Ok(data),
        }
    }
}

/// A segment of an ingested document. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// The text content of the chunk.
    pub content: String,
    /// Base name of the file the chunk came from.
    pub source_file: String,
    /// Position of the chunk within its document, starting at zero.
    pub chunk_index: usize,
    /// The document this chunk belongs to.
    pub document_id: DocumentId,
    /// Caller metadata plus `source`, `file_name`, `document_id` and `chunk_id`.
    pub extra_metadata: HashMap<String, String>,
}

impl DocumentChunk {
    /// Identifier unique across the index: `{document_id}_{chunk_index}`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.document_id, self.chunk_index)
    }
}

/// A [`DocumentChunk`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: DocumentChunk,
    pub vector: Vec<f32>,
}

/// A retrieved [`DocumentChunk`] paired with its similarity score.
///
/// Scores lie in `[0, 1]`; higher is more similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: DocumentChunk,
    pub similarity_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_from_extension() {
        assert_eq!(FileKind::from_file_name("report.PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_file_name("notes.txt").unwrap(), FileKind::Text);
        match FileKind::from_file_name("slides.docx") {
            Err(RagError::UnsupportedFileType { extension }) => assert_eq!(extension, "docx"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(FileKind::from_file_name("README").is_err());
    }

    #[test]
    fn source_file_name_strips_directories() {
        let source = DocumentSource::path("/tmp/uploads/guide.txt");
        assert_eq!(source.file_name(), "guide.txt");
        assert_eq!(source.location(), "/tmp/uploads/guide.txt");
        assert_eq!(DocumentSource::bytes("a.pdf", vec![1]).file_name(), "a.pdf");
    }
}
