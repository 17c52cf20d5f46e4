//! Chunking and retrieval settings.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Settings shared by the chunker, the document store and the retriever.
///
/// Build one with [`RagConfig::builder`] so the invariants below are checked:
/// `chunk_size > 0`, `chunk_overlap < chunk_size` and `top_k > 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Upper bound on a chunk's length, in characters.
    pub chunk_size: usize,
    /// Characters of trailing context repeated at the start of the next chunk.
    pub chunk_overlap: usize,
    /// Context chunks used for an answer when the caller gives no limit.
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, top_k: 3 }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Step-by-step construction of a [`RagConfig`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// # Errors
    ///
    /// [`RagError::ConfigError`] naming the first violated invariant.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
