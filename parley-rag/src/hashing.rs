//! Deterministic bag-of-words embeddings via feature hashing.
//!
//! No network, no model: every lowercase alphanumeric token is hashed with
//! FNV-1a into one of `dimensions` buckets, with the sign taken from the high
//! bit of the hash, and the result is L2-normalized. Texts that share words
//! end up with positive cosine similarity, which is enough for tests and
//! offline runs.

use async_trait::async_trait;
use parley_core::BackendError;

use crate::embedding::EmbeddingProvider;

/// Default number of hash buckets.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 512;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// An [`EmbeddingProvider`] that hashes tokens into a fixed-size vector.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl HashingEmbeddingProvider {
    /// Create a provider with the given number of buckets (at least one).
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    /// Embed synchronously. Blank text maps to the zero vector.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
