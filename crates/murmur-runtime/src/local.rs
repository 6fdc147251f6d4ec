//! Offline embedding driver.
//!
//! Feature hashing over word tokens and character trigrams. Deterministic and
//! dependency-free at runtime, so the semantic tier works without a network.
//! Texts sharing most of their words land close together; it knows nothing
//! about synonyms.

use async_trait::async_trait;
use murmur_types::embedding::{EmbeddingDriver, EmbeddingError};
use sha2::{Digest, Sha256};

/// Dimensions used when the model name does not carry a usable size.
pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

const TOKEN_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Hashing embedder. Model names look like `hash-384`.
#[derive(Debug, Clone)]
pub struct HashEmbeddingDriver {
    dims: usize,
}

impl HashEmbeddingDriver {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// Parse `hash-<dims>`; anything else falls back to 384 dimensions.
    pub fn from_model_name(model: &str) -> Self {
        let dims = model
            .strip_prefix("hash-")
            .and_then(|d| d.parse::<usize>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_HASH_DIMENSIONS);
        Self::new(dims)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            self.accumulate(&mut v, token, TOKEN_WEIGHT);
            let padded: Vec<char> = format!("#{token}#").chars().collect();
            for window in padded.windows(3) {
                let gram: String = window.iter().collect();
                self.accumulate(&mut v, &gram, TRIGRAM_WEIGHT);
            }
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    fn accumulate(&self, v: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

impl Default for HashEmbeddingDriver {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingDriver for HashEmbeddingDriver {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}
