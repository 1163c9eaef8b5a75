//! Deterministic feature-hashing embedder
//!
//! Maps lower-cased character trigrams of each alphanumeric token into a fixed number of
//! buckets and L2-normalizes the counts. No model, no network. Texts sharing word pieces
//! land close together, which is enough for offline use and tests.

use super::EmbeddingProvider;
use anyhow::Result;

pub(crate) const DEFAULT_DIMENSION: usize = 384;

pub struct HashedEmbedder {
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed synchronously; the async trait method delegates here
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let padded: Vec<char> = std::iter::once(' ')
                .chain(token.chars())
                .chain(std::iter::once(' '))
                .collect();
            for gram in padded.windows(3) {
                let mut buf = [0u8; 12];
                let mut len = 0;
                for ch in gram {
                    len += ch.encode_utf8(&mut buf[len..]).len();
                }
                let bucket = (fnv1a_64(&buf[..len]) % self.dimension as u64) as usize;
                vec[bucket] += 1.0;
            }
        }

        normalize(&mut vec);
        vec
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashed-trigram"
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
