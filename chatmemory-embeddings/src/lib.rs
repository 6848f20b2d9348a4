#![deny(missing_docs)]
//! Reference [`EmbeddingService`] implementation.
//!
//! [`DeterministicEmbedder`] never calls a model: it seeds a PRNG from a
//! hash of the normalized input, fills a standard-normal vector via
//! Box-Muller, perturbs it with per-codepoint and per-word signal, and
//! optionally L2-normalizes. This is reproducible and cheap enough for
//! tests and local development; its cosine similarity correlates only
//! weakly with lexical overlap, which is sufficient for exercising the
//! retrieval surface but not a substitute for a real embedding model.

use std::f64::consts::PI;

use async_trait::async_trait;
use chatmemory_types::{EmbeddingService, MemoryError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 256;

/// Default cap on the number of texts embedded per `embed_batch` sub-batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 64;

/// Deterministic, seeded reference embedder.
pub struct DeterministicEmbedder {
    dimension: usize,
    normalize: bool,
    max_batch_size: usize,
}

impl DeterministicEmbedder {
    /// Create an embedder of the given dimension, L2-normalized, using the
    /// default batch-chunk size.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            normalize: true,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Create an embedder with explicit normalization and batching knobs.
    #[must_use]
    pub fn with_config(dimension: usize, normalize: bool, max_batch_size: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            normalize,
            max_batch_size: max_batch_size.max(1),
        }
    }

    fn normalized_text(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn hash_str(text: &str) -> u64 {
        // FNV-1a 64-bit: simple, deterministic, dependency-free.
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in text.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    /// Box-Muller transform; guards `ln(0)` by flooring the first uniform
    /// draw away from zero.
    fn box_muller_pair(rng: &mut StdRng) -> (f64, f64) {
        let u1: f64 = rng.r#gen::<f64>().max(f64::EPSILON);
        let u2: f64 = rng.r#gen::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        (radius * theta.cos(), radius * theta.sin())
    }

    fn standard_normal_vector(&self, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut v = Vec::with_capacity(self.dimension);
        while v.len() < self.dimension {
            let (a, b) = Self::box_muller_pair(&mut rng);
            v.push(a as f32);
            if v.len() < self.dimension {
                v.push(b as f32);
            }
        }
        v
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        if text.trim().is_empty() {
            return vec![0.0; self.dimension];
        }
        let normalized = Self::normalized_text(text);
        let seed = Self::hash_str(&normalized);
        let mut v = self.standard_normal_vector(seed);

        for ch in normalized.chars() {
            let idx = (ch as u32 as usize) % self.dimension;
            v[idx] += 0.01;
        }

        for word in normalized.split(' ').filter(|w| !w.is_empty()) {
            let idx = (Self::hash_str(word) as usize) % self.dimension;
            v[idx] += 0.05;
        }

        if self.normalize {
            let norm = (v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>()).sqrt();
            if norm > 0.0 {
                for x in &mut v {
                    *x = (*x as f64 / norm) as f32;
                }
            }
        }

        v
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingService for DeterministicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let v = self.embed_sync(text);
        if v.iter().any(|x| !x.is_finite()) {
            return Err(MemoryError::embedding(
                "reference embedder produced a non-finite value",
            ));
        }
        Ok(v)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.max_batch_size) {
            for text in chunk {
                out.push(self.embed(text).await?);
            }
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
