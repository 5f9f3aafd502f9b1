//! Embedding providers
//!
//! The ranking core only needs two capabilities from a provider: turn a
//! text or an image into a unit-length vector of fixed dimensionality.
//!
//! Backends:
//! - `hash`: FNV-1a feature hashing, deterministic, no model needed
//! - `http`: a model server speaking a small JSON protocol
//! - `none`: no provider; visual retrieval is unavailable

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{InvError, Result};

/// Maps texts and images into a shared unit-vector space.
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;
    fn dims(&self) -> usize;
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
    fn embed_image(&self, path: &Path) -> Result<Vec<f32>>;
}

/// Build the configured provider. `Ok(None)` means the provider is absent.
pub fn build_provider(config: &EmbeddingConfig) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
    let backend = config.backend.trim().to_lowercase();
    let dims = config.dims as usize;
    if dims == 0 {
        return Err(InvError::Config(
            "embedding.dims must be greater than 0".to_string(),
        ));
    }

    match backend.as_str() {
        "none" | "off" => Ok(None),
        "" | "hash" => Ok(Some(Arc::new(HashEmbedder::new(dims)))),
        "http" => {
            if config.endpoint.trim().is_empty() {
                return Err(InvError::MissingConfig(
                    "embedding.endpoint is required for backend=http".to_string(),
                ));
            }
            let embedder = HttpEmbedder::new(
                &config.endpoint,
                dims,
                Duration::from_millis(config.timeout_ms),
            )?;
            Ok(Some(Arc::new(embedder)))
        }
        other => Err(InvError::Config(format!(
            "unknown embedding backend: {other}"
        ))),
    }
}

/// Hash embedder using FNV-1a
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 512 }
    }
}

impl HashEmbedder {
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Embed text into an L2-normalized vector.
    ///
    /// Text with no usable tokens yields the zero vector.
    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        if self.dim == 0 {
            return Vec::new();
        }

        let tokens = tokenize(text);
        let mut embedding = vec![0.0; self.dim];

        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            accumulate_embedding(&mut embedding, token, 1.0);
        }

        for window in tokens.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            accumulate_embedding(&mut embedding, &bigram, 0.5);
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dims(&self) -> usize {
        self.dim
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        into_unit_vector(self.embed(text))
    }

    /// Hashes the image's file-name words; the file must be readable.
    fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        std::fs::metadata(path)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .replace(['_', '-', '.'], " ");
        into_unit_vector(self.embed(&stem))
    }
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for an external embedding server.
///
/// `POST {endpoint}/embed/text  {"text": "..."}`
/// `POST {endpoint}/embed/image {"path": "..."}`
/// both answering `{"embedding": [f32; dims]}`.
pub struct HttpEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    dims: usize,
}

impl HttpEmbedder {
    pub fn new(endpoint: &str, dims: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            dims,
        })
    }

    fn post<T: Serialize>(&self, route: &str, body: &T) -> Result<Vec<f32>> {
        let url = format!("{}/{route}", self.endpoint);
        let response: EmbeddingResponse = self
            .client
            .post(&url)
            .json(body)
            .send()?
            .error_for_status()?
            .json()?;

        ensure_dims(&response.embedding, self.dims)?;
        into_unit_vector(response.embedding)
    }
}

impl EmbeddingProvider for HttpEmbedder {
    fn name(&self) -> &str {
        "http"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.post("embed/text", &TextRequest { text })
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        let path = path.to_str().ok_or_else(|| {
            InvError::Embedding(format!("non UTF-8 image path: {}", path.display()))
        })?;
        self.post("embed/image", &ImageRequest { path })
    }
}

/// Reject vectors whose length differs from `expected`.
pub fn ensure_dims(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(InvError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

/// Dot product; equals cosine similarity for unit vectors.
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity for arbitrary vectors, clamped to [-1, 1].
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot_product(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}

/// Normalize to unit length; a zero or non-finite vector has no direction
/// and is an [`InvError::Embedding`].
pub fn into_unit_vector(mut vector: Vec<f32>) -> Result<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(InvError::Embedding(format!(
            "embedding has no direction (norm {norm})"
        )));
    }
    for value in &mut vector {
        *value /= norm;
    }
    Ok(vector)
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= 2)
        .map(ToString::to_string)
        .collect()
}

fn accumulate_embedding(embedding: &mut [f32], token: &str, weight: f32) {
    let token_hash = fnv1a_hash(token.as_bytes());

    for i in 0..embedding.len() {
        let dim_hash = fnv1a_hash_with_salt(token_hash, i as u64);
        let sign = if dim_hash & 1 == 0 { weight } else { -weight };
        let dim = ((dim_hash >> 1) as usize) % embedding.len();
        embedding[dim] += sign;
    }
}

fn fnv1a_hash_with_salt(seed: u64, salt: u64) -> u64 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..].copy_from_slice(&salt.to_le_bytes());
    fnv1a_hash(&bytes)
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
