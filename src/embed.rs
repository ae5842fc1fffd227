use anyhow::Context as _;
use async_trait::async_trait;
use sha2::{Digest as _, Sha256};

use crate::openai::OpenAiClient;

pub const DEFAULT_HASH_DIM: usize = 256;
const MIN_TOKEN_CHARS: usize = 3;

/// Turns texts into vectors. Implementations must return one vector per
/// input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Offline embedder: signed feature hashing over lowercase word tokens.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        for token in tokens(text) {
            let (idx, sign) = hash_token_feature(&token, self.dim);
            vec[idx] += sign;
        }
        l2_normalize(vec)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
}

fn hash_token_feature(token: &str, dim: usize) -> (usize, f32) {
    let hash = Sha256::digest(token.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    let val = u64::from_le_bytes(bytes);
    let idx = (val % dim as u64) as usize;
    let sign = if val >> 63 == 1 { 1.0 } else { -1.0 };
    (idx, sign)
}

fn l2_normalize(mut vec: Vec<f32>) -> Vec<f32> {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vec {
            *v /= norm;
        }
    }
    vec
}

/// Embeddings from the OpenAI `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(model = %self.model, inputs = texts.len(), "openai embeddings");
        let vectors = self
            .client
            .embeddings(&self.model, texts)
            .await
            .context("embed texts via OpenAI")?;
        if vectors.len() != texts.len() {
            anyhow::bail!(
                "embedding count mismatch: sent {} inputs, got {} vectors",
                texts.len(),
                vectors.len()
            );
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn hash_embedder_is_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_one("Government surveillance and control");
        let b = embedder.embed_one("government SURVEILLANCE, and control!");
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hash_embedder_ignores_short_tokens() {
        let embedder = HashEmbedder::new(64);
        let vec = embedder.embed_one("a an to of");
        assert!(vec.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn hash_embedder_embeds_each_input_in_order() {
        let embedder = HashEmbedder::new(128);
        let texts = vec!["dragon treasure".to_owned(), "ocean whale".to_owned()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], embedder.embed_one("dragon treasure"));
        assert_eq!(vectors[1], embedder.embed_one("ocean whale"));
    }
}
