//! Embedding provider abstraction and implementations.
//!
//! Two providers are available:
//! - **[`HashedEmbedder`]**: deterministic local bag-of-words embedding via
//!   feature hashing. No network, no model files; similarity reduces to
//!   token overlap. The default, and what the test suite runs on.
//! - **[`OpenAiEmbedder`]**: calls the OpenAI embeddings API with retry
//!   and exponential backoff (429/5xx retried, other 4xx fatal).
//!
//! Both vector collections share one provider so catalog and content
//! vectors live in the same space.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// An embedding backend. Implementations must return one vector per input
/// text, in input order, all with [`dims`](EmbeddingProvider::dims) entries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;
    fn dims(&self) -> usize;
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed(&[text.to_string()]).await?;
        out.pop()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

/// Instantiate the provider selected by configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hashed" => Ok(Box::new(HashedEmbedder::new(config.dims.unwrap_or(512)))),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Cosine similarity between two vectors. Returns `0.0` for empty or
/// mismatched inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

// ============ Hashed Provider ============

/// Deterministic feature-hashing embedder.
///
/// Tokenizes on non-alphanumeric boundaries, lowercases, and accumulates
/// each token into the bucket selected by its FNV-1a hash, then
/// L2-normalizes. Identical text always produces identical vectors, across
/// processes and platforms.
pub struct HashedEmbedder {
    dims: usize,
}

impl HashedEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) as usize) % self.dims;
            vec[bucket] += 1.0;
        }

        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    fn model_name(&self) -> &str {
        "hashed"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

// ============ OpenAI Provider ============

/// Embedding provider backed by `POST /v1/embeddings`.
///
/// Requires `OPENAI_API_KEY` in the environment. Transient failures
/// (HTTP 429, 5xx, network errors) are retried with exponential backoff:
/// 1s, 2s, 4s, ... capped at 32s.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model,
            dims,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_embeddings_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }
}

fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashed_embedder_is_deterministic() {
        let e = HashedEmbedder::new(256);
        let a = e.embed_one("ownership and borrowing in Rust").await.unwrap();
        let b = e.embed_one("ownership and borrowing in Rust").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 256);
    }

    #[tokio::test]
    async fn similar_text_scores_higher_than_unrelated() {
        let e = HashedEmbedder::new(256);
        let q = e.embed_one("lesson about ownership").await.unwrap();
        let related = e
            .embed_one("this lesson covers ownership in depth")
            .await
            .unwrap();
        let unrelated = e.embed_one("pasta carbonara recipe").await.unwrap();
        assert!(cosine_similarity(&q, &related) > cosine_similarity(&q, &unrelated));
    }

    #[tokio::test]
    async fn embeddings_are_normalized() {
        let e = HashedEmbedder::new(128);
        let v = e.embed_one("some tokens here").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_empty_or_mismatched_is_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn parse_embeddings_response_extracts_vectors() {
        let json = serde_json::json!({
            "data": [
                { "embedding": [0.1, 0.2] },
                { "embedding": [0.3, 0.4] }
            ]
        });
        let out = parse_embeddings_response(&json).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], vec![0.3f32, 0.4]);
    }

    #[test]
    fn parse_embeddings_response_rejects_malformed() {
        let json = serde_json::json!({ "oops": true });
        assert!(parse_embeddings_response(&json).is_err());
    }
}
