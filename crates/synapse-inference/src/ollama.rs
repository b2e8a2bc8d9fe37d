//! Ollama embedding backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use synapse_core::{EmbeddingBackend, Error, Result, Vector};

use crate::config::InferenceConfig;

/// Ollama embedding backend.
///
/// Input text is truncated deterministically to the configured maximum
/// before embedding, and returned vectors are normalized to unit length
/// so cosine scores compare consistently across the corpus.
pub struct OllamaBackend {
    client: Client,
    config: InferenceConfig,
}

impl OllamaBackend {
    /// Create a new Ollama backend with the given configuration.
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "ollama",
            model = %config.embed_model,
            base_url = %config.base_url,
            "Initializing Ollama embedding backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(InferenceConfig::from_env())
    }

    /// Truncate text to the configured maximum input size, on a character
    /// boundary.
    fn truncate(&self, text: &str) -> String {
        text.chars().take(self.config.max_input_chars).collect()
    }

    /// Scale a vector to unit length. Zero vectors are returned unchanged.
    fn normalize(values: Vec<f32>) -> Vec<f32> {
        let magnitude: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            values.into_iter().map(|x| x / magnitude).collect()
        } else {
            values
        }
    }

    /// Check that the Ollama instance is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    info!("Ollama health check passed");
                    Ok(true)
                } else {
                    warn!("Ollama health check failed: {}", resp.status());
                    Ok(false)
                }
            }
            Err(e) => {
                warn!("Ollama health check error: {}", e);
                Ok(false)
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    #[instrument(skip(self, texts), fields(subsystem = "inference", component = "ollama", op = "embed_texts", model = %self.config.embed_model, input_count = texts.len()))]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let start = Instant::now();

        let request = EmbeddingRequest {
            model: self.config.embed_model.clone(),
            input: texts.iter().map(|t| self.truncate(t)).collect(),
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))?;

        if result.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} vectors, got {}",
                texts.len(),
                result.embeddings.len()
            )));
        }

        let mut vectors = Vec::with_capacity(result.embeddings.len());
        for values in result.embeddings {
            if values.len() != self.config.dimension {
                return Err(Error::Embedding(format!(
                    "Expected dimension {}, got {}",
                    self.config.dimension,
                    values.len()
                )));
            }
            vectors.push(Vector::from(Self::normalize(values)));
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            result_count = vectors.len(),
            duration_ms = elapsed,
            "Embedding complete"
        );
        if elapsed > 5000 {
            warn!(
                duration_ms = elapsed,
                input_count = texts.len(),
                slow = true,
                "Slow embedding operation"
            );
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embed_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with_max_chars(max: usize) -> OllamaBackend {
        let config = InferenceConfig {
            max_input_chars: max,
            ..Default::default()
        };
        OllamaBackend::new(config).unwrap()
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        let backend = backend_with_max_chars(100);
        assert_eq!(backend.truncate("short text"), "short text");
    }

    #[test]
    fn test_truncate_is_deterministic_prefix() {
        let backend = backend_with_max_chars(5);
        assert_eq!(backend.truncate("hello world"), "hello");
        assert_eq!(backend.truncate("hello world"), "hello");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let backend = backend_with_max_chars(2);
        // Multi-byte characters must not be split mid-codepoint.
        assert_eq!(backend.truncate("日本語"), "日本");
    }

    #[test]
    fn test_normalize_produces_unit_vector() {
        let normalized = OllamaBackend::normalize(vec![3.0, 4.0]);
        let magnitude: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let normalized = OllamaBackend::normalize(vec![0.0, 0.0, 0.0]);
        assert_eq!(normalized, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dimension_and_model_name() {
        let backend = backend_with_max_chars(100);
        assert_eq!(backend.dimension(), 768);
        assert_eq!(backend.model_name(), "nomic-embed-text");
    }
}
