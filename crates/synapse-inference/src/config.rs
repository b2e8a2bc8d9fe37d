//! Embedding backend configuration.

use synapse_core::defaults;

/// Configuration for the Ollama embedding backend.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base URL of the Ollama instance.
    pub base_url: String,
    /// Embedding model name.
    pub embed_model: String,
    /// Expected embedding dimension.
    pub dimension: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum input size in characters; longer text is truncated to the
    /// first N characters before embedding.
    pub max_input_chars: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OLLAMA_URL.to_string(),
            embed_model: defaults::EMBED_MODEL.to_string(),
            dimension: defaults::EMBED_DIMENSION,
            timeout_secs: defaults::EMBED_TIMEOUT_SECS,
            max_input_chars: defaults::EMBED_MAX_CHARS,
        }
    }
}

impl InferenceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `OLLAMA_BASE` | `http://127.0.0.1:11434` | Ollama base URL |
    /// | `OLLAMA_EMBED_MODEL` | `nomic-embed-text` | Embedding model |
    /// | `OLLAMA_EMBED_DIM` | `768` | Embedding dimension |
    /// | `SYNAPSE_EMBED_TIMEOUT_SECS` | `8` | Request timeout |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OLLAMA_BASE").unwrap_or(defaults.base_url),
            embed_model: std::env::var("OLLAMA_EMBED_MODEL").unwrap_or(defaults.embed_model),
            dimension: std::env::var("OLLAMA_EMBED_DIM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.dimension),
            timeout_secs: std::env::var("SYNAPSE_EMBED_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            max_input_chars: defaults.max_input_chars,
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:11434");
        assert_eq!(config.embed_model, "nomic-embed-text");
        assert_eq!(config.dimension, 768);
        assert_eq!(config.max_input_chars, 10_000);
    }

    #[test]
    fn test_builder_overrides() {
        let config = InferenceConfig::default()
            .with_base_url("http://custom:1234")
            .with_embed_model("mxbai-embed-large")
            .with_dimension(1024);
        assert_eq!(config.base_url, "http://custom:1234");
        assert_eq!(config.embed_model, "mxbai-embed-large");
        assert_eq!(config.dimension, 1024);
    }
}
