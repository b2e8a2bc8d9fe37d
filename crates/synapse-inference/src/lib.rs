//! # synapse-inference
//!
//! Embedding provider backends for synapse.
//!
//! The search pipeline treats embedding generation as an external
//! capability with latency and failure modes: text in, fixed-length
//! unit-normalized vector out. This crate provides:
//! - [`OllamaBackend`]: the default provider, a local Ollama instance
//! - [`MockEmbeddingBackend`]: deterministic vectors for tests

pub mod config;
pub mod mock;
pub mod ollama;

pub use config::InferenceConfig;
pub use mock::{MockEmbeddingBackend, MockEmbeddingGenerator};
pub use ollama::OllamaBackend;
