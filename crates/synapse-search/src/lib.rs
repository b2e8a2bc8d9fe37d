//! # synapse-search
//!
//! Hybrid retrieval engine for synapse: keyword matching over the memory
//! store combined with vector-similarity ranking over embeddings.
//!
//! This crate provides:
//! - Query normalization (content-type synonyms, date phrases, hashtags)
//! - Lexical matching with weighted per-field scoring
//! - Deterministic weighted-sum score fusion
//! - The retrieval orchestrator with per-mode failure semantics: pure
//!   semantic search surfaces provider/index failures, hybrid search
//!   degrades to lexical-only and flags the response
//!
//! ## Example
//!
//! ```ignore
//! use synapse_search::{SearchEngine, SearchRequest};
//! use synapse_core::SearchMode;
//!
//! let engine = SearchEngine::new(memories, index, embedder);
//!
//! // Hybrid search (default mode)
//! let response = SearchRequest::new(owner_id, "rust async")
//!     .with_limit(20)
//!     .execute(&engine)
//!     .await?;
//!
//! // Lexical-only search
//! let response = SearchRequest::new(owner_id, "rust async")
//!     .with_mode(SearchMode::Lexical)
//!     .execute(&engine)
//!     .await?;
//! ```

pub mod engine;
pub mod fusion;
pub mod lexical;
pub mod normalize;

// Re-export core types
pub use synapse_core::*;

// Re-export search types
pub use engine::{SearchConfig, SearchEngine, SearchRequest};
pub use fusion::{fuse, FusionConfig};
pub use lexical::{score_fields, LexicalMatcher, LexicalWeights};
pub use normalize::{normalize, DateRange, NormalizedQuery};
