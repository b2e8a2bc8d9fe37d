//! Centralized default constants for the synapse system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

/// Maximum input size in characters for a single embedding request.
/// Longer text is truncated deterministically (first N characters).
pub const EMBED_MAX_CHARS: usize = 10_000;

/// Timeout for embedding requests in seconds. Kept in the single-digit
/// range: an interactive hybrid search treats a slow provider as failed
/// and degrades rather than stalling the whole request.
pub const EMBED_TIMEOUT_SECS: u64 = 8;

// =============================================================================
// SEARCH
// =============================================================================

/// Default weight of the vector-similarity leg in hybrid score fusion.
/// Tuning value inherited from earlier iterations of the product, not a
/// load-bearing constant; override via `FusionConfig`.
pub const VECTOR_WEIGHT: f32 = 0.7;

/// Default weight of the lexical leg in hybrid score fusion.
pub const LEXICAL_WEIGHT: f32 = 0.3;

/// Lexical field weight: query substring found in the title.
pub const TITLE_WEIGHT: f32 = 0.4;

/// Lexical field weight: query substring found in content or selected text.
pub const CONTENT_WEIGHT: f32 = 0.3;

/// Lexical field weight: query substring found in a tag.
pub const TAG_WEIGHT: f32 = 0.2;

/// Default result limit for search endpoints.
pub const SEARCH_LIMIT: i64 = 20;

/// Per-leg over-fetch factor: each matcher retrieves `limit * factor`
/// candidates so fusion has enough overlap to rank meaningfully.
pub const SEARCH_CANDIDATE_FACTOR: i64 = 2;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list endpoints.
pub const PAGE_LIMIT: i64 = 50;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default maximum attempt count for failed jobs.
pub const JOB_MAX_ATTEMPTS: i32 = 3;

/// Default maximum number of concurrently processed jobs.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Default polling interval for the job worker when the queue is empty.
pub const JOB_POLL_INTERVAL_MS: u64 = 500;
