//! Core data models for synapse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// Re-export the vector type so downstream crates share one definition.
pub use pgvector::Vector;

// =============================================================================
// MEMORY
// =============================================================================

/// Kind of captured content. Closed set; the query normalizer maps
/// free-text synonyms ("posts", "clips", "tasks") onto these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Video,
    Product,
    Note,
    Todo,
}

impl ContentType {
    /// All known content types, in display order.
    pub const ALL: [ContentType; 5] = [
        ContentType::Article,
        ContentType::Video,
        ContentType::Product,
        ContentType::Note,
        ContentType::Todo,
    ];
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Article => write!(f, "article"),
            Self::Video => write!(f, "video"),
            Self::Product => write!(f, "product"),
            Self::Note => write!(f, "note"),
            Self::Todo => write!(f, "todo"),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "article" => Ok(Self::Article),
            "video" => Ok(Self::Video),
            "product" => Ok(Self::Product),
            "note" => Ok(Self::Note),
            "todo" => Ok(Self::Todo),
            _ => Err(format!("Invalid content type: {}", s)),
        }
    }
}

/// One captured piece of content, owned by exactly one user.
///
/// Memories are immutable after creation except for deletion; the derived
/// embedding record follows the memory's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Memory {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Non-empty display title.
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Source URL for extension captures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Text the user had selected when capturing from the extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Request for capturing a new memory. The owner comes from the request
/// context, not the payload.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CreateMemoryRequest {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub selected_text: Option<String>,
    pub content_type: ContentType,
    #[serde(default)]
    pub tags: Vec<String>,
}

// =============================================================================
// SEARCH
// =============================================================================

/// Retrieval mode for a search call.
///
/// - `Lexical`: substring/keyword matching only.
/// - `Semantic`: vector similarity only; provider or index failures are
///   surfaced, never silently swallowed.
/// - `Hybrid`: both legs fused; degrades to lexical-only when the vector
///   leg is unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Lexical,
    Semantic,
    #[default]
    Hybrid,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Semantic => write!(f, "semantic"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexical" | "keyword" => Ok(Self::Lexical),
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(format!("Invalid search mode: {}", s)),
        }
    }
}

/// One scored reference to a memory, before hydration. Produced by the
/// individual matchers and consumed by score fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub memory_id: Uuid,
    /// Relevance score in [0, 1].
    pub score: f32,
    /// Human-readable match reason, e.g. "Matched in title, content".
    pub reason: String,
}

/// A hydrated search result returned to callers.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SearchResult {
    pub memory: Memory,
    /// Relevance score in [0, 1].
    pub score: f32,
    /// Human-readable match reason for observability.
    pub reason: String,
}

/// Response for a search call.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub count: usize,
    /// True when hybrid mode fell back to lexical-only because the vector
    /// leg was unavailable. Lexical results with reduced quality, not an
    /// error.
    pub degraded: bool,
}

/// A hit returned by the vector index: memory id plus cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorHit {
    pub memory_id: Uuid,
    pub score: f32,
}

// =============================================================================
// JOBS
// =============================================================================

/// Background job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Generate and store the embedding for a memory.
    Embedding,
    /// Remove a stale vector-index entry after its memory was deleted.
    PurgeEmbedding,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedding => write!(f, "embedding"),
            Self::PurgeEmbedding => write!(f, "purge_embedding"),
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "embedding" => Ok(Self::Embedding),
            "purge_embedding" => Ok(Self::PurgeEmbedding),
            _ => Err(format!("Invalid job type: {}", s)),
        }
    }
}

/// Lifecycle status of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// A queued unit of background work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub memory_id: Option<Uuid>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub payload: Option<JsonValue>,
    pub error_message: Option<String>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_content_type_display_roundtrip() {
        for ct in ContentType::ALL {
            let parsed = ContentType::from_str(&ct.to_string()).unwrap();
            assert_eq!(parsed, ct);
        }
    }

    #[test]
    fn test_content_type_from_str_case_insensitive() {
        assert_eq!(ContentType::from_str("Article").unwrap(), ContentType::Article);
        assert_eq!(ContentType::from_str("TODO").unwrap(), ContentType::Todo);
    }

    #[test]
    fn test_content_type_from_str_invalid() {
        let result = ContentType::from_str("podcast");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid content type"));
    }

    #[test]
    fn test_content_type_serialization() {
        let json = serde_json::to_string(&ContentType::Article).unwrap();
        assert_eq!(json, "\"article\"");
        let back: ContentType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContentType::Article);
    }

    #[test]
    fn test_search_mode_default_is_hybrid() {
        assert_eq!(SearchMode::default(), SearchMode::Hybrid);
    }

    #[test]
    fn test_search_mode_from_str() {
        assert_eq!(SearchMode::from_str("lexical").unwrap(), SearchMode::Lexical);
        assert_eq!(SearchMode::from_str("keyword").unwrap(), SearchMode::Lexical);
        assert_eq!(SearchMode::from_str("SEMANTIC").unwrap(), SearchMode::Semantic);
        assert_eq!(SearchMode::from_str("hybrid").unwrap(), SearchMode::Hybrid);
        assert!(SearchMode::from_str("fuzzy").is_err());
    }

    #[test]
    fn test_job_type_roundtrip() {
        for jt in [JobType::Embedding, JobType::PurgeEmbedding] {
            assert_eq!(JobType::from_str(&jt.to_string()).unwrap(), jt);
        }
    }

    #[test]
    fn test_job_status_roundtrip() {
        for st in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_str(&st.to_string()).unwrap(), st);
        }
    }

    #[test]
    fn test_memory_serialization_skips_empty_optionals() {
        let memory = Memory {
            id: Uuid::nil(),
            owner_id: Uuid::nil(),
            title: "T".to_string(),
            content: None,
            url: None,
            selected_text: None,
            content_type: ContentType::Note,
            tags: Vec::new(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&memory).unwrap();
        assert!(!json.contains("\"content\""));
        assert!(!json.contains("\"url\""));
        assert!(!json.contains("\"tags\""));
    }

    #[test]
    fn test_create_memory_request_deserialization_defaults() {
        let req: CreateMemoryRequest = serde_json::from_str(
            r#"{"title": "Rust async runtimes", "content_type": "article"}"#,
        )
        .unwrap();
        assert_eq!(req.title, "Rust async runtimes");
        assert_eq!(req.content_type, ContentType::Article);
        assert!(req.content.is_none());
        assert!(req.tags.is_empty());
    }
}
