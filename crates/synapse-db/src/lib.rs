//! # synapse-db
//!
//! PostgreSQL database layer for synapse.
//!
//! This crate provides:
//! - Connection pool management
//! - The memory repository (owner-scoped CRUD + filtered listing)
//! - The vector index over pgvector (owner-scoped similarity queries)
//! - The durable background job queue
//!
//! ## Example
//!
//! ```rust,ignore
//! use synapse_db::Database;
//! use synapse_core::{ContentType, CreateMemoryRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/synapse").await?;
//!
//!     let memory = db.memories.insert(owner_id, CreateMemoryRequest {
//!         title: "Rust async runtimes".to_string(),
//!         content: None,
//!         url: None,
//!         selected_text: None,
//!         content_type: ContentType::Article,
//!         tags: vec!["rust".to_string()],
//!     }).await?;
//!
//!     println!("Captured memory: {}", memory.id);
//!     Ok(())
//! }
//! ```

pub mod index;
pub mod jobs;
pub mod memories;
pub mod pool;
pub mod test_fixtures;

// Re-export core types
pub use synapse_core::*;

// Re-export repository implementations
pub use index::PgVectorIndex;
pub use jobs::PgJobRepository;
pub use memories::PgMemoryRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Memory repository for CRUD operations.
    pub memories: PgMemoryRepository,
    /// Vector index for similarity search.
    pub index: PgVectorIndex,
    /// Job repository for background processing.
    pub jobs: PgJobRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            memories: PgMemoryRepository::new(pool.clone()),
            index: PgVectorIndex::new(pool.clone()),
            jobs: PgJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
