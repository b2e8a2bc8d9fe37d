//! # synapse-core
//!
//! Core types, traits, and abstractions for the synapse knowledge-capture
//! backend.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other synapse crates depend on: the memory data model, the retrieval
//! and storage trait seams, the shared error type, and centralized defaults.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
