//! Vector stores backing similarity recall.
//!
//! # Vector Store Providers
//!
//! The following vector store backends are supported:
//! - `memory` - In-process cosine similarity (always available)
//! - `chromadb` (default) - ChromaDB over its REST API
//! - `qdrant` - High-performance vector search engine
//!
//! Enable providers via Cargo features:
//! ```toml
//! vex-server = { version = "*", features = ["qdrant"] }
//! ```

#![allow(missing_docs)]

// Vector store abstraction layer
pub mod vectorstore;

// Provider implementations
#[cfg(feature = "chromadb")]
pub mod chromadb;
#[cfg(feature = "qdrant")]
pub mod qdrant;

// Re-exports
pub use vectorstore::{InMemoryVectorStore, VectorStore, VectorStoreProvider};

#[cfg(feature = "chromadb")]
pub use chromadb::ChromaStore;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
