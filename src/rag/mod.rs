//! Retrieval support for memory recall.
//!
//! - [`rag::embeddings`](crate::rag::embeddings) - Text embedders (HTTP or fastembed)
//!
//! The vector stores themselves live in [`crate::db`]; the memory store in
//! [`crate::memory`] ties an embedder and a store together.

pub mod embeddings;

pub use embeddings::{build_embedder, Embedder, RemoteEmbedder};
