//! Vector Store Abstraction Layer
//!
//! This module provides a unified interface for the similarity backends the
//! memory store can delegate to, through a common trait.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                VectorStore Trait            │
//! ├─────────────────────────────────────────────┤
//! │  ensure_collection  │  upsert  │  search    │
//! └─────────────────────────────────────────────┘
//!          ▲                 ▲            ▲
//!          │                 │            │
//!    ┌─────┴────┐     ┌──────┴───┐  ┌─────┴────┐
//!    │ InMemory │     │ ChromaDB │  │  Qdrant  │
//!    └──────────┘     └──────────┘  └──────────┘
//! ```
//!
//! Result ordering is the backend's own: descending similarity for the
//! in-memory store and Qdrant, ascending distance for ChromaDB.

use crate::types::{AppError, MemoryEntry, Result, SearchResult};
use crate::utils::config::{MemoryConfig, VectorBackend};
use async_trait::async_trait;
use std::sync::Arc;

// ============================================================================
// Vector Store Provider Configuration
// ============================================================================

/// Configuration for vector store providers.
#[derive(Debug, Clone)]
pub enum VectorStoreProvider {
    /// In-process store; data is lost when the process exits.
    InMemory,

    /// ChromaDB - Simple, open-source embedding database.
    ///
    /// Requires a running ChromaDB server.
    #[cfg(feature = "chromadb")]
    ChromaDB {
        /// ChromaDB server URL (e.g., "http://localhost:8001").
        url: String,
    },

    /// Qdrant - High-performance vector search engine.
    ///
    /// Requires a running Qdrant server.
    #[cfg(feature = "qdrant")]
    Qdrant {
        /// Qdrant server URL (e.g., "http://localhost:6334").
        url: String,
        /// Optional API key for authentication.
        api_key: Option<String>,
    },
}

impl VectorStoreProvider {
    /// Pick the provider named by `VECTOR_BACKEND`.
    ///
    /// Returns `Ok(None)` when no similarity backend is configured.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the selected backend's cargo
    /// feature is not enabled.
    pub fn from_config(config: &MemoryConfig) -> Result<Option<Self>> {
        match config.vector_backend {
            VectorBackend::None => Ok(None),
            VectorBackend::Memory => Ok(Some(VectorStoreProvider::InMemory)),

            #[cfg(feature = "chromadb")]
            VectorBackend::Chroma => Ok(Some(VectorStoreProvider::ChromaDB {
                url: config.chroma_url.clone(),
            })),

            #[cfg(feature = "qdrant")]
            VectorBackend::Qdrant => Ok(Some(VectorStoreProvider::Qdrant {
                url: config.qdrant_url.clone(),
                api_key: config.qdrant_api_key.clone(),
            })),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "Vector backend {:?} not enabled. Check feature flags.",
                other
            ))),
        }
    }

    /// Create a vector store instance from this provider configuration.
    pub async fn create_store(&self) -> Result<Arc<dyn VectorStore>> {
        match self {
            VectorStoreProvider::InMemory => Ok(Arc::new(InMemoryVectorStore::new())),

            #[cfg(feature = "chromadb")]
            VectorStoreProvider::ChromaDB { url } => {
                Ok(Arc::new(super::chromadb::ChromaStore::new(url.clone())?))
            }

            #[cfg(feature = "qdrant")]
            VectorStoreProvider::Qdrant { url, api_key } => {
                let store =
                    super::qdrant::QdrantVectorStore::new(url.clone(), api_key.clone()).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Abstract trait for vector database operations.
///
/// # Implementors
///
/// - `InMemoryVectorStore` - In-process, cosine similarity
/// - `ChromaStore` - ChromaDB REST API
/// - `QdrantVectorStore` - Qdrant gRPC client
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider.
    fn provider_name(&self) -> &'static str;

    /// Create the collection if it does not exist yet.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the collection.
    /// * `dimensions` - Dimensionality of vectors (e.g., 384 for MiniLM).
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert entries with their embeddings into a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is missing an embedding or the
    /// backend rejects the write.
    async fn upsert(&self, collection: &str, entries: &[MemoryEntry]) -> Result<usize>;

    /// Nearest-neighbour search.
    ///
    /// # Returns
    ///
    /// At most `limit` results in the backend's ranking order.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;
}

// ============================================================================
// In-Memory Vector Store
// ============================================================================

use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory vector store.
///
/// Data is not persisted and will be lost when the process exits.
/// Uses cosine similarity for vector comparisons.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

struct InMemoryCollection {
    dimensions: usize,
    entries: Vec<MemoryEntry>,
}

impl InMemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    /// Number of entries stored in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.entries.len())
            .unwrap_or(0)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write();
        collections
            .entry(name.to_string())
            .or_insert_with(|| InMemoryCollection {
                dimensions,
                entries: Vec::new(),
            });
        Ok(())
    }

    async fn upsert(&self, collection: &str, entries: &[MemoryEntry]) -> Result<usize> {
        let mut collections = self.collections.write();
        let col = collections
            .get_mut(collection)
            .ok_or_else(|| AppError::Database(format!("Collection '{}' not found", collection)))?;

        for entry in entries {
            match &entry.embedding {
                None => {
                    return Err(AppError::InvalidInput(format!(
                        "Entry '{}' is missing embedding",
                        entry.id
                    )))
                }
                Some(embedding) if embedding.len() != col.dimensions => {
                    return Err(AppError::InvalidInput(format!(
                        "Entry '{}' has {} dimensions, collection expects {}",
                        entry.id,
                        embedding.len(),
                        col.dimensions
                    )))
                }
                Some(_) => {}
            }
        }

        col.entries.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read();
        let col = collections
            .get(collection)
            .ok_or_else(|| AppError::Database(format!("Collection '{}' not found", collection)))?;

        let mut results: Vec<SearchResult> = col
            .entries
            .iter()
            .filter_map(|entry| {
                let entry_embedding = entry.embedding.as_ref()?;
                Some(SearchResult {
                    score: Self::cosine_similarity(embedding, entry_embedding),
                    entry: MemoryEntry {
                        embedding: None, // Don't return embeddings in results
                        ..entry.clone()
                    },
                })
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        // Limit results
        results.truncate(limit);

        Ok(results)
    }
}

// ============================================================================
// Tests
// ============================================================================
