//! Conversation memory.
//!
//! Every user message and every generated reply is stored here and later
//! recalled as prompt context. Two recall policies exist:
//!
//! - **Fallback**: case-insensitive substring match over an in-process list,
//!   in insertion order.
//! - **Similarity**: embed the query and search a vector store. Used when a
//!   [`SimilarityIndex`] is configured; any failure drops back to the
//!   fallback policy and is reported as [`MemoryOutcome::Degraded`].
//!
//! Memory failures are never surfaced as errors.

use crate::db::VectorStore;
use crate::rag::Embedder;
use crate::types::{MemoryEntry, MemoryOutcome, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of entries the router recalls per message.
pub const DEFAULT_RECALL_LIMIT: usize = 5;

/// Vector store + embedder pair used for similarity recall.
pub struct SimilarityIndex {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub collection: String,
}

impl SimilarityIndex {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
        }
    }

    async fn add(&self, entry: MemoryEntry) -> Result<()> {
        let embedding = self.embedder.embed(&entry.content).await?;
        self.store
            .ensure_collection(&self.collection, embedding.len())
            .await?;
        self.store
            .upsert(&self.collection, &[entry.with_embedding(embedding)])
            .await?;
        Ok(())
    }

    async fn query(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let embedding = self.embedder.embed(query).await?;
        self.store
            .ensure_collection(&self.collection, embedding.len())
            .await?;
        let results = self.store.search(&self.collection, &embedding, limit).await?;
        Ok(results
            .into_iter()
            .take(limit)
            .map(|r| r.entry.content)
            .collect())
    }
}

/// Result of a recall: the texts plus how the lookup went.
#[derive(Debug, Clone)]
pub struct Recall {
    pub entries: Vec<String>,
    pub outcome: MemoryOutcome,
}

/// Process-wide memory store shared by all requests.
pub struct MemoryStore {
    entries: RwLock<Vec<MemoryEntry>>,
    index: Option<SimilarityIndex>,
}

impl MemoryStore {
    /// A store using only the fallback policy.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            index: None,
        }
    }

    pub fn with_index(index: SimilarityIndex) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            index: Some(index),
        }
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Number of entries in the fallback list.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All remembered texts in insertion order.
    pub fn texts(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|e| e.content.clone())
            .collect()
    }

    /// Store a piece of text.
    ///
    /// The text always lands in the fallback list; indexing failures only
    /// degrade the outcome.
    pub async fn remember(&self, text: &str) -> MemoryOutcome {
        let entry = MemoryEntry::new(text);
        self.entries.write().push(entry.clone());

        let Some(index) = &self.index else {
            return MemoryOutcome::Ok;
        };

        match index.add(entry).await {
            Ok(()) => MemoryOutcome::Ok,
            Err(e) => {
                warn!(
                    provider = index.store.provider_name(),
                    error = %e,
                    "Failed to index memory entry"
                );
                MemoryOutcome::Degraded(e.to_string())
            }
        }
    }

    /// Return at most `limit` texts relevant to `query`.
    pub async fn recall(&self, query: &str, limit: usize) -> Recall {
        if limit == 0 {
            return Recall {
                entries: Vec::new(),
                outcome: MemoryOutcome::Ok,
            };
        }

        let Some(index) = &self.index else {
            return Recall {
                entries: self.substring_matches(query, limit),
                outcome: MemoryOutcome::Ok,
            };
        };

        match index.query(query, limit).await {
            Ok(entries) => {
                debug!(count = entries.len(), "Similarity recall");
                Recall {
                    entries,
                    outcome: MemoryOutcome::Ok,
                }
            }
            Err(e) => {
                warn!(
                    provider = index.store.provider_name(),
                    error = %e,
                    "Similarity recall failed, using substring match"
                );
                Recall {
                    entries: self.substring_matches(query, limit),
                    outcome: MemoryOutcome::Degraded(e.to_string()),
                }
            }
        }
    }

    fn substring_matches(&self, query: &str, limit: usize) -> Vec<String> {
        let needle = query.to_lowercase();
        self.entries
            .read()
            .iter()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .take(limit)
            .map(|e| e.content.clone())
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
