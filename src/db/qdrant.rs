use crate::types::{AppError, MemoryEntry, Result, SearchResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, CreateCollectionBuilder, Distance, PointStruct,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    },
    Qdrant,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::vectorstore::VectorStore;

/// Qdrant vector store implementation.
///
/// Provides vector storage and similarity search using a Qdrant server.
/// Requires a running Qdrant instance. Collections are created on first
/// write, with cosine distance and the dimension of the first embedding.
pub struct QdrantVectorStore {
    client: Qdrant,
    known_collections: Mutex<HashSet<String>>,
}

impl QdrantVectorStore {
    pub async fn new(url: String, api_key: Option<String>) -> Result<Self> {
        let client = if let Some(key) = api_key {
            Qdrant::from_url(&url)
                .api_key(key)
                .build()
                .map_err(|e| AppError::Database(format!("Failed to create Qdrant client: {}", e)))?
        } else {
            Qdrant::from_url(&url)
                .build()
                .map_err(|e| AppError::Database(format!("Failed to create Qdrant client: {}", e)))?
        };

        Ok(Self {
            client,
            known_collections: Mutex::new(HashSet::new()),
        })
    }

    /// Parse search results from Qdrant response.
    fn parse_search_results(
        search_result: qdrant_client::qdrant::SearchResponse,
    ) -> Vec<SearchResult> {
        search_result
            .result
            .into_iter()
            .filter_map(|scored_point| {
                let payload = scored_point.payload;
                let content = payload.get("content")?.as_str()?.to_string();
                let created_at_ts = payload.get("created_at")?.as_integer()?;

                let id = match scored_point.id?.point_id_options? {
                    PointIdOptions::Num(num) => num.to_string(),
                    PointIdOptions::Uuid(uuid) => uuid,
                };
                Some(SearchResult {
                    entry: MemoryEntry {
                        id,
                        content,
                        embedding: None,
                        metadata: HashMap::new(),
                        created_at: chrono::DateTime::from_timestamp(created_at_ts, 0)?,
                    },
                    score: scored_point.score,
                })
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn provider_name(&self) -> &'static str {
        "qdrant"
    }

    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.known_collections.lock().contains(name) {
            return Ok(());
        }

        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| AppError::Database(format!("Failed to check collection: {}", e)))?;

        if !exists {
            debug!(collection = name, dimensions, "Creating Qdrant collection");
            self.client
                .create_collection(CreateCollectionBuilder::new(name).vectors_config(
                    VectorParamsBuilder::new(dimensions as u64, Distance::Cosine),
                ))
                .await
                .map_err(|e| AppError::Database(format!("Failed to create collection: {}", e)))?;
        }

        self.known_collections.lock().insert(name.to_string());
        Ok(())
    }

    async fn upsert(&self, collection: &str, entries: &[MemoryEntry]) -> Result<usize> {
        let mut points = Vec::with_capacity(entries.len());

        for entry in entries {
            let embedding = entry
                .embedding
                .as_ref()
                .ok_or_else(|| AppError::Database("Entry missing embedding".to_string()))?;

            let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
            payload.insert("content".to_string(), entry.content.clone().into());
            payload.insert(
                "created_at".to_string(),
                entry.created_at.timestamp().into(),
            );
            for (key, value) in &entry.metadata {
                payload.insert(key.clone(), value.clone().into());
            }

            points.push(PointStruct::new(entry.id.clone(), embedding.clone(), payload));
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| AppError::Database(format!("Failed to upsert points: {}", e)))?;

        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let search_builder =
            SearchPointsBuilder::new(collection, embedding.to_vec(), limit as u64).with_payload(true);

        let search_result = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| AppError::Database(format!("Failed to search: {}", e)))?;

        Ok(Self::parse_search_results(search_result))
    }
}
