//! ChromaDB vector database integration.
//!
//! Talks to a ChromaDB server over its v2 REST API with `reqwest`, in the
//! default tenant and database.
//!
//! # Feature Flag
//!
//! Enable with `--features chromadb` (on by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use vex::db::chromadb::ChromaStore;
//!
//! let store = ChromaStore::new("http://localhost:8001".to_string())?;
//! store.ensure_collection("vex_memory", 384).await?;
//! store.upsert("vex_memory", &entries).await?;
//! let results = store.search("vex_memory", &query_embedding, 5).await?;
//! ```

use crate::types::{AppError, MemoryEntry, Result, SearchResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::vectorstore::VectorStore;

const TENANT: &str = "default_tenant";
const DATABASE: &str = "default_database";

/// ChromaDB vector store.
///
/// Results come back in Chroma's own order (ascending distance) and
/// [`SearchResult::score`] carries the distance.
pub struct ChromaStore {
    http: reqwest::Client,
    base_url: String,
    /// collection name -> Chroma collection id
    collection_ids: Mutex<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl ChromaStore {
    pub fn new(base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Database(format!("Failed to create Chroma client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection_ids: Mutex::new(HashMap::new()),
        })
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, TENANT, DATABASE
        )
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> Result<T> {
        self.http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Chroma request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Database(format!("Chroma error: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Database(format!("Invalid Chroma response: {}", e)))
    }

    async fn post_unit(&self, url: String, body: serde_json::Value) -> Result<()> {
        self.http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Chroma request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Database(format!("Chroma error: {}", e)))?;
        Ok(())
    }

    /// Get-or-create the collection and return its id.
    async fn collection_id(&self, name: &str) -> Result<String> {
        if let Some(id) = self.collection_ids.lock().get(name) {
            return Ok(id.clone());
        }

        let response: CollectionResponse = self
            .post(
                self.collections_url(),
                json!({ "name": name, "get_or_create": true }),
            )
            .await?;

        debug!(collection = name, id = %response.id, "Resolved Chroma collection");
        self.collection_ids
            .lock()
            .insert(name.to_string(), response.id.clone());
        Ok(response.id)
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    fn provider_name(&self) -> &'static str {
        "chromadb"
    }

    async fn ensure_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        // Chroma fixes the dimension on the first add.
        self.collection_id(name).await.map(|_| ())
    }

    async fn upsert(&self, collection: &str, entries: &[MemoryEntry]) -> Result<usize> {
        let mut ids = Vec::with_capacity(entries.len());
        let mut embeddings = Vec::with_capacity(entries.len());
        let mut documents = Vec::with_capacity(entries.len());
        let mut metadatas = Vec::with_capacity(entries.len());

        for entry in entries {
            let embedding = entry
                .embedding
                .as_ref()
                .ok_or_else(|| AppError::Database("Entry missing embedding".to_string()))?;

            let mut metadata: serde_json::Map<String, serde_json::Value> = entry
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            metadata.insert("created_at".to_string(), json!(entry.created_at.timestamp()));

            ids.push(entry.id.clone());
            embeddings.push(embedding.clone());
            documents.push(entry.content.clone());
            metadatas.push(serde_json::Value::Object(metadata));
        }

        let id = self.collection_id(collection).await?;
        self.post_unit(
            format!("{}/{}/add", self.collections_url(), id),
            json!({
                "ids": ids,
                "embeddings": embeddings,
                "documents": documents,
                "metadatas": metadatas,
            }),
        )
        .await?;

        Ok(entries.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let id = self.collection_id(collection).await?;
        let response: QueryResponse = self
            .post(
                format!("{}/{}/query", self.collections_url(), id),
                json!({
                    "query_embeddings": [embedding],
                    "n_results": limit,
                    "include": ["documents", "distances"],
                }),
            )
            .await?;

        let ids = response.ids.into_iter().next().unwrap_or_default();
        let documents = response
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let distances = response
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        let results = ids
            .into_iter()
            .zip(documents)
            .enumerate()
            .filter_map(|(i, (id, document))| {
                Some(SearchResult {
                    entry: MemoryEntry {
                        id,
                        content: document?,
                        embedding: None,
                        metadata: HashMap::new(),
                        created_at: Utc::now(),
                    },
                    score: distances.get(i).copied().flatten().unwrap_or(f32::MAX),
                })
            })
            .take(limit)
            .collect();

        Ok(results)
    }
}
