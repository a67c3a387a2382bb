//! Text embedders used by the similarity index.

use crate::types::{AppError, Result};
use crate::utils::config::Settings;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Turns text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn model_name(&self) -> &str;
}

/// Build the embedder the settings ask for.
///
/// `EMBEDDING_URL` selects the HTTP embedder. Otherwise the local
/// `fastembed` model is used when the `local-embeddings` feature is on.
/// Returns `Ok(None)` when neither is available.
pub fn build_embedder(settings: &Settings) -> Result<Option<Arc<dyn Embedder>>> {
    let memory = &settings.memory;

    if let Some(url) = &memory.embedding_url {
        let embedder = RemoteEmbedder::new(
            url.clone(),
            resolve_model_name(&memory.embedding_model).to_string(),
            settings.llm.openai_api_key.clone(),
        )?;
        return Ok(Some(Arc::new(embedder)));
    }

    local_embedder(&memory.embedding_model)
}

#[cfg(feature = "local-embeddings")]
fn local_embedder(model: &str) -> Result<Option<Arc<dyn Embedder>>> {
    Ok(Some(Arc::new(FastEmbedder::new(model)?)))
}

#[cfg(not(feature = "local-embeddings"))]
fn local_embedder(_model: &str) -> Result<Option<Arc<dyn Embedder>>> {
    Ok(None)
}

/// Expand the short aliases accepted in `EMBEDDING_MODEL`.
pub fn resolve_model_name(name: &str) -> &str {
    match name {
        "MiniLM" => "sentence-transformers/all-MiniLM-L6-v2",
        "BGE" => "BAAI/bge-small-en-v1.5",
        other => other,
    }
}

// ============================================================================
// HTTP embedder
// ============================================================================

/// Embedder for any OpenAI-compatible `/embeddings` endpoint.
pub struct RemoteEmbedder {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            api_key,
        })
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self
            .http
            .post(&self.url)
            .json(&json!({ "model": self.model, "input": text }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: EmbeddingResponse = request
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Embedding request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Embedding(format!("Embedding endpoint error: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Invalid embedding response: {}", e)))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::Embedding("Embedding response had no data".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// fastembed
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::Embedder;
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing::info;

    /// On-device embedder backed by `fastembed` ONNX models.
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: String,
    }

    impl FastEmbedder {
        pub fn new(name: &str) -> Result<Self> {
            let model = match name {
                "MiniLM" | "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
                    EmbeddingModel::AllMiniLML6V2
                }
                "BGE" | "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => {
                    EmbeddingModel::BGESmallENV15
                }
                other => {
                    return Err(AppError::Configuration(format!(
                        "Unsupported local embedding model '{}'",
                        other
                    )))
                }
            };

            info!(model = name, "Loading local embedding model");
            let embedding = TextEmbedding::try_new(
                InitOptions::new(model).with_show_download_progress(false),
            )
            .map_err(|e| AppError::Embedding(e.to_string()))?;

            Ok(Self {
                model: Arc::new(Mutex::new(embedding)),
                model_name: super::resolve_model_name(name).to_string(),
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let model = self.model.clone();
            let text = text.to_string();

            tokio::task::spawn_blocking(move || {
                model
                    .lock()
                    .embed(vec![text], None)
                    .map_err(|e| AppError::Embedding(e.to_string()))?
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::Embedding("No embedding produced".to_string()))
            })
            .await
            .map_err(|e| AppError::Internal(format!("Embedding task failed: {}", e)))?
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }
}
