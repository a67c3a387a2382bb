//! # VEX - Conversational Assistant Server
//!
//! A chat server that remembers what it has been told, recalls the most
//! relevant memories for each new message, and answers through either an
//! on-device llama.cpp model or a remote HTTP completion endpoint.
//!
//! ## Overview
//!
//! VEX can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `vex-server` binary
//! 2. **As a library** - Build a [`VexRouter`] and drive it yourself
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use vex::{MemoryStore, PassthroughValidator, PersonalityCore, Provider, VexRouter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::Remote {
//!         url: Some("http://localhost:8080/generate".to_string()),
//!         api_key: None,
//!     };
//!     let core = PersonalityCore::new("You are VEX.", provider.create_client().await?);
//!     let router = VexRouter::new(
//!         Arc::new(PassthroughValidator),
//!         Arc::new(MemoryStore::new()),
//!         core,
//!     );
//!
//!     let reply = router.handle_message("Hello!").await?;
//!     println!("{}", reply.reply);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `chromadb` | ChromaDB similarity backend over REST (default) |
//! | `qdrant` | Qdrant similarity backend |
//! | `llamacpp` | Direct GGUF model loading |
//! | `local-embeddings` | fastembed ONNX embedders |
//! | `swagger-ui` | Interactive API docs at `/swagger-ui` |
//!
//! ## Modules
//!
//! - [`agents`] - Validator, personality core and router
//! - [`api`] - HTTP/WebSocket handlers and routes
//! - [`auth`] - `X-Token` guard for configuration endpoints
//! - [`cli`] - Server command-line arguments
//! - [`db`] - Vector stores
//! - [`llm`] - Inference backends
//! - [`memory`] - Conversation memory
//! - [`rag`] - Embedders
//! - [`types`] - Common types and error handling
//! - [`utils`] - Settings and runtime configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Validator, personality core and router.
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// Token guard for configuration endpoints.
pub mod auth;
/// Command-line arguments for the server binary.
pub mod cli;
/// Vector stores (in-memory, ChromaDB, Qdrant).
pub mod db;
/// LLM backend clients and abstractions.
pub mod llm;
/// Conversation memory.
pub mod memory;
/// Embedders for similarity recall.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Settings and runtime configuration.
pub mod utils;

// Re-export commonly used types
pub use agents::{PassthroughValidator, PersonalityCore, Validator, VexRouter};
pub use api::create_router;
pub use llm::{LLMClient, LLMClientFactory, LLMClientFactoryTrait, Provider};
pub use memory::{MemoryStore, SimilarityIndex};
pub use types::{AppError, Mode, Result};
pub use utils::config::Settings;
pub use utils::runtime_config::ConfigStore;

use crate::db::VectorStoreProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Settings read at startup
    pub settings: Arc<Settings>,
    /// Credentials and mode editable through `/api/config`
    pub config: Arc<ConfigStore>,
    /// Process-wide conversation memory
    pub memory: Arc<MemoryStore>,
    /// Message gate
    pub validator: Arc<dyn Validator>,
    /// Builds the backend client for each request
    pub llm_factory: Arc<dyn LLMClientFactoryTrait>,
}

impl AppState {
    /// Build the production state: settings-based factory, passthrough
    /// validator, and a memory store with a similarity index when one is
    /// configured and an embedder is available.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let memory = build_memory(&settings).await?;
        let llm_factory = LLMClientFactory::new(settings.llm.clone())?;

        Ok(Self {
            config: Arc::new(ConfigStore::from_settings(&settings)),
            settings: Arc::new(settings),
            memory: Arc::new(memory),
            validator: Arc::new(PassthroughValidator),
            llm_factory: Arc::new(llm_factory),
        })
    }

    /// The mode a request runs in: its explicit flag, else the runtime config.
    pub fn resolve_mode(&self, remote: Option<bool>) -> Mode {
        remote
            .map(Mode::from_remote_flag)
            .unwrap_or_else(|| self.config.mode())
    }

    /// Assemble a router for one request.
    pub async fn router(&self, remote: Option<bool>) -> Result<VexRouter> {
        let mode = self.resolve_mode(remote);
        let runtime = self.config.snapshot();
        let client = self.llm_factory.create_client(mode, &runtime).await?;

        Ok(VexRouter::new(
            self.validator.clone(),
            self.memory.clone(),
            PersonalityCore::new(self.settings.llm.system_prompt.clone(), client),
        ))
    }
}

async fn build_memory(settings: &Settings) -> Result<MemoryStore> {
    let Some(provider) = VectorStoreProvider::from_config(&settings.memory)? else {
        info!("No vector backend configured, using substring recall");
        return Ok(MemoryStore::new());
    };

    let Some(embedder) = rag::build_embedder(settings)? else {
        warn!(
            backend = ?settings.memory.vector_backend,
            "Vector backend configured but no embedder available (set EMBEDDING_URL or enable local-embeddings), using substring recall"
        );
        return Ok(MemoryStore::new());
    };

    let store = provider.create_store().await?;
    info!(
        provider = store.provider_name(),
        embedder = embedder.model_name(),
        collection = %settings.memory.collection,
        "Similarity recall enabled"
    );

    Ok(MemoryStore::with_index(SimilarityIndex::new(
        store,
        embedder,
        settings.memory.collection.clone(),
    )))
}
