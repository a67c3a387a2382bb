use crate::llm::client::{LLMClient, TokenStream};
use crate::types::{AppError, Result};
use async_stream::stream;
use async_trait::async_trait;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use parking_lot::Mutex;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

const CONTEXT_SIZE: u32 = 4096;
const MAX_NEW_TOKENS: i32 = 512;
const GPU_LAYERS_ALL: u32 = 1000;

// llama.cpp may only be initialised once per process.
static BACKEND: Mutex<Option<Arc<LlamaBackend>>> = parking_lot::const_mutex(None);

fn backend() -> Result<Arc<LlamaBackend>> {
    let mut slot = BACKEND.lock();
    if let Some(backend) = slot.as_ref() {
        return Ok(backend.clone());
    }
    let backend = Arc::new(
        LlamaBackend::init()
            .map_err(|e| AppError::LLM(format!("Failed to initialise llama.cpp: {}", e)))?,
    );
    *slot = Some(backend.clone());
    Ok(backend)
}

pub struct LlamaCppClient {
    backend: Arc<LlamaBackend>,
    model: Arc<LlamaModel>,
    model_name: String,
}

impl LlamaCppClient {
    /// Load a GGUF model on the blocking pool.
    pub async fn load(model_path: PathBuf, use_gpu: bool) -> Result<Self> {
        tokio::task::spawn_blocking(move || {
            let backend = backend()?;
            let params = if use_gpu {
                LlamaModelParams::default().with_n_gpu_layers(GPU_LAYERS_ALL)
            } else {
                LlamaModelParams::default()
            };

            info!(path = %model_path.display(), use_gpu, "Loading local model");
            let model = LlamaModel::load_from_file(&backend, &model_path, &params).map_err(|e| {
                AppError::Configuration(format!(
                    "Failed to load model '{}': {}",
                    model_path.display(),
                    e
                ))
            })?;

            Ok(Self {
                backend,
                model: Arc::new(model),
                model_name: model_path.display().to_string(),
            })
        })
        .await
        .map_err(|e| AppError::Internal(format!("Model loading task failed: {}", e)))?
    }

    /// Run one completion, handing each decoded fragment to `on_token`.
    /// Generation stops early when `on_token` returns `false`.
    fn complete<F>(
        backend: &LlamaBackend,
        model: &LlamaModel,
        prompt: &str,
        mut on_token: F,
    ) -> Result<()>
    where
        F: FnMut(String) -> bool,
    {
        let ctx_params = LlamaContextParams::default().with_n_ctx(NonZeroU32::new(CONTEXT_SIZE));
        let mut ctx = model
            .new_context(backend, ctx_params)
            .map_err(|e| llm_err("Failed to create context", e))?;

        let tokens = model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|e| llm_err("Failed to tokenize prompt", e))?;

        let mut batch = LlamaBatch::new(CONTEXT_SIZE as usize, 1);
        let last_index = tokens.len() as i32 - 1;
        for (i, token) in (0_i32..).zip(tokens.into_iter()) {
            batch
                .add(token, i, &[0], i == last_index)
                .map_err(|e| llm_err("Failed to build batch", e))?;
        }
        ctx.decode(&mut batch)
            .map_err(|e| llm_err("Prompt decode failed", e))?;

        let mut sampler = LlamaSampler::greedy();
        let mut n_cur = batch.n_tokens();
        let n_limit = n_cur + MAX_NEW_TOKENS;

        while n_cur < n_limit {
            let token = sampler.sample(&ctx, batch.n_tokens() - 1);
            sampler.accept(token);

            if model.is_eog_token(token) {
                break;
            }

            let piece = model
                .token_to_str(token, Special::Tokenize)
                .map_err(|e| llm_err("Failed to decode token", e))?;
            if !piece.is_empty() && !on_token(piece) {
                debug!("Local generation abandoned by consumer");
                break;
            }

            batch.clear();
            batch
                .add(token, n_cur, &[0], true)
                .map_err(|e| llm_err("Failed to build batch", e))?;
            n_cur += 1;
            ctx.decode(&mut batch)
                .map_err(|e| llm_err("Decode failed", e))?;
        }

        Ok(())
    }
}

fn llm_err(what: &str, e: impl std::fmt::Display) -> AppError {
    AppError::LLM(format!("{}: {}", what, e))
}

#[async_trait]
impl LLMClient for LlamaCppClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let backend = self.backend.clone();
        let model = self.model.clone();
        let prompt = prompt.to_string();

        tokio::task::spawn_blocking(move || {
            let mut text = String::new();
            Self::complete(&backend, &model, &prompt, |piece| {
                text.push_str(&piece);
                true
            })?;
            Ok(text)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Inference task failed: {}", e)))?
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        let backend = self.backend.clone();
        let model = self.model.clone();
        let prompt = prompt.to_string();
        let (tx, mut rx) = mpsc::channel::<Result<String>>(64);

        tokio::task::spawn_blocking(move || {
            let result = Self::complete(&backend, &model, &prompt, |piece| {
                tx.blocking_send(Ok(piece)).is_ok()
            });
            if let Err(e) = result {
                let _ = tx.blocking_send(Err(e));
            }
        });

        let output_stream = stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        };

        Ok(Box::new(Box::pin(output_stream)))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
