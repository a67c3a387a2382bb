use crate::agents::personality::{Generation, PersonalityCore};
use crate::agents::validator::Validator;
use crate::llm::TokenStream;
use crate::memory::{MemoryStore, DEFAULT_RECALL_LIMIT};
use crate::types::{AppError, MemoryOutcome, Result};
use async_stream::stream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A one-shot reply with the memory outcomes observed along the way.
#[derive(Debug, Clone)]
pub struct RouterReply {
    pub reply: String,
    pub recall: MemoryOutcome,
    pub persisted: MemoryOutcome,
}

/// Per-request pipeline: validate, recall, prompt, generate, persist.
pub struct VexRouter {
    validator: Arc<dyn Validator>,
    memory: Arc<MemoryStore>,
    core: PersonalityCore,
}

impl VexRouter {
    pub fn new(
        validator: Arc<dyn Validator>,
        memory: Arc<MemoryStore>,
        core: PersonalityCore,
    ) -> Self {
        Self {
            validator,
            memory,
            core,
        }
    }

    /// Validate and recall, returning the prompt and the recall outcome.
    async fn prepare(&self, message: &str) -> Result<(String, MemoryOutcome)> {
        if !self.validator.validate(message).await {
            info!(validator = self.validator.name(), "Message rejected");
            return Err(AppError::Validation(
                "Message rejected by validator".to_string(),
            ));
        }

        let recall = self.memory.recall(message, DEFAULT_RECALL_LIMIT).await;
        debug!(context = recall.entries.len(), "Recalled context");
        Ok((self.core.build_prompt(message, &recall.entries), recall.outcome))
    }

    #[instrument(skip_all, fields(model = self.core.model_name(), len = message.len()))]
    pub async fn handle_message(&self, message: &str) -> Result<RouterReply> {
        let (prompt, recall) = self.prepare(message).await?;

        let reply = match self.core.generate(&prompt, false).await? {
            Generation::Complete(text) => text,
            Generation::Stream(chunks) => collect(chunks).await?,
        };

        let persisted = persist(&self.memory, message, &reply).await;
        Ok(RouterReply {
            reply,
            recall,
            persisted,
        })
    }

    /// Relay the reply as it is generated.
    ///
    /// The turn is persisted once the backend stream ends. A backend error
    /// is relayed and ends the stream without persisting; so does dropping
    /// the returned stream early.
    #[instrument(skip_all, fields(model = self.core.model_name(), len = message.len()))]
    pub async fn handle_message_stream(&self, message: &str) -> Result<TokenStream> {
        let (prompt, recall) = self.prepare(message).await?;
        if !recall.is_ok() {
            warn!(outcome = ?recall, "Recall degraded");
        }

        let mut chunks = match self.core.generate(&prompt, true).await? {
            Generation::Stream(chunks) => chunks,
            Generation::Complete(text) => {
                Box::new(futures::stream::iter(vec![Ok(text)])) as TokenStream
            }
        };

        let memory = self.memory.clone();
        let message = message.to_string();

        let output = stream! {
            let mut reply = String::new();
            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        reply.push_str(&chunk);
                        yield Ok(chunk);
                    }
                    Err(e) => {
                        let outcome = MemoryOutcome::Failed(e.to_string());
                        warn!(outcome = ?outcome, "Generation failed mid-stream, turn not stored");
                        yield Err(e);
                        return;
                    }
                }
            }

            let persisted = persist(&memory, &message, &reply).await;
            if !persisted.is_ok() {
                warn!(outcome = ?persisted, "Persist degraded");
            }
        };

        Ok(Box::new(Box::pin(output)))
    }
}

async fn collect(mut chunks: TokenStream) -> Result<String> {
    let mut text = String::new();
    while let Some(chunk) = chunks.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}

/// Store the user message, then the reply.
async fn persist(memory: &MemoryStore, message: &str, reply: &str) -> MemoryOutcome {
    let stored_message = memory.remember(message).await;
    let stored_reply = memory.remember(reply).await;
    stored_message.merge(stored_reply)
}
