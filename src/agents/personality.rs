use crate::llm::{LLMClient, TokenStream};
use crate::types::Result;
use std::sync::Arc;
use tracing::debug;

/// Output of [`PersonalityCore::generate`].
pub enum Generation {
    Complete(String),
    Stream(TokenStream),
}

/// Wraps the assistant persona around a backend client.
pub struct PersonalityCore {
    system_prompt: String,
    client: Arc<dyn LLMClient>,
}

impl PersonalityCore {
    pub fn new(system_prompt: impl Into<String>, client: Arc<dyn LLMClient>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            client,
        }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Assemble the prompt: preamble, recalled context (if any), message,
    /// separated by blank lines.
    pub fn build_prompt(&self, message: &str, context: &[String]) -> String {
        let mut blocks = vec![self.system_prompt.clone()];
        if !context.is_empty() {
            blocks.push(context.join("\n"));
        }
        blocks.push(message.to_string());
        blocks.join("\n\n")
    }

    pub async fn generate(&self, prompt: &str, stream: bool) -> Result<Generation> {
        debug!(
            model = self.client.model_name(),
            stream,
            prompt_len = prompt.len(),
            "Generating reply"
        );
        if stream {
            Ok(Generation::Stream(self.client.stream(prompt).await?))
        } else {
            Ok(Generation::Complete(self.client.generate(prompt).await?))
        }
    }
}
