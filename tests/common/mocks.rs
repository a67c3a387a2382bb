//! Mock implementations for testing.
//!
//! Mock LLM clients and factories shared by the integration tests, so no
//! test needs a model file or a running completion endpoint.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use vex::llm::{LLMClient, LLMClientFactoryTrait, TokenStream};
use vex::types::{AppError, Mode, Result, RuntimeConfig};

/// Mock LLM client with a fixed response.
///
/// Streaming splits the response into chunks of five characters. A
/// failing client errors on both `generate` and `stream`; a broken stream
/// opens fine and then yields `fail_after` chunks before an error.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    fail_after: Option<usize>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            fail_after: None,
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
            fail_after: None,
        }
    }

    /// Create a mock whose stream errors after `chunks` chunks.
    pub fn broken_stream(response: &str, chunks: usize) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            fail_after: Some(chunks),
        }
    }

    fn chunks(&self) -> Vec<String> {
        self.response
            .chars()
            .collect::<Vec<_>>()
            .chunks(5)
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    async fn stream(&self, _prompt: &str) -> Result<TokenStream> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }

        let mut items: Vec<Result<String>> = self.chunks().into_iter().map(Ok).collect();
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(AppError::LLM("Mock stream broke".to_string())));
        }
        Ok(Box::new(stream::iter(items).boxed()))
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Mock LLM factory that hands out the same mock client for every mode and
/// records which modes were requested.
pub struct MockLLMFactory {
    client: Arc<MockLLMClient>,
    requested: Mutex<Vec<Mode>>,
}

impl MockLLMFactory {
    /// Create a new mock factory that returns the given mock client.
    pub fn new(client: MockLLMClient) -> Self {
        Self {
            client: Arc::new(client),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Modes requested so far, oldest first.
    pub fn requested_modes(&self) -> Vec<Mode> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl LLMClientFactoryTrait for MockLLMFactory {
    async fn create_client(
        &self,
        mode: Mode,
        _runtime: &RuntimeConfig,
    ) -> Result<Arc<dyn LLMClient>> {
        self.requested.lock().push(mode);
        Ok(self.client.clone())
    }
}
