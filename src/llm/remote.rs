//! Remote completion backend.
//!
//! The endpoint contract is intentionally small so it can front many
//! providers: the request body is `{"prompt": "..."}`, a complete response
//! is a JSON object with a `text` field, and a streamed response is plain
//! text delivered in arbitrary chunks.

use crate::llm::client::{LLMClient, TokenStream};
use crate::types::{AppError, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

/// Request timeout applied to every remote call.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct RemoteClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl RemoteClient {
    pub fn new(url: String, api_key: Option<String>) -> Result<Self> {
        Ok(Self::with_http(Self::http_client()?, url, api_key))
    }

    pub fn with_http(http: reqwest::Client, url: String, api_key: Option<String>) -> Self {
        Self { http, url, api_key }
    }

    pub fn http_client() -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
    }

    async fn send(&self, prompt: &str) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "prompt": prompt }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        request
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("Remote request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::LLM(format!("Remote endpoint error: {}", e)))
    }
}

#[async_trait]
impl LLMClient for RemoteClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body: serde_json::Value = self
            .send(prompt)
            .await?
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Invalid remote response: {}", e)))?;

        body.get("text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| AppError::LLM("Remote response has no 'text' field".to_string()))
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        let mut body = self.send(prompt).await?.bytes_stream();

        let output_stream = stream! {
            let mut pending: Vec<u8> = Vec::new();
            while let Some(chunk_result) = body.next().await {
                match chunk_result {
                    Ok(bytes) => {
                        pending.extend_from_slice(&bytes);
                        let text = take_utf8(&mut pending);
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::LLM(format!("Remote stream error: {}", e)));
                        break;
                    }
                }
            }
            if !pending.is_empty() {
                yield Ok(String::from_utf8_lossy(&pending).into_owned());
            }
        };

        Ok(Box::new(Box::pin(output_stream)))
    }

    fn model_name(&self) -> &str {
        &self.url
    }
}

/// Drain the decodable prefix of `pending`, keeping a trailing partial
/// UTF-8 sequence for the next chunk.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let rest = pending.split_off(valid);
            let text = String::from_utf8_lossy(pending).into_owned();
            *pending = rest;
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}
