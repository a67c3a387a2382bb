use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

// ============= API Request/Response Types =============

/// A single chat message as sent by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    /// Overrides the configured mode for this request when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
}

impl ChatRequest {
    /// The message to route: the last `user` turn, or the last turn of any role.
    pub fn routed_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .or_else(|| self.messages.last())
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
}

/// Outbound WebSocket frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WsFrame {
    Token { token: String },
    Reply { reply: String, done: bool },
    Error { error: String, done: bool },
}

impl WsFrame {
    pub fn reply(reply: String) -> Self {
        WsFrame::Reply { reply, done: true }
    }

    pub fn error(error: impl std::fmt::Display) -> Self {
        WsFrame::Error {
            error: error.to_string(),
            done: true,
        }
    }
}

// ============= Runtime Configuration =============

/// Inference mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Local,
    Remote,
}

impl Mode {
    pub fn from_remote_flag(remote: bool) -> Self {
        if remote {
            Mode::Remote
        } else {
            Mode::Local
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Mode::Local),
            "remote" => Ok(Mode::Remote),
            other => Err(AppError::Configuration(format!(
                "Unknown mode '{}', expected 'local' or 'remote'",
                other
            ))),
        }
    }
}

/// Credentials and mode editable through `/api/config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    pub mode: Mode,
}

// ============= Memory Types =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            embedding: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: MemoryEntry,
    /// Backend-native score: a similarity (higher is closer) or a distance
    /// (lower is closer) depending on the provider.
    pub score: f32,
}

/// How a memory operation actually went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOutcome {
    Ok,
    /// Served or stored by the fallback list after the similarity backend failed.
    Degraded(String),
    Failed(String),
}

impl MemoryOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, MemoryOutcome::Ok)
    }

    /// Keeps the worst of two outcomes.
    pub fn merge(self, other: MemoryOutcome) -> MemoryOutcome {
        match (self, other) {
            (MemoryOutcome::Failed(r), _) | (_, MemoryOutcome::Failed(r)) => {
                MemoryOutcome::Failed(r)
            }
            (MemoryOutcome::Degraded(r), _) | (_, MemoryOutcome::Degraded(r)) => {
                MemoryOutcome::Degraded(r)
            }
            _ => MemoryOutcome::Ok,
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::LLM(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Embedding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_routed_message_prefers_last_user_turn() {
        let request = ChatRequest {
            messages: vec![
                msg("user", "first"),
                msg("user", "second"),
                msg("assistant", "reply"),
            ],
            stream: false,
            remote: None,
        };
        assert_eq!(request.routed_message(), Some("second"));
    }

    #[test]
    fn test_routed_message_falls_back_to_last_turn() {
        let request = ChatRequest {
            messages: vec![msg("system", "be nice")],
            stream: false,
            remote: None,
        };
        assert_eq!(request.routed_message(), Some("be nice"));

        let empty = ChatRequest {
            messages: vec![],
            stream: false,
            remote: None,
        };
        assert_eq!(empty.routed_message(), None);
    }

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert!(!request.stream);
        assert!(request.remote.is_none());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("remote".parse::<Mode>().unwrap(), Mode::Remote);
        assert_eq!(" LOCAL ".parse::<Mode>().unwrap(), Mode::Local);
        assert!(matches!(
            "faiss".parse::<Mode>(),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_runtime_config_rejects_unknown_mode() {
        let result: std::result::Result<RuntimeConfig, _> =
            serde_json::from_str(r#"{"mode":"hybrid"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_ws_frame_shapes() {
        let token = serde_json::to_value(WsFrame::Token {
            token: "He".to_string(),
        })
        .unwrap();
        assert_eq!(token, serde_json::json!({"token": "He"}));

        let reply = serde_json::to_value(WsFrame::Reply {
            reply: "Hello".to_string(),
            done: true,
        })
        .unwrap();
        assert_eq!(reply, serde_json::json!({"reply": "Hello", "done": true}));
    }

    #[test]
    fn test_memory_outcome_merge_keeps_worst() {
        let degraded = MemoryOutcome::Degraded("index down".to_string());
        assert_eq!(MemoryOutcome::Ok.merge(degraded.clone()), degraded);
        assert_eq!(
            degraded.merge(MemoryOutcome::Failed("gone".to_string())),
            MemoryOutcome::Failed("gone".to_string())
        );
        assert!(MemoryOutcome::Ok.merge(MemoryOutcome::Ok).is_ok());
    }
}
