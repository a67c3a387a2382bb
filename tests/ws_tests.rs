mod common;

use async_trait::async_trait;
use axum_test::{TestServer, TestWebSocket};
use common::mocks::{MockLLMClient, MockLLMFactory};
use common::{settings, test_state};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use vex::api::handlers::ws::reply_frames;
use vex::types::{Mode, WsFrame};
use vex::{create_router, AppState, LLMClientFactory, Validator};

/// Rejects any message containing "forbidden".
struct RejectForbidden;

#[async_trait]
impl Validator for RejectForbidden {
    async fn validate(&self, text: &str) -> bool {
        !text.contains("forbidden")
    }

    fn name(&self) -> &'static str {
        "reject-forbidden"
    }
}

/// WebSockets need a real transport rather than the mock one.
fn create_ws_server(state: AppState) -> TestServer {
    TestServer::builder()
        .http_transport()
        .build(create_router(state))
        .expect("Failed to create test server")
}

async fn connect(server: &TestServer, path: &str) -> TestWebSocket {
    server.get_websocket(path).await.into_websocket().await
}

async fn frames(
    state: vex::AppState,
    message: &str,
    remote: Option<bool>,
    streaming: bool,
) -> Vec<WsFrame> {
    reply_frames(state, message.to_string(), remote, streaming)
        .collect()
        .await
}

#[tokio::test]
async fn test_streaming_sends_tokens_then_reply() {
    let factory = Arc::new(MockLLMFactory::new(MockLLMClient::new("Hello from VEX")));
    let state = test_state(settings(&[]), factory);
    let memory = state.memory.clone();

    let frames = frames(state, "hi", None, true).await;

    assert_eq!(
        frames,
        vec![
            WsFrame::Token {
                token: "Hello".to_string()
            },
            WsFrame::Token {
                token: " from".to_string()
            },
            WsFrame::Token {
                token: " VEX".to_string()
            },
            WsFrame::reply("Hello from VEX".to_string()),
        ]
    );
    assert_eq!(memory.texts(), vec!["hi", "Hello from VEX"]);
}

#[tokio::test]
async fn test_non_streaming_sends_single_reply() {
    let factory = Arc::new(MockLLMFactory::new(MockLLMClient::new("Hello")));
    let state = test_state(settings(&[]), factory.clone());

    let frames = frames(state, "hi", Some(true), false).await;

    assert_eq!(frames, vec![WsFrame::reply("Hello".to_string())]);
    assert_eq!(factory.requested_modes(), vec![Mode::Remote]);
}

#[tokio::test]
async fn test_backend_failure_becomes_error_frame() {
    let factory = Arc::new(MockLLMFactory::new(MockLLMClient::failing()));
    let state = test_state(settings(&[]), factory);
    let memory = state.memory.clone();

    let frames = frames(state, "hi", None, true).await;

    assert_eq!(frames.len(), 1);
    assert!(matches!(&frames[0], WsFrame::Error { done: true, .. }));
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_missing_remote_url_becomes_error_frame() {
    let settings = settings(&[]);
    let factory = Arc::new(LLMClientFactory::new(settings.llm.clone()).unwrap());
    let state = test_state(settings, factory);

    let frames = frames(state, "hi", Some(true), false).await;

    match &frames[..] {
        [WsFrame::Error { error, done }] => {
            assert!(done);
            assert!(error.contains("REMOTE_URL"));
        }
        other => panic!("unexpected frames {:?}", other),
    }
}

#[test]
fn test_frames_serialize_as_flat_objects() {
    assert_eq!(
        serde_json::to_value(WsFrame::Token {
            token: "Hel".to_string()
        })
        .unwrap(),
        serde_json::json!({ "token": "Hel" })
    );
    assert_eq!(
        serde_json::to_value(WsFrame::reply("Hello".to_string())).unwrap(),
        serde_json::json!({ "reply": "Hello", "done": true })
    );
}

// ============= Socket =============

#[tokio::test]
async fn test_socket_streams_by_default() {
    let factory = Arc::new(MockLLMFactory::new(MockLLMClient::new("Hello from VEX")));
    let state = test_state(settings(&[]), factory.clone());
    let memory = state.memory.clone();
    let server = create_ws_server(state);
    let mut socket = connect(&server, "/api/chat/ws").await;

    socket.send_text("hi").await;

    socket.assert_receive_json(&json!({ "token": "Hello" })).await;
    socket.assert_receive_json(&json!({ "token": " from" })).await;
    socket.assert_receive_json(&json!({ "token": " VEX" })).await;
    socket
        .assert_receive_json(&json!({ "reply": "Hello from VEX", "done": true }))
        .await;

    assert_eq!(factory.requested_modes(), vec![Mode::Local]);
    assert_eq!(memory.texts(), vec!["hi", "Hello from VEX"]);
}

#[tokio::test]
async fn test_socket_accepts_mixed_case_flags() {
    let factory = Arc::new(MockLLMFactory::new(MockLLMClient::new("Hello")));
    let server = create_ws_server(test_state(settings(&[]), factory.clone()));
    let mut socket = connect(&server, "/api/chat/ws?stream=True&remote=TRUE").await;

    socket.send_text("hi").await;

    socket.assert_receive_json(&json!({ "token": "Hello" })).await;
    socket
        .assert_receive_json(&json!({ "reply": "Hello", "done": true }))
        .await;
    assert_eq!(factory.requested_modes(), vec![Mode::Remote]);
}

#[tokio::test]
async fn test_socket_stays_open_after_error_frame() {
    let factory = Arc::new(MockLLMFactory::new(MockLLMClient::new("Hello")));
    let mut state = test_state(settings(&[]), factory);
    state.validator = Arc::new(RejectForbidden);
    let memory = state.memory.clone();
    let server = create_ws_server(state);
    let mut socket = connect(&server, "/api/chat/ws?stream=false").await;

    socket.send_text("something forbidden").await;
    let frame: Value = socket.receive_json().await;
    assert_eq!(frame["done"], true);
    assert!(frame["error"].as_str().unwrap().contains("rejected"));

    socket.send_text("hi").await;
    socket
        .assert_receive_json(&json!({ "reply": "Hello", "done": true }))
        .await;
    assert_eq!(memory.texts(), vec!["hi", "Hello"]);
}

#[tokio::test]
async fn test_socket_frame_mode_beats_query_remote() {
    let factory = Arc::new(MockLLMFactory::new(MockLLMClient::new("Hello")));
    let server = create_ws_server(test_state(settings(&[]), factory.clone()));
    let mut socket = connect(&server, "/api/chat/ws?stream=false&remote=true").await;

    socket.send_text("plain").await;
    socket
        .assert_receive_json(&json!({ "reply": "Hello", "done": true }))
        .await;

    socket
        .send_json(&json!({ "message": "framed", "mode": "local" }))
        .await;
    socket
        .assert_receive_json(&json!({ "reply": "Hello", "done": true }))
        .await;

    assert_eq!(factory.requested_modes(), vec![Mode::Remote, Mode::Local]);
}
