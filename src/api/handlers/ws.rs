use crate::{
    types::{Mode, WsFrame},
    AppState,
};
use async_stream::stream;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

/// Connection flags. Values are compared case-insensitively against
/// `"true"`; anything else is false, so a malformed flag never rejects the
/// handshake.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
}

impl WsParams {
    /// Streaming is on unless explicitly disabled.
    pub fn streaming(&self) -> bool {
        query_flag(self.stream.as_deref()).unwrap_or(true)
    }

    /// `None` when absent, so the runtime config decides.
    pub fn remote(&self) -> Option<bool> {
        query_flag(self.remote.as_deref())
    }
}

fn query_flag(value: Option<&str>) -> Option<bool> {
    value.map(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// JSON frame form sent by the web frontend.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    message: String,
    #[serde(default)]
    mode: Option<Mode>,
}

/// Chat over a WebSocket.
///
/// Each text frame is one message. Streaming sends `{token}` per fragment
/// followed by `{reply, done: true}`.
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, params: WsParams) {
    let streaming = params.streaming();
    let remote = params.remote();
    debug!(stream = streaming, ?remote, "WebSocket connected");

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "WebSocket receive failed");
                break;
            }
        };

        let (message, remote) = parse_frame(&text, remote);
        let mut frames = Box::pin(reply_frames(state.clone(), message, remote, streaming));

        while let Some(frame) = frames.next().await {
            let payload = match serde_json::to_string(&frame) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Failed to encode frame");
                    continue;
                }
            };
            if socket.send(Message::Text(payload.into())).await.is_err() {
                debug!("WebSocket closed mid-reply");
                return;
            }
        }
    }

    debug!("WebSocket disconnected");
}

/// Split an inbound frame into the message and the remote flag to use.
///
/// A `mode` inside a JSON frame beats the connection's `remote` parameter.
pub fn parse_frame(text: &str, remote: Option<bool>) -> (String, Option<bool>) {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => (
            frame.message,
            frame.mode.map(|m| m == Mode::Remote).or(remote),
        ),
        Err(_) => (text.to_string(), remote),
    }
}

/// Outbound frames for one message. Errors become `{error, done: true}`.
pub fn reply_frames(
    state: AppState,
    message: String,
    remote: Option<bool>,
    streaming: bool,
) -> impl Stream<Item = WsFrame> + Send {
    stream! {
        let router = match state.router(remote).await {
            Ok(router) => router,
            Err(e) => {
                yield WsFrame::error(e);
                return;
            }
        };

        if !streaming {
            match router.handle_message(&message).await {
                Ok(reply) => yield WsFrame::reply(reply.reply),
                Err(e) => yield WsFrame::error(e),
            }
            return;
        }

        let mut tokens = match router.handle_message_stream(&message).await {
            Ok(tokens) => tokens,
            Err(e) => {
                yield WsFrame::error(e);
                return;
            }
        };

        let mut reply = String::new();
        while let Some(item) = tokens.next().await {
            match item {
                Ok(token) => {
                    reply.push_str(&token);
                    yield WsFrame::Token { token };
                }
                Err(e) => {
                    yield WsFrame::error(e);
                    return;
                }
            }
        }
        yield WsFrame::reply(reply);
    }
}
