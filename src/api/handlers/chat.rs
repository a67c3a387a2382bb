use crate::{
    types::{AppError, ChatRequest, ChatResponse, Result},
    AppState,
};
use async_stream::stream;
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use tracing::{error, warn};

/// Final chunk of a streamed chat reply.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Chat with VEX
///
/// With `stream: true` the reply is sent as a `text/plain` chunked body of
/// raw fragments, terminated by `[DONE]`.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Chat reply, or a text/plain stream when `stream` is set", body = ChatResponse),
        (status = 400, description = "No messages in request"),
        (status = 422, description = "Message rejected by validator"),
        (status = 500, description = "Backend not configured"),
        (status = 502, description = "Backend failed")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response> {
    let message = payload
        .routed_message()
        .ok_or_else(|| AppError::InvalidInput("messages must not be empty".to_string()))?
        .to_string();

    let router = state.router(payload.remote).await?;

    if !payload.stream {
        let reply = router.handle_message(&message).await?;
        if !reply.recall.is_ok() || !reply.persisted.is_ok() {
            warn!(recall = ?reply.recall, persisted = ?reply.persisted, "Memory degraded");
        }
        return Ok(Json(ChatResponse { reply: reply.reply }).into_response());
    }

    let mut tokens = router.handle_message_stream(&message).await?;

    // Status is committed with the first body chunk, so a backend that
    // fails before producing anything still gets a JSON error response.
    let first = tokens.next().await.transpose()?;

    let body = stream! {
        if let Some(text) = first {
            yield Ok(text);
        }
        while let Some(chunk) = tokens.next().await {
            match chunk {
                Ok(text) => yield Ok(text),
                Err(e) => {
                    error!(error = %e, "Chat stream aborted");
                    yield Err(e);
                    return;
                }
            }
        }
        yield Ok::<_, AppError>(DONE_SENTINEL.to_string());
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
