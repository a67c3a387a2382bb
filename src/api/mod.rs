//! HTTP API Handlers and Routes
//!
//! This module provides the HTTP and WebSocket layer for VEX, built on the
//! Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and OpenAPI document
//!
//! # API Endpoints
//!
//! ## Health
//! - `GET /` - `{"status": "ok"}`
//! - `GET /health` - Plain `OK`
//!
//! ## Chat (`/api/chat`)
//! - `POST /api/chat` - Send a conversation, receive a reply or a text stream
//! - `GET /api/chat/ws` - WebSocket chat (`?stream=true&remote=false`)
//!
//! ## Configuration (`/api/config`)
//! - `GET /api/config` - Read credentials and mode
//! - `POST /api/config` - Replace credentials and mode
//!
//! # Authentication
//!
//! Only the configuration endpoints are guarded, by a shared token:
//! ```text
//! X-Token: <CONFIG_TOKEN>
//! ```
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::{create_router, ApiDoc, MAX_BODY_BYTES};
