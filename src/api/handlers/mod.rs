//! API request handlers.

/// Chat and streaming handlers.
pub mod chat;
/// Runtime configuration handlers.
pub mod config;
/// Liveness handlers.
pub mod health;
/// WebSocket chat handler.
pub mod ws;
