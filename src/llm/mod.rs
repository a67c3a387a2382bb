//! LLM Backend Clients and Abstractions
//!
//! This module provides a unified interface over the two inference backends
//! VEX supports. The rest of the application works against the
//! [`LLMClient`] trait and never checks which backend it has.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all backends implement
//! - [`Provider`] - Tagged backend selection, resolved from mode + settings
//! - [`LLMClientFactory`] - Builds clients per request; caches the local model
//!
//! # Backends
//!
//! - `remote` - Any HTTP endpoint accepting `{"prompt": ...}` (always built)
//! - `llamacpp` - On-device GGUF inference (cargo feature `llamacpp`)
//!
//! # Streaming
//!
//! Both backends support streaming via [`LLMClient::stream`], which returns a
//! [`TokenStream`]: a pull-based `Stream<Item = Result<String>>` that ends
//! with `None` and is cancelled by dropping it.

/// Core LLM client trait, backend selection and factory.
pub mod client;
/// HTTP completion backend.
pub mod remote;

#[cfg(feature = "llamacpp")]
pub mod llamacpp;

pub use client::{LLMClient, LLMClientFactory, LLMClientFactoryTrait, Provider, TokenStream};
pub use remote::RemoteClient;
