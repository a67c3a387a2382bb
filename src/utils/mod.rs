/// Environment-derived settings loaded at startup.
pub mod config;
/// Mutable runtime configuration (credentials and mode).
pub mod runtime_config;
