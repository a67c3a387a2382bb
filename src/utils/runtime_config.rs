//! In-memory configuration edited through `/api/config`.

use crate::types::{Mode, RuntimeConfig};
use crate::utils::config::Settings;
use parking_lot::RwLock;
use tracing::info;

/// Process-wide runtime configuration.
///
/// Created at startup from [`Settings`] and shared through `AppState`.
/// Readers take a snapshot; the lock is never held across an await.
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: RwLock<RuntimeConfig>,
}

impl ConfigStore {
    pub fn new(initial: RuntimeConfig) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Seed credentials and mode from the environment.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(RuntimeConfig {
            openrouter_api_key: settings.llm.openrouter_api_key.clone(),
            anthropic_api_key: settings.llm.anthropic_api_key.clone(),
            mode: settings.llm.mode,
        })
    }

    pub fn snapshot(&self) -> RuntimeConfig {
        self.inner.read().clone()
    }

    pub fn mode(&self) -> Mode {
        self.inner.read().mode
    }

    /// Replace the whole configuration and return what is now stored.
    pub fn replace(&self, config: RuntimeConfig) -> RuntimeConfig {
        let mut guard = self.inner.write();
        info!(mode = ?config.mode, "Runtime configuration updated");
        *guard = config;
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_snapshot() {
        let store = ConfigStore::default();
        assert_eq!(store.mode(), Mode::Local);

        let stored = store.replace(RuntimeConfig {
            openrouter_api_key: Some("or-key".to_string()),
            anthropic_api_key: None,
            mode: Mode::Remote,
        });

        assert_eq!(stored.mode, Mode::Remote);
        assert_eq!(store.snapshot(), stored);
        assert_eq!(store.mode(), Mode::Remote);
    }

    #[test]
    fn test_seeded_from_settings() {
        let settings = Settings::from_lookup(|key| match key {
            "OPENROUTER_API_KEY" => Some("env-key".to_string()),
            "VEX_MODE" => Some("remote".to_string()),
            _ => None,
        })
        .unwrap();

        let store = ConfigStore::from_settings(&settings);
        let config = store.snapshot();
        assert_eq!(config.openrouter_api_key.as_deref(), Some("env-key"));
        assert!(config.anthropic_api_key.is_none());
        assert_eq!(config.mode, Mode::Remote);
    }
}
