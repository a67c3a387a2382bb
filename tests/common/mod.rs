#![allow(dead_code)]

pub mod mocks;

use std::sync::Arc;
use vex::llm::LLMClientFactoryTrait;
use vex::{AppState, ConfigStore, MemoryStore, PassthroughValidator, Settings};

/// Settings built only from `pairs`, ignoring the process environment.
pub fn settings(pairs: &[(&str, &str)]) -> Settings {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .expect("valid test settings")
}

/// Application state with substring-only memory and the given factory.
pub fn test_state(settings: Settings, llm_factory: Arc<dyn LLMClientFactoryTrait>) -> AppState {
    AppState {
        config: Arc::new(ConfigStore::from_settings(&settings)),
        settings: Arc::new(settings),
        memory: Arc::new(MemoryStore::new()),
        validator: Arc::new(PassthroughValidator),
        llm_factory,
    }
}
