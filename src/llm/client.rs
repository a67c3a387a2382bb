//! LLM client abstractions and backend selection
//!
//! Two backends exist:
//! - **LlamaCpp**: on-device GGUF inference (`llamacpp` feature)
//! - **Remote**: a JSON-over-HTTP completion endpoint
//!
//! The backend is picked once, when a client is created, from a [`Provider`].

use crate::types::{AppError, Mode, Result, RuntimeConfig};
use crate::utils::config::LLMConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use super::remote::RemoteClient;

/// Pull-based sequence of text fragments. `None` marks the end of the
/// completion; dropping the stream abandons it.
pub type TokenStream = Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>;

/// Generic LLM client trait for backend abstraction
///
/// All backends implement this trait, so the personality core never
/// needs to know which one it is talking to.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate the full completion for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Stream a completion as it is produced
    async fn stream(&self, prompt: &str) -> Result<TokenStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Backend enum for construction-time selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// On-device inference through llama.cpp.
    LlamaCpp {
        model_path: Option<PathBuf>,
        use_gpu: bool,
    },

    /// Remote completion endpoint receiving `{"prompt": ...}`.
    Remote {
        url: Option<String>,
        api_key: Option<String>,
    },
}

impl Provider {
    /// Resolve the provider for `mode` from static settings and the
    /// runtime configuration. A runtime OpenRouter key takes precedence
    /// over keys from the environment.
    pub fn resolve(mode: Mode, settings: &LLMConfig, runtime: &RuntimeConfig) -> Self {
        match mode {
            Mode::Local => Provider::LlamaCpp {
                model_path: settings.local_model_path.clone(),
                use_gpu: settings.use_gpu,
            },
            Mode::Remote => Provider::Remote {
                url: settings.remote_url.clone(),
                api_key: runtime
                    .openrouter_api_key
                    .clone()
                    .or_else(|| settings.openrouter_api_key.clone())
                    .or_else(|| settings.openai_api_key.clone()),
            },
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when the model path or remote URL
    /// is missing, or when local inference was not compiled in.
    pub async fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::Remote { url, api_key } => {
                let url = Self::require_url(url)?;
                Ok(Arc::new(RemoteClient::new(url, api_key.clone())?))
            }
            Provider::LlamaCpp {
                model_path,
                use_gpu,
            } => Self::create_local(model_path.as_ref(), *use_gpu).await,
        }
    }

    fn require_url(url: &Option<String>) -> Result<String> {
        url.clone().ok_or_else(|| {
            AppError::Configuration("No remote URL configured (set REMOTE_URL)".to_string())
        })
    }

    #[cfg(feature = "llamacpp")]
    async fn create_local(model_path: Option<&PathBuf>, use_gpu: bool) -> Result<Arc<dyn LLMClient>> {
        let path = model_path.ok_or_else(|| {
            AppError::Configuration(
                "Local model not available (set LOCAL_MODEL_PATH)".to_string(),
            )
        })?;
        let client = super::llamacpp::LlamaCppClient::load(path.clone(), use_gpu).await?;
        Ok(Arc::new(client))
    }

    #[cfg(not(feature = "llamacpp"))]
    async fn create_local(model_path: Option<&PathBuf>, _use_gpu: bool) -> Result<Arc<dyn LLMClient>> {
        Err(AppError::Configuration(match model_path {
            None => "Local model not available (set LOCAL_MODEL_PATH)".to_string(),
            Some(path) => format!(
                "Local model '{}' configured but this build lacks the 'llamacpp' feature",
                path.display()
            ),
        }))
    }

    pub fn mode(&self) -> Mode {
        match self {
            Provider::LlamaCpp { .. } => Mode::Local,
            Provider::Remote { .. } => Mode::Remote,
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::LlamaCpp { .. } => "LlamaCpp",
            Provider::Remote { .. } => "Remote",
        }
    }
}

/// Factory seam so handlers can be tested with mock clients.
#[async_trait]
pub trait LLMClientFactoryTrait: Send + Sync {
    /// Build (or reuse) the client serving `mode`.
    async fn create_client(&self, mode: Mode, runtime: &RuntimeConfig)
        -> Result<Arc<dyn LLMClient>>;
}

/// Settings-based client factory
///
/// Remote clients are cheap and built per call on a shared HTTP pool,
/// so credential changes apply to the next request. The local model is
/// loaded once and reused.
pub struct LLMClientFactory {
    settings: LLMConfig,
    http: reqwest::Client,
    local: OnceCell<Arc<dyn LLMClient>>,
}

impl LLMClientFactory {
    pub fn new(settings: LLMConfig) -> Result<Self> {
        Ok(Self {
            settings,
            http: RemoteClient::http_client()?,
            local: OnceCell::new(),
        })
    }
}

#[async_trait]
impl LLMClientFactoryTrait for LLMClientFactory {
    async fn create_client(
        &self,
        mode: Mode,
        runtime: &RuntimeConfig,
    ) -> Result<Arc<dyn LLMClient>> {
        let provider = Provider::resolve(mode, &self.settings, runtime);
        debug!(provider = provider.name(), mode = ?provider.mode(), "Resolved LLM backend");

        match provider {
            Provider::Remote { url, api_key } => {
                let url = Provider::require_url(&url)?;
                Ok(Arc::new(RemoteClient::with_http(
                    self.http.clone(),
                    url,
                    api_key,
                )))
            }
            local @ Provider::LlamaCpp { .. } => self
                .local
                .get_or_try_init(|| async move { local.create_client().await })
                .await
                .cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::Settings;

    fn llm_settings(pairs: &[(&str, &str)]) -> LLMConfig {
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
        .unwrap()
        .llm
    }

    #[test]
    fn test_provider_name_and_mode() {
        let remote = Provider::Remote {
            url: None,
            api_key: None,
        };
        assert_eq!(remote.name(), "Remote");
        assert_eq!(remote.mode(), Mode::Remote);

        let local = Provider::LlamaCpp {
            model_path: None,
            use_gpu: false,
        };
        assert_eq!(local.name(), "LlamaCpp");
        assert_eq!(local.mode(), Mode::Local);
    }

    #[test]
    fn test_runtime_key_wins_over_environment() {
        let settings = llm_settings(&[
            ("REMOTE_URL", "http://llm.local/generate"),
            ("OPENROUTER_API_KEY", "env-key"),
        ]);
        let runtime = RuntimeConfig {
            openrouter_api_key: Some("runtime-key".to_string()),
            ..Default::default()
        };

        match Provider::resolve(Mode::Remote, &settings, &runtime) {
            Provider::Remote { url, api_key } => {
                assert_eq!(url.as_deref(), Some("http://llm.local/generate"));
                assert_eq!(api_key.as_deref(), Some("runtime-key"));
            }
            other => panic!("unexpected provider {:?}", other),
        }

        match Provider::resolve(Mode::Remote, &settings, &RuntimeConfig::default()) {
            Provider::Remote { api_key, .. } => assert_eq!(api_key.as_deref(), Some("env-key")),
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[test]
    fn test_openai_key_is_last_resort() {
        let settings = llm_settings(&[("OPENAI_API_KEY", "sk-test")]);
        match Provider::resolve(Mode::Remote, &settings, &RuntimeConfig::default()) {
            Provider::Remote { api_key, .. } => assert_eq!(api_key.as_deref(), Some("sk-test")),
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_without_url_is_configuration_error() {
        let factory = LLMClientFactory::new(llm_settings(&[])).unwrap();
        let result = factory
            .create_client(Mode::Remote, &RuntimeConfig::default())
            .await;

        // Box<dyn LLMClient> doesn't implement Debug
        match result {
            Ok(_) => panic!("Expected configuration error"),
            Err(e) => {
                assert!(matches!(e, AppError::Configuration(_)));
                assert!(e.to_string().contains("REMOTE_URL"));
            }
        }
    }

    #[tokio::test]
    async fn test_local_without_model_path_is_configuration_error() {
        let factory = LLMClientFactory::new(llm_settings(&[])).unwrap();
        let result = factory
            .create_client(Mode::Local, &RuntimeConfig::default())
            .await;

        match result {
            Ok(_) => panic!("Expected configuration error"),
            Err(e) => assert!(matches!(e, AppError::Configuration(_))),
        }
    }

    #[tokio::test]
    async fn test_remote_client_reports_model_url() {
        let factory =
            LLMClientFactory::new(llm_settings(&[("REMOTE_URL", "http://llm.local/generate")]))
                .unwrap();
        let client = match factory
            .create_client(Mode::Remote, &RuntimeConfig::default())
            .await
        {
            Ok(client) => client,
            Err(e) => panic!("unexpected error: {}", e),
        };
        assert_eq!(client.model_name(), "http://llm.local/generate");
    }
}
