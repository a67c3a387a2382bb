//! Process-wide settings read once at startup.
//!
//! Values come from the environment after `dotenvy` has loaded `.env`.
//! [`Settings::from_lookup`] takes any key lookup so tests can build
//! settings without touching the process environment.

use crate::types::{AppError, Mode, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are VEX, a helpful assistant.";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub memory: MemoryConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub system_prompt: String,
    pub mode: Mode,
    pub models_path: PathBuf,
    pub local_model_path: Option<PathBuf>,
    pub use_gpu: bool,
    pub remote_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    None,
    Memory,
    Chroma,
    Qdrant,
}

impl FromStr for VectorBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(VectorBackend::None),
            "memory" | "in-memory" => Ok(VectorBackend::Memory),
            "chroma" | "chromadb" => Ok(VectorBackend::Chroma),
            "qdrant" => Ok(VectorBackend::Qdrant),
            other => Err(AppError::Configuration(format!(
                "Unsupported vector backend '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub vector_backend: VectorBackend,
    pub collection: String,
    pub chroma_url: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub config_token: String,
}

impl Settings {
    /// Load `.env` (or `env_file`) and read settings from the environment.
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    AppError::Configuration(format!("Failed to read {}: {}", path.display(), e))
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = or("PORT", "8000")
            .parse::<u16>()
            .map_err(|e| AppError::Configuration(format!("Invalid PORT: {}", e)))?;

        let models_path = PathBuf::from(or("MODELS_PATH", "models"));
        let local_model_path = get("LOCAL_MODEL_PATH").map(|p| {
            let path = PathBuf::from(p);
            if path.is_relative() {
                models_path.join(path)
            } else {
                path
            }
        });

        Ok(Settings {
            server: ServerConfig {
                host: or("HOST", "127.0.0.1"),
                port,
                log_level: or("LOG_LEVEL", "info"),
                log_json: match or("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
                    "text" | "pretty" => false,
                    "json" => true,
                    other => {
                        return Err(AppError::Configuration(format!(
                            "Invalid LOG_FORMAT '{}', expected 'text' or 'json'",
                            other
                        )))
                    }
                },
            },
            llm: LLMConfig {
                system_prompt: or("SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
                mode: or("VEX_MODE", "local").parse()?,
                models_path,
                local_model_path,
                use_gpu: parse_bool("USE_GPU", get("USE_GPU"))?,
                remote_url: get("REMOTE_URL"),
                openai_api_key: get("OPENAI_API_KEY"),
                openrouter_api_key: get("OPENROUTER_API_KEY"),
                anthropic_api_key: get("ANTHROPIC_API_KEY"),
            },
            memory: MemoryConfig {
                vector_backend: or("VECTOR_BACKEND", "none").parse()?,
                collection: or("MEMORY_COLLECTION", "vex_memory"),
                chroma_url: or("CHROMA_URL", "http://localhost:8001"),
                qdrant_url: or("QDRANT_URL", "http://localhost:6334"),
                qdrant_api_key: get("QDRANT_API_KEY"),
                embedding_model: or("EMBEDDING_MODEL", "MiniLM"),
                embedding_url: get("EMBEDDING_URL"),
            },
            auth: AuthConfig {
                config_token: or("CONFIG_TOKEN", "secret-token"),
            },
        })
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Configuration(format!(
                "Invalid boolean for {}: '{}'",
                key, v
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.llm.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(settings.llm.mode, Mode::Local);
        assert!(settings.llm.remote_url.is_none());
        assert!(!settings.llm.use_gpu);
        assert_eq!(settings.memory.vector_backend, VectorBackend::None);
        assert_eq!(settings.auth.config_token, "secret-token");
        assert!(!settings.server.log_json);
    }

    #[test]
    fn test_default_chroma_url_is_not_our_own_address() {
        let settings = settings_from(&[]).unwrap();
        let own = format!(":{}", settings.server.port);
        assert_eq!(settings.memory.chroma_url, "http://localhost:8001");
        assert!(!settings.memory.chroma_url.ends_with(&own));
    }

    #[test]
    fn test_log_format() {
        assert!(settings_from(&[("LOG_FORMAT", "JSON")]).unwrap().server.log_json);
        assert!(matches!(
            settings_from(&[("LOG_FORMAT", "xml")]),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_relative_model_path_resolves_against_models_dir() {
        let settings = settings_from(&[
            ("MODELS_PATH", "/opt/models"),
            ("LOCAL_MODEL_PATH", "vex.gguf"),
        ])
        .unwrap();
        assert_eq!(
            settings.llm.local_model_path,
            Some(PathBuf::from("/opt/models/vex.gguf"))
        );

        let absolute = settings_from(&[("LOCAL_MODEL_PATH", "/srv/vex.gguf")]).unwrap();
        assert_eq!(
            absolute.llm.local_model_path,
            Some(PathBuf::from("/srv/vex.gguf"))
        );
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings = settings_from(&[("REMOTE_URL", "  "), ("PORT", "")]).unwrap();
        assert!(settings.llm.remote_url.is_none());
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        assert!(matches!(
            settings_from(&[("PORT", "eighty")]),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            settings_from(&[("VECTOR_BACKEND", "faiss")]),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            settings_from(&[("USE_GPU", "maybe")]),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_vector_backend_aliases() {
        assert_eq!(
            "chromadb".parse::<VectorBackend>().unwrap(),
            VectorBackend::Chroma
        );
        assert_eq!(
            "in-memory".parse::<VectorBackend>().unwrap(),
            VectorBackend::Memory
        );
        assert_eq!(
            "Qdrant".parse::<VectorBackend>().unwrap(),
            VectorBackend::Qdrant
        );
    }

    #[test]
    fn test_use_gpu_flag() {
        let settings = settings_from(&[("USE_GPU", "true")]).unwrap();
        assert!(settings.llm.use_gpu);
    }
}
