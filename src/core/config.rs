//! Loads the model configuration and the API credential.

use llm::builder::LLMBackend;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::api::LlmSettings;

pub const APP_NAME: &str = "blog_pipeline";
pub const USER_ID: &str = "demo_user";

pub const DEFAULT_BACKEND: &str = "google";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Errors raised while assembling the runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid backend '{0}'")]
    UnknownBackend(String),

    #[error("{0} environment variable not set")]
    MissingCredential(String),
}

#[derive(Deserialize, Debug, Default)]
struct ConfigFile {
    #[serde(default)]
    model: ModelConfig,
}

/// Which hosted model to call and how to authenticate against it.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: String,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            base_url: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

impl ModelConfig {
    /// Reads the `[model]` table of a TOML file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(file.model)
    }

    /// Uses `path` when given, the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential(self.api_key_env.clone())),
        }
    }

    /// Resolves the backend and credential into client settings.
    pub fn settings(&self) -> Result<LlmSettings, ConfigError> {
        let backend = LLMBackend::from_str(&self.backend)
            .map_err(|_| ConfigError::UnknownBackend(self.backend.clone()))?;
        Ok(LlmSettings {
            backend,
            model: self.model.clone(),
            api_key: self.api_key()?,
            base_url: self.base_url.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_target_gemini() {
        let cfg = ModelConfig::load(None).unwrap();
        assert_eq!(cfg.backend, "google");
        assert_eq!(cfg.model, "gemini-2.5-flash-lite");
        assert_eq!(cfg.api_key_env, "GOOGLE_API_KEY");
    }

    #[test]
    fn file_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[model]\nbackend = \"openai\"\nmodel = \"gpt-4o-mini\"\nmax_tokens = 800"
        )
        .unwrap();

        let cfg = ModelConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.backend, "openai");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.max_tokens, Some(800));
        assert_eq!(cfg.api_key_env, DEFAULT_API_KEY_ENV);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[model\nbackend = ").unwrap();
        assert!(matches!(
            ModelConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_credential_is_reported_by_name() {
        let cfg = ModelConfig {
            api_key_env: "BLOG_PIPELINE_TEST_UNSET_KEY".to_string(),
            ..ModelConfig::default()
        };
        let err = cfg.settings().unwrap_err();
        assert_eq!(
            err.to_string(),
            "BLOG_PIPELINE_TEST_UNSET_KEY environment variable not set"
        );
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let cfg = ModelConfig {
            backend: "carrier-pigeon".to_string(),
            ..ModelConfig::default()
        };
        assert!(matches!(cfg.settings(), Err(ConfigError::UnknownBackend(_))));
    }
}
