use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use twig_core::SessionConfig;

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "twig";
const APP_NAME: &str = "twig";
const CONFIG_FILENAME: &str = "config.json";

pub const DEFAULT_MODEL_ID: &str = "gpt-4o-mini";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve user config directory")]
    MissingConfigDir,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// App-local config directory.
pub fn config_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).ok_or(Error::MissingConfigDir)?;
    Ok(dirs.config_dir().to_path_buf())
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// User settings from `config.json`. Every field is optional; unset fields
/// fall through to the environment or to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub system_prompt: Option<String>,
    pub greeting: Option<String>,
    pub error_message: Option<String>,
    /// Zero counts as unset.
    pub request_timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AppConfig {
    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load from `path`. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: AppConfig) -> AppConfig {
        AppConfig {
            model: overrides.model.or(self.model),
            base_url: overrides.base_url.or(self.base_url),
            system_prompt: overrides.system_prompt.or(self.system_prompt),
            greeting: overrides.greeting.or(self.greeting),
            error_message: overrides.error_message.or(self.error_message),
            request_timeout_secs: overrides.request_timeout_secs.or(self.request_timeout_secs),
            temperature: overrides.temperature.or(self.temperature),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
        }
    }

    pub fn model_id(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL_ID)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::default();
        if let Some(prompt) = non_blank(&self.system_prompt) {
            config = config.system_prompt(prompt);
        }
        if let Some(greeting) = non_blank(&self.greeting) {
            config = config.greeting(greeting);
        }
        if let Some(message) = non_blank(&self.error_message) {
            config = config.error_message(message);
        }
        if let Some(temperature) = self.temperature {
            config = config.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.max_tokens(max_tokens);
        }
        config
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
