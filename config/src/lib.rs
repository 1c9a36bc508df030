//! `~/.cadence/config.toml` loading.
//!
//! Every section is optional. Accessors on [`CadenceConfig`] return the
//! effective value, falling back to defaults for anything left unset.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Overrides `[api] base_url`.
pub const BASE_URL_ENV: &str = "CADENCE_API_BASE_URL";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_MESSAGES: usize = 500;
pub const DEFAULT_SESSION: u64 = 1;
pub const DEFAULT_SCHEDULE_PATH: &str = "/schedule";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CadenceConfig {
    pub api: Option<ApiConfig>,
    pub logs: Option<LogsConfig>,
    pub session: Option<SessionConfig>,
    pub schedule: Option<ScheduleConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ApiConfig {
    /// Registry base URL, e.g. `http://localhost:8000`.
    pub base_url: Option<String>,
    /// Log stream base URL. Derived from `base_url` when unset.
    pub ws_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LogsConfig {
    pub max_messages: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SessionConfig {
    pub default: Option<u64>,
}

#[derive(Default, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub path: Option<String>,
    /// Sent as the `Authorization` header on pause/resume. Supports `${VAR}`.
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ScheduleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleConfig")
            .field("path", &self.path)
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .finish()
    }
}

/// Replace `${VAR}` with the variable's value (empty when unset). An
/// unclosed `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        if !name.is_empty() {
            out.push_str(&env::var(name).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl CadenceConfig {
    /// Load the user config. `Ok(None)` when there is no home directory or
    /// no config file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Registry base URL: the environment override, then the file, then
    /// [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn base_url(&self) -> String {
        self.resolve_base_url(env::var(BASE_URL_ENV).ok())
    }

    fn resolve_base_url(&self, env_override: Option<String>) -> String {
        non_empty(env_override)
            .or_else(|| non_empty(self.api.as_ref().and_then(|api| api.base_url.clone())))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    #[must_use]
    pub fn ws_base_url(&self) -> Option<String> {
        non_empty(self.api.as_ref().and_then(|api| api.ws_base_url.clone()))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.api
                .as_ref()
                .and_then(|api| api.request_timeout_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.api
                .as_ref()
                .and_then(|api| api.connect_timeout_secs)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn max_messages(&self) -> usize {
        self.logs
            .as_ref()
            .and_then(|logs| logs.max_messages)
            .unwrap_or(DEFAULT_MAX_MESSAGES)
            .max(1)
    }

    #[must_use]
    pub fn default_session(&self) -> u64 {
        self.session
            .as_ref()
            .and_then(|session| session.default)
            .unwrap_or(DEFAULT_SESSION)
    }

    #[must_use]
    pub fn schedule_path(&self) -> String {
        non_empty(self.schedule.as_ref().and_then(|s| s.path.clone()))
            .unwrap_or_else(|| DEFAULT_SCHEDULE_PATH.to_string())
    }

    /// Schedule-manager API key with `${VAR}` references expanded. `None`
    /// when unset or empty after expansion.
    #[must_use]
    pub fn schedule_api_key(&self) -> Option<String> {
        let raw = self.schedule.as_ref()?.api_key.as_deref()?;
        non_empty(Some(expand_env_vars(raw)))
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cadence"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
