//! Client configuration, persisted as TOML.
//!
//! Lives in `$XDG_CONFIG_HOME/docview/config.toml`. Every field is optional;
//! a missing file yields the defaults. `DOCVIEW_BASE_URL` and `BACKEND_PORT`
//! override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::DEFAULT_BASE_URL;

/// Errors from loading or saving configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(docview::config::read),
        help("Ensure the config file is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(docview::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(docview::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {key}: \"{value}\"")]
    #[diagnostic(code(docview::config::invalid_value), help("{expected}"))]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Origin serving the `/api` endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Quiet period before an interactive search is issued.
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default)]
    pub dev_server: DevServerConfig,
}

/// Development proxy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevServerConfig {
    /// Listen address of the dev server.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Host of the backend that receives proxied requests.
    #[serde(default = "default_backend_host")]
    pub backend_host: String,
    /// Port of the backend that receives proxied requests.
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,
    /// Path prefix routed to the backend.
    #[serde(default = "default_proxy_prefix")]
    pub proxy_prefix: String,
    /// Directory of built front-end assets served for everything else.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_search_debounce_ms() -> u64 {
    300
}
fn default_bind() -> String {
    "127.0.0.1:5173".into()
}
fn default_backend_host() -> String {
    "localhost".into()
}
fn default_backend_port() -> u16 {
    8090
}
fn default_proxy_prefix() -> String {
    "/api".into()
}
fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_debounce_ms: default_search_debounce_ms(),
            dev_server: DevServerConfig::default(),
        }
    }
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            backend_host: default_backend_host(),
            backend_port: default_backend_port(),
            proxy_prefix: default_proxy_prefix(),
            out_dir: default_out_dir(),
        }
    }
}

impl DevServerConfig {
    /// Origin proxied requests are forwarded to.
    pub fn backend_url(&self) -> String {
        format!("http://{}:{}", self.backend_host, self.backend_port)
    }

    /// Whether `path` falls under the proxied prefix.
    ///
    /// `/api` and `/api/...` match; `/apiary` does not.
    pub fn is_proxied(&self, path: &str) -> bool {
        let prefix = self.proxy_prefix.trim_end_matches('/');
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl Config {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Load from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Apply `DOCVIEW_BASE_URL` and `BACKEND_PORT` from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(url) = lookup("DOCVIEW_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(port) = lookup("BACKEND_PORT").filter(|v| !v.trim().is_empty()) {
            self.dev_server.backend_port =
                port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "BACKEND_PORT".into(),
                    value: port.clone(),
                    expected: "BACKEND_PORT must be a port number between 1 and 65535.".into(),
                })?;
        }
        Ok(())
    }
}
