//! Environment-sourced configuration.
//!
//! | Variable                       | Default                                   |
//! |--------------------------------|-------------------------------------------|
//! | `CODESPAWN_DEFAULT_PASSWORD`   | `changeme`                                |
//! | `CODESPAWN_DEFAULT_EXTENSIONS` | `ms-python.python,esbenp.prettier-vscode` |
//! | `CODESPAWN_CPU_LIMIT`          | `2`                                       |
//! | `CODESPAWN_MEMORY_LIMIT`       | `4g`                                      |
//! | `CODESPAWN_RUNTIME`            | `auto` (or `docker` / `podman`)           |
//! | `CODESPAWN_RECORDS_DIR`        | `~/.codespawn/instances`                  |

use crate::constants::{BASE_DIR_NAME, RECORDS_DIR};
use crate::engine::EngineKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

pub const ENV_DEFAULT_PASSWORD: &str = "CODESPAWN_DEFAULT_PASSWORD";
pub const ENV_DEFAULT_EXTENSIONS: &str = "CODESPAWN_DEFAULT_EXTENSIONS";
pub const ENV_CPU_LIMIT: &str = "CODESPAWN_CPU_LIMIT";
pub const ENV_MEMORY_LIMIT: &str = "CODESPAWN_MEMORY_LIMIT";
pub const ENV_RUNTIME: &str = "CODESPAWN_RUNTIME";
pub const ENV_RECORDS_DIR: &str = "CODESPAWN_RECORDS_DIR";

pub const DEFAULT_PASSWORD: &str = "changeme";
pub const DEFAULT_EXTENSIONS: &str = "ms-python.python,esbenp.prettier-vscode";
pub const DEFAULT_CPU_LIMIT: &str = "2";
pub const DEFAULT_MEMORY_LIMIT: &str = "4g";

/// How the container engine is chosen when a call does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "engine")]
pub enum RuntimeMode {
    /// Probe installed engines.
    #[default]
    Auto,
    /// Always use this engine.
    Forced(EngineKind),
}

impl RuntimeMode {
    /// Parses `auto`, `docker` or `podman`. Unknown values fall back to
    /// [`RuntimeMode::Auto`].
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            return Self::Auto;
        }
        match value.parse::<EngineKind>() {
            Ok(engine) => Self::Forced(engine),
            Err(_) => {
                warn!("ignoring unknown {} value '{}', using auto", ENV_RUNTIME, value);
                Self::Auto
            }
        }
    }

    /// Returns the forced engine, if any.
    pub fn forced(&self) -> Option<EngineKind> {
        match self {
            Self::Auto => None,
            Self::Forced(engine) => Some(*engine),
        }
    }
}

/// Provisioning defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub default_password: String,
    pub default_extensions: Vec<String>,
    pub cpu_limit: String,
    pub memory_limit: String,
    pub runtime_mode: RuntimeMode,
    pub records_dir: PathBuf,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_password =
            lookup(ENV_DEFAULT_PASSWORD).unwrap_or_else(|| DEFAULT_PASSWORD.to_string());
        let default_extensions = parse_extension_list(
            &lookup(ENV_DEFAULT_EXTENSIONS).unwrap_or_else(|| DEFAULT_EXTENSIONS.to_string()),
        );
        let cpu_limit = lookup(ENV_CPU_LIMIT)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CPU_LIMIT.to_string());
        let memory_limit = lookup(ENV_MEMORY_LIMIT)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MEMORY_LIMIT.to_string());
        let runtime_mode = lookup(ENV_RUNTIME)
            .map(|v| RuntimeMode::parse(&v))
            .unwrap_or_default();
        let records_dir = lookup(ENV_RECORDS_DIR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_records_dir);

        Self {
            default_password,
            default_extensions,
            cpu_limit,
            memory_limit,
            runtime_mode,
            records_dir,
        }
    }

    /// Returns a copy with a different records directory.
    pub fn with_records_dir(mut self, records_dir: impl Into<PathBuf>) -> Self {
        self.records_dir = records_dir.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Splits a comma-separated extension list, dropping empty entries.
pub fn parse_extension_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns `~/.codespawn/instances`, or a relative fallback without a home.
fn default_records_dir() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        home.join(BASE_DIR_NAME).join(RECORDS_DIR)
    } else {
        PathBuf::from(BASE_DIR_NAME).join(RECORDS_DIR)
    }
}
