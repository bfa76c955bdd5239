//! User configuration for the `dutil` binary.
//!
//! The configuration file is TOML and every field is optional:
//!
//! ```toml
//! # Hive file holding the registrations. Relative paths resolve against
//! # the directory of this file. Defaults to `registry.json` next to it.
//! hive_path = "registry.json"
//!
//! # Default registry root: "machine" (HKLM) or "user" (HKCU)
//! scope = "machine"
//!
//! # Seconds to wait for the hive lock before giving up
//! lock_timeout_secs = 30
//! ```
//!
//! # Location
//!
//! Resolved in order: the `--config` flag, the `DUTIL_CONFIG` environment
//! variable, then the platform default:
//!
//! - **Windows**: `%LOCALAPPDATA%\dutil\config.toml`
//! - **Unix/macOS**: `~/.dutil/config.toml`
//!
//! A missing file means all defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{CONFIG_ENV_VAR, default_lock_timeout};
use crate::core::DutilError;
use crate::registry::{FileHive, RegistryRoot};
use crate::utils::atomic_write;

/// File name of the hive when none is configured.
pub const DEFAULT_HIVE_FILE: &str = "registry.json";

/// Which registry root registrations go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Per-machine (HKLM)
    #[default]
    Machine,
    /// Per-user (HKCU)
    User,
}

impl Scope {
    /// Registry root backing this scope.
    #[must_use]
    pub const fn root(self) -> RegistryRoot {
        match self {
            Self::Machine => RegistryRoot::LocalMachine,
            Self::User => RegistryRoot::CurrentUser,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Machine => f.write_str("machine"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DutilConfig {
    /// Hive file location; relative paths resolve against the config directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hive_path: Option<PathBuf>,

    /// Default registry root
    pub scope: Scope,

    /// Seconds to wait for the hive lock
    pub lock_timeout_secs: u64,
}

impl Default for DutilConfig {
    fn default() -> Self {
        Self {
            hive_path: None,
            scope: Scope::default(),
            lock_timeout_secs: default_lock_timeout().as_secs(),
        }
    }
}

impl DutilConfig {
    /// Platform default location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or, on Windows, local data) directory
    /// cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("dutil")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".dutil")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Pick the configuration file: `explicit`, then `env_value`, then the default.
    ///
    /// Empty values are treated as unset.
    pub fn resolve_path(explicit: Option<&Path>, env_value: Option<OsString>) -> Result<PathBuf> {
        if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(path.to_path_buf());
        }
        if let Some(value) = env_value.filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(value));
        }
        Self::default_path()
    }

    /// Configuration file location for this process, honouring `DUTIL_CONFIG`.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        Self::resolve_path(explicit, std::env::var_os(CONFIG_ENV_VAR))
    }

    /// Load the configuration at `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load the configuration from its resolved location.
    pub fn load() -> Result<Self> {
        Self::load_or_default(&Self::locate(None)?)
    }

    /// Load the configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this schema. Parse failures carry a [`DutilError::ConfigError`].
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| DutilError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;
        if config.lock_timeout_secs == 0 {
            return Err(DutilError::ConfigError {
                message: format!("{}: lock_timeout_secs must be at least 1", path.display()),
            }
            .into());
        }
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Hive file for a configuration loaded from `config_path`.
    #[must_use]
    pub fn hive_path(&self, config_path: &Path) -> PathBuf {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        match &self.hive_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base.join(path),
            None => base.join(DEFAULT_HIVE_FILE),
        }
    }

    /// How long to wait for the hive lock.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Open the hive this configuration points at.
    #[must_use]
    pub fn open_hive(&self, config_path: &Path) -> FileHive {
        FileHive::new(self.hive_path(config_path)).with_lock_timeout(self.lock_timeout())
    }
}
