//! core::paths
//!
//! Centralized path routing for pb's on-disk state.
//!
//! # Storage Layout
//!
//! Everything lives under a single config directory:
//! - `config.toml` - Profiles and the default selection
//! - `session.toml` - Anonymous session identity
//!
//! # Directory Resolution
//!
//! Searched in order:
//! 1. `--config-dir <path>` flag
//! 2. `$PB_CONFIG_DIR`
//! 3. `$XDG_CONFIG_HOME/pb`
//! 4. `~/.config/pb`
//!
//! # Example
//!
//! ```
//! use pb_cli::core::paths::PbPaths;
//! use std::path::PathBuf;
//!
//! let paths = PbPaths::new(PathBuf::from("/tmp/pb"));
//! assert_eq!(paths.config_file(), PathBuf::from("/tmp/pb/config.toml"));
//! ```

use std::path::{Path, PathBuf};

use super::config::ConfigError;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "PB_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.toml";

/// Locations of pb's persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbPaths {
    config_dir: PathBuf,
}

impl PbPaths {
    /// Use an explicit config directory.
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Resolve the config directory from the flag override and environment.
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self, ConfigError> {
        Self::resolve_with(override_dir, |key| std::env::var_os(key).map(PathBuf::from))
    }

    /// Resolve with an injectable environment lookup.
    pub fn resolve_with<F>(override_dir: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        if let Some(dir) = override_dir {
            return Ok(Self::new(dir.to_path_buf()));
        }

        if let Some(dir) = env(CONFIG_DIR_ENV).filter(|p| !p.as_os_str().is_empty()) {
            return Ok(Self::new(dir));
        }

        if let Some(xdg) = env("XDG_CONFIG_HOME").filter(|p| !p.as_os_str().is_empty()) {
            return Ok(Self::new(xdg.join("pb")));
        }

        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::new(home.join(".config").join("pb")))
    }

    /// The config directory itself.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path to `config.toml`.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Path to `session.toml`.
    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join(SESSION_FILE)
    }
}
