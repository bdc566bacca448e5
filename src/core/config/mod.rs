//! core::config
//!
//! Persisted profile configuration and its bootstrap policy.
//!
//! # Overview
//!
//! All profiles live in a single TOML file, `<config-dir>/config.toml`
//! (see [`crate::core::paths`] for how the directory is chosen). The
//! [`ConfigStore`] owns that file:
//!
//! - [`ConfigStore::load`] distinguishes "no file yet" (`Ok(None)`) from real
//!   read failures
//! - [`ConfigStore::save`] checks the default selection, then writes atomically
//! - [`ConfigStore::bootstrap`] creates or merges the demo profile and runs
//!   once per process before any command body
//!
//! # Bootstrap Policy
//!
//! - No file: write a configuration holding only `demo`, selected as default.
//! - File with `demo`: reset its endpoint and credentials, touch nothing else.
//! - File without `demo`: insert it and select it as default.
//!
//! User-created profiles and unknown keys survive every bootstrap unchanged.
//! Their names and endpoints are validated when they are added, not on every
//! write, so an entry that a newer rule would reject still loads, and can
//! still be removed or replaced.
//!
//! # Concurrency
//!
//! There is no inter-process lock. Two processes bootstrapping at the same
//! moment each write a complete file; the last rename wins.
//!
//! # Example
//!
//! ```no_run
//! use pb_cli::core::config::ConfigStore;
//!
//! let store = ConfigStore::new("/home/me/.config/pb/config.toml");
//! let config = store.bootstrap().unwrap();
//! println!("default profile: {:?}", config.default_profile());
//! ```

pub mod schema;

pub use schema::{Configuration, Profile, DEMO_PROFILE};

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use thiserror::Error;
use tracing::debug;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    SerializeError(String),

    #[error("invalid profile name '{name}': {reason}")]
    InvalidProfileName { name: String, reason: String },

    #[error("invalid url '{url}' for profile '{profile}': {reason}")]
    InvalidUrl {
        profile: String,
        url: String,
        reason: String,
    },

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("default profile '{0}' does not exist; edit the config file or run 'pb profile default <name>'")]
    DefaultProfileMissing(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Reads and writes the profile configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration.
    ///
    /// Returns `Ok(None)` when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// - `ReadError` for any I/O failure other than absence
    /// - `ParseError` for malformed TOML
    /// - `DefaultProfileMissing` when the default names a missing profile
    pub fn load(&self) -> Result<Option<Configuration>, ConfigError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let config: Configuration =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        config.check_default()?;
        Ok(Some(config))
    }

    /// Persist the configuration.
    ///
    /// Only the default selection is checked here; individual profiles are
    /// validated by the mutations that add them. The write goes to a temporary file in the same directory which is
    /// synced and then renamed over the target, so a failure leaves the
    /// previous file intact. On Unix the file is created with mode 0600.
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        config.check_default()?;

        let contents = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        self.write_atomic(contents.as_bytes())
    }

    /// Create or merge the configuration so the demo profile is current.
    ///
    /// Returns the configuration as persisted.
    pub fn bootstrap(&self) -> Result<Configuration, ConfigError> {
        let config = match self.load()? {
            None => {
                debug!(path = %self.path.display(), "no configuration found, creating");
                Configuration::initial()
            }
            Some(mut existing) => {
                existing.refresh_demo();
                existing
            }
        };

        self.save(&config)?;
        Ok(config)
    }

    /// Load, apply a mutation, and persist.
    ///
    /// Starts from an empty configuration when no file exists. Nothing is
    /// written if `mutate` fails.
    pub fn update<T, F>(&self, mutate: F) -> Result<(Configuration, T), ConfigError>
    where
        F: FnOnce(&mut Configuration) -> Result<T, ConfigError>,
    {
        let mut config = self.load()?.unwrap_or_default();
        let value = mutate(&mut config)?;
        self.save(&config)?;
        Ok((config, value))
    }

    fn write_atomic(&self, contents: &[u8]) -> Result<(), ConfigError> {
        let write_err = |path: &Path, source: io::Error| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
            }
        }

        let temp_path = self.path.with_extension("toml.tmp");
        let result = (|| {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            options.mode(0o600);

            let mut file = options.open(&temp_path)?;
            file.write_all(contents)?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(&self.path, e));
        }

        Ok(())
    }
}
