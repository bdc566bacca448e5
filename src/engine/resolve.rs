//! engine::resolve
//!
//! Profile resolution: which remote target a command runs against.
//!
//! # Rules
//!
//! - A requested name (from `--profile` or `$PB_PROFILE`) must exist.
//! - Otherwise the configuration's default is used; it must be set and must
//!   exist.
//!
//! Resolution is read-only. The lifecycle runs bootstrap first, so the
//! configuration handed in here is always initialized.

use thiserror::Error;

use crate::core::config::{ConfigError, ConfigStore, Configuration, Profile};

/// Errors from profile resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// An explicitly requested profile does not exist.
    #[error("profile '{0}' not found; run 'pb profile list' to see configured profiles")]
    ProfileNotFound(String),

    /// No profile was requested and no default is set.
    #[error("no default profile is set; pass --profile <name> or run 'pb profile default <name>'")]
    NoDefaultProfile,

    /// The default names a profile that no longer exists.
    #[error("default profile '{0}' does not exist in the configuration")]
    DefaultProfileMissing(String),
}

/// A profile together with the name it was resolved under.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub name: String,
    pub profile: Profile,
}

/// Resolve the active profile from an already-loaded configuration.
pub fn resolve(
    config: &Configuration,
    requested: Option<&str>,
) -> Result<ResolvedProfile, ResolveError> {
    let name = match requested {
        Some(name) => {
            if !config.profiles.contains_key(name) {
                return Err(ResolveError::ProfileNotFound(name.to_string()));
            }
            name
        }
        None => {
            let name = config
                .default_profile()
                .ok_or(ResolveError::NoDefaultProfile)?;
            if !config.profiles.contains_key(name) {
                return Err(ResolveError::DefaultProfileMissing(name.to_string()));
            }
            name
        }
    };

    Ok(ResolvedProfile {
        name: name.to_string(),
        profile: config.profiles[name].clone(),
    })
}

/// Errors from bootstrap-then-resolve.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Bootstraps the store, then resolves against the result.
#[derive(Debug, Clone)]
pub struct ProfileResolver {
    store: ConfigStore,
}

impl ProfileResolver {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Resolve `requested` (or the default) after bootstrapping.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ResolvedProfile, ProfileError> {
        let config = self.store.bootstrap()?;
        Ok(resolve(&config, requested)?)
    }
}
