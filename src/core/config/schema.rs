//! core::config::schema
//!
//! Persisted configuration types.
//!
//! # Layout
//!
//! ```toml
//! default_profile = "demo"
//!
//! [profiles.demo]
//! url = "https://demo.parseable.com"
//! username = "admin"
//! password = "admin"
//! ```
//!
//! # Forward Compatibility
//!
//! Keys this version does not know about are captured in `extra` maps, both
//! at the top level and inside each profile, and are written back unchanged.
//! A newer client can add fields without an older one erasing them.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Name of the reserved profile refreshed on every bootstrap.
pub const DEMO_PROFILE: &str = "demo";

/// Well-known endpoint of the public demo server.
pub const DEMO_URL: &str = "https://demo.parseable.com";

/// Well-known demo credentials.
pub const DEMO_USERNAME: &str = "admin";
pub const DEMO_PASSWORD: &str = "admin";

const MAX_PROFILE_NAME_LEN: usize = 64;

/// One named remote target.
///
/// The name is the key under `[profiles]` and is not repeated inside the
/// table.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    /// Server endpoint.
    pub url: String,

    /// Basic-auth username.
    #[serde(default)]
    pub username: String,

    /// Basic-auth password.
    #[serde(default)]
    pub password: String,

    /// Keys not understood by this version.
    #[serde(flatten)]
    pub extra: toml::Table,
}

// Custom Debug to keep the password out of logs
impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("has_password", &!self.password.is_empty())
            .field("extra_keys", &self.extra.len())
            .finish()
    }
}

impl Profile {
    /// Create a profile with no extra keys.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            extra: toml::Table::new(),
        }
    }

    /// The well-known demo profile.
    pub fn demo() -> Self {
        Self::new(DEMO_URL, DEMO_USERNAME, DEMO_PASSWORD)
    }

    /// Reset endpoint and credentials to the demo values, keeping extra keys.
    fn refresh_demo(&mut self) {
        self.url = DEMO_URL.to_string();
        self.username = DEMO_USERNAME.to_string();
        self.password = DEMO_PASSWORD.to_string();
    }

    /// Parse the endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` unless the URL is absolute, uses
    /// `http` or `https`, and names a host.
    pub fn endpoint(&self, name: &str) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUrl {
            profile: name.to_string(),
            url: self.url.clone(),
            reason,
        };

        let url = Url::parse(&self.url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "unsupported scheme '{}', expected http or https",
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        Ok(url)
    }
}

/// Validate a profile name.
///
/// Names are 1 to 64 characters of ASCII alphanumerics, `-`, `_` and `.`.
pub fn validate_profile_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidProfileName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.len() > MAX_PROFILE_NAME_LEN {
        return Err(invalid("name is longer than 64 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid(
            "only ASCII letters, digits, '-', '_' and '.' are allowed",
        ));
    }
    Ok(())
}

/// The full persisted state: every profile plus the default selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    /// Name of the profile used when none is requested. Empty means unset.
    #[serde(default)]
    pub default_profile: String,

    /// Profiles keyed by name.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,

    /// Top-level keys not understood by this version.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Configuration {
    /// First-run configuration: only the demo profile, selected as default.
    pub fn initial() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEMO_PROFILE.to_string(), Profile::demo());
        Self {
            default_profile: DEMO_PROFILE.to_string(),
            profiles,
            extra: toml::Table::new(),
        }
    }

    /// Merge the demo profile into an existing configuration.
    ///
    /// An existing demo entry gets its endpoint and credentials reset. A
    /// missing one is inserted and becomes the default. Nothing else changes.
    pub fn refresh_demo(&mut self) {
        match self.profiles.get_mut(DEMO_PROFILE) {
            Some(demo) => demo.refresh_demo(),
            None => {
                self.profiles
                    .insert(DEMO_PROFILE.to_string(), Profile::demo());
                self.default_profile = DEMO_PROFILE.to_string();
            }
        }
    }

    /// The default profile name, if one is set.
    pub fn default_profile(&self) -> Option<&str> {
        if self.default_profile.is_empty() {
            None
        } else {
            Some(&self.default_profile)
        }
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Check that a non-empty default references an existing profile.
    pub fn check_default(&self) -> Result<(), ConfigError> {
        match self.default_profile() {
            Some(name) if !self.profiles.contains_key(name) => {
                Err(ConfigError::DefaultProfileMissing(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Insert or replace a profile.
    ///
    /// The profile becomes the default when no default is set.
    pub fn add_profile(&mut self, name: &str, profile: Profile) -> Result<(), ConfigError> {
        validate_profile_name(name)?;
        profile.endpoint(name)?;
        self.profiles.insert(name.to_string(), profile);
        if self.default_profile.is_empty() {
            self.default_profile = name.to_string();
        }
        Ok(())
    }

    /// Remove a profile, clearing the default if it pointed there.
    pub fn remove_profile(&mut self, name: &str) -> Result<Profile, ConfigError> {
        let removed = self
            .profiles
            .remove(name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;
        if self.default_profile == name {
            self.default_profile.clear();
        }
        Ok(removed)
    }

    /// Select the default profile.
    pub fn set_default_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.profiles.contains_key(name) {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }
        self.default_profile = name.to_string();
        Ok(())
    }
}
