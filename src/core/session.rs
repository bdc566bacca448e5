//! core::session
//!
//! Anonymous session identity used to correlate telemetry events.
//!
//! The identity is a random UUID written once to `session.toml` and read on
//! every later invocation. It is never regenerated: if the file exists but
//! cannot be parsed, that is an error rather than a reason to overwrite it.
//! An empty file is the exception; it can only be a creation that never
//! finished, and is treated as absent.
//!
//! The record is written to a private temporary file and hard-linked into
//! place, so the final path never holds a partial record.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Errors from session identity storage.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file '{path}': {source}")]
    ReadError { path: PathBuf, source: io::Error },

    #[error("failed to parse session file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write session file '{path}': {source}")]
    WriteError { path: PathBuf, source: io::Error },
}

/// A process-durable anonymous identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    id: SessionId,
    created_at: DateTime<Utc>,
}

/// Reads and creates the session identity file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the identity if it exists.
    ///
    /// An empty file reads as `None`.
    pub fn load(&self) -> Result<Option<SessionId>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::ReadError {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }

        let record: SessionRecord =
            toml::from_str(&contents).map_err(|e| SessionError::ParseError {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        Ok(Some(record.id))
    }

    /// Return the stored identity, creating it on first use.
    ///
    /// A concurrent process that links its record first wins and its
    /// identity is returned.
    pub fn ensure(&self) -> Result<SessionId, SessionError> {
        if let Some(id) = self.load()? {
            return Ok(id);
        }

        let write_err = |source: io::Error| SessionError::WriteError {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let record = SessionRecord {
            id: SessionId::generate(),
            created_at: Utc::now(),
        };
        let contents = toml::to_string(&record).map_err(|e| SessionError::ParseError {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let temp_path = self.path.with_extension(format!("toml.{}.tmp", record.id));
        let result = self.install(&temp_path, contents.as_bytes(), record.id);
        let _ = fs::remove_file(&temp_path);
        result
    }

    fn install(
        &self,
        temp_path: &Path,
        contents: &[u8],
        id: SessionId,
    ) -> Result<SessionId, SessionError> {
        let write_err = |source: io::Error| SessionError::WriteError {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp_path)
            .map_err(write_err)?;
        file.write_all(contents).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        match fs::hard_link(temp_path, &self.path) {
            Ok(()) => {
                debug!(session = %id, "created session identity");
                Ok(id)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => match self.load()? {
                Some(existing) => Ok(existing),
                None => {
                    // Empty leftover from an interrupted creation.
                    fs::rename(temp_path, &self.path).map_err(write_err)?;
                    debug!(session = %id, "replaced empty session file");
                    Ok(id)
                }
            },
            Err(e) => Err(write_err(e)),
        }
    }
}
