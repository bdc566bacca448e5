//! core
//!
//! Persisted state for pb: profiles, paths, and session identity.
//!
//! # Modules
//!
//! - [`config`] - Profile configuration schema, storage, and bootstrap
//! - [`paths`] - Centralized path routing for the config directory
//! - [`session`] - Anonymous session identity for telemetry correlation
//!
//! # Design Principles
//!
//! - Every write is atomic or create-exclusive
//! - A missing file is a normal first-run state, never an error
//! - Unknown keys written by newer clients are preserved

pub mod config;
pub mod paths;
pub mod session;
