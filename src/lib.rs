//! pb - command line client for Parseable
//!
//! pb manages named server profiles and runs stream, user, role and query
//! commands against the selected server. Every command passes through the
//! same lifecycle: bootstrap the profile configuration, establish the session
//! identity, resolve the target profile, run, then dispatch best-effort usage
//! telemetry that the process waits on once before exiting.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, runs the lifecycle)
//! - [`engine`] - Per-command lifecycle, profile resolution and [`engine::Context`]
//! - [`core`] - Configuration and session files and where they live
//! - [`telemetry`] - Fire-and-forget usage events and the shutdown barrier
//! - [`client`] - HTTP client for the Parseable server API
//! - [`ui`] - User interaction utilities
//! - [`logging`] - Diagnostic logging on stderr
//!
//! # Correctness Invariants
//!
//! 1. The demo profile exists after any successful bootstrap
//! 2. User-created profiles survive every bootstrap unchanged
//! 3. No command body runs against an unresolved profile
//! 4. Telemetry never blocks a command and never changes its exit code

pub mod cli;
pub mod client;
pub mod core;
pub mod engine;
pub mod logging;
pub mod telemetry;
pub mod ui;
