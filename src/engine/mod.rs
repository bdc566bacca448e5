//! engine
//!
//! Orchestrates the per-command lifecycle: PreRun -> Executing -> PostRun.
//!
//! # Architecture
//!
//! Every command handed to the engine passes through the same middleware:
//!
//! 1. **Bootstrap**: create or merge the profile configuration
//! 2. **Session**: make sure the anonymous session identity exists
//! 3. **Resolve**: pick the target profile (only for commands that need one)
//! 4. **Execute**: run the command body with the resolved profile
//! 5. **Telemetry**: dispatch one background task describing the command
//!
//! The body never runs if any of steps 1-3 fail. Step 5 runs whether the body
//! succeeded or not, and never changes the command's result.
//!
//! # Process-wide State
//!
//! There are no globals. Everything a command needs is reached through the
//! explicitly constructed [`Context`], so tests can point it at a temporary
//! directory and a stub telemetry sink.

pub mod lifecycle;
pub mod resolve;

pub use lifecycle::{
    BootstrapConfig, Category, DispatchTelemetry, EnsureSession, Invocation, Lifecycle,
    LifecycleError, Outcome, Phase, PostHook, PreHook, ResolveProfile,
};
pub use resolve::{resolve, ProfileError, ProfileResolver, ResolveError, ResolvedProfile};

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::core::config::ConfigStore;
use crate::core::paths::PbPaths;
use crate::core::session::SessionStore;
use crate::telemetry::TelemetryCoordinator;
use crate::ui::output::Verbosity;

/// Execution context shared by every layer of a single process.
#[derive(Debug, Clone)]
pub struct Context {
    /// Where configuration and session state live.
    pub paths: PbPaths,
    /// Profile requested via `--profile` or `$PB_PROFILE`.
    pub requested_profile: Option<String>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Interactive prompts allowed.
    pub interactive: bool,
    /// Runtime used for network I/O and telemetry.
    pub runtime: Handle,
    /// Background telemetry barrier.
    pub telemetry: Arc<TelemetryCoordinator>,
}

impl Context {
    /// Create a non-interactive, non-debug context.
    pub fn new(paths: PbPaths, runtime: Handle, telemetry: Arc<TelemetryCoordinator>) -> Self {
        Self {
            paths,
            requested_profile: None,
            debug: false,
            quiet: false,
            interactive: false,
            runtime,
            telemetry,
        }
    }

    /// Output verbosity derived from the flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Store for `config.toml`.
    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::new(self.paths.config_file())
    }

    /// Store for `session.toml`.
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.paths.session_file())
    }

    /// Drive a future to completion on the context's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
