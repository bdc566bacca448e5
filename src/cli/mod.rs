//! cli
//!
//! Command-line interface layer for pb.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Build the process [`Context`]: paths, runtime, telemetry
//! - Hand every command to the [`Lifecycle`] and wait on telemetry once
//!
//! # Exit Codes
//!
//! `0` when the command succeeded, `1` for any error. The error is printed
//! once on stderr. Telemetry never changes the exit code.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::core::paths::PbPaths;
use crate::engine::{Context, Lifecycle};
use crate::logging;
use crate::telemetry::{DiscardSink, HttpTelemetrySink, TelemetryCoordinator, TelemetrySink};
use crate::ui::output;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.debug);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let runtime = Runtime::new().context("failed to start async runtime")?;
    let paths = PbPaths::resolve(cli.config_dir.as_deref())?;
    debug!(config_dir = %paths.config_dir().display(), "using configuration directory");

    let telemetry = Arc::new(TelemetryCoordinator::from_env(
        runtime.handle().clone(),
        telemetry_sink(),
    ));

    let mut ctx = Context::new(paths, runtime.handle().clone(), Arc::clone(&telemetry));
    ctx.requested_profile = cli.profile.clone();
    ctx.debug = cli.debug;
    ctx.quiet = cli.quiet;
    ctx.interactive = cli.interactive();

    let result = commands::dispatch(cli.command, &ctx, &Lifecycle::standard());

    let finished = telemetry.await_all();
    debug!(finished, "telemetry drained");
    result
}

fn telemetry_sink() -> Arc<dyn TelemetrySink> {
    match HttpTelemetrySink::from_env() {
        Ok(sink) => Arc::new(sink),
        Err(err) => {
            debug!(error = %err, "telemetry sink unavailable, discarding events");
            Arc::new(DiscardSink)
        }
    }
}
