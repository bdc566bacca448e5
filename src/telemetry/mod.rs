//! telemetry
//!
//! Best-effort, fire-and-forget usage telemetry.
//!
//! # Architecture
//!
//! ```text
//! post-run hook -> dispatch(task) -> JoinSet (tokio) -> sink.emit(event)
//!                                        ^
//! process exit  -> await_all() ----------+
//! ```
//!
//! - [`TelemetryCoordinator::dispatch`] returns immediately; the emission
//!   runs on the tokio runtime.
//! - [`TelemetryCoordinator::await_all`] is the shutdown barrier. It waits
//!   for the tasks dispatched before it was called, and only those.
//! - `PB_ANALYTICS=disable` turns dispatch into a no-op.
//!
//! # Invariants
//!
//! - A failing or panicking task never reaches the command's result
//! - The main path blocks on telemetry only inside `await_all`
//! - Tasks share nothing mutable with the command body

pub mod sink;

pub use sink::{DiscardSink, HttpTelemetrySink, TelemetryError, TelemetrySink};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::core::session::SessionId;

/// Environment variable controlling telemetry.
pub const ANALYTICS_ENV: &str = "PB_ANALYTICS";

/// Value of [`ANALYTICS_ENV`] that disables telemetry.
pub const ANALYTICS_DISABLED: &str = "disable";

/// Whether an `PB_ANALYTICS` value opts out.
pub fn is_opt_out(value: Option<&str>) -> bool {
    value == Some(ANALYTICS_DISABLED)
}

/// Snapshot of one command invocation, taken at post-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryTask {
    /// Command group, e.g. `stream`.
    pub category: String,
    /// Leaf command name, e.g. `list`.
    pub command: String,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Session identity, when pre-run got far enough to establish it.
    pub session: Option<SessionId>,
}

/// Wire form of a telemetry task.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub session_id: Option<SessionId>,
    pub category: String,
    pub command: String,
    pub args: Vec<String>,
    pub cli_version: String,
    pub os: String,
    pub arch: String,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryEvent {
    /// Build the event for a task, stamped now.
    pub fn from_task(task: TelemetryTask) -> Self {
        Self {
            session_id: task.session,
            category: task.category,
            command: task.command,
            args: task.args,
            cli_version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Tracks in-flight telemetry tasks and provides the shutdown barrier.
pub struct TelemetryCoordinator {
    handle: Handle,
    sink: Arc<dyn TelemetrySink>,
    enabled: bool,
    shutdown_timeout: Option<Duration>,
    in_flight: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for TelemetryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryCoordinator")
            .field("enabled", &self.enabled)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl TelemetryCoordinator {
    /// Create an enabled coordinator spawning onto `handle`.
    pub fn new(handle: Handle, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            handle,
            sink,
            enabled: true,
            shutdown_timeout: None,
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    /// Create a coordinator honoring `PB_ANALYTICS`, read once here.
    pub fn from_env(handle: Handle, sink: Arc<dyn TelemetrySink>) -> Self {
        let value = std::env::var(ANALYTICS_ENV).ok();
        Self::new(handle, sink).enabled(!is_opt_out(value.as_deref()))
    }

    /// Enable or disable dispatch.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Bound the wait in [`await_all`](Self::await_all).
    ///
    /// Tasks still running when the limit expires are aborted.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Whether dispatch emits anything.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of dispatched tasks not yet collected by `await_all`.
    pub fn in_flight(&self) -> usize {
        self.lock_in_flight().len()
    }

    /// Spawn emission of `task` and register it with the barrier.
    ///
    /// Returns immediately. A no-op when telemetry is disabled.
    pub fn dispatch(&self, task: TelemetryTask) {
        if !self.enabled {
            trace!(command = %task.command, "telemetry disabled, skipping");
            return;
        }

        let sink = Arc::clone(&self.sink);
        let mut in_flight = self.lock_in_flight();
        in_flight.spawn_on(
            async move {
                let event = TelemetryEvent::from_task(task);
                if let Err(err) = sink.emit(&event).await {
                    debug!(
                        error = %err,
                        category = %event.category,
                        command = %event.command,
                        "telemetry emit failed"
                    );
                }
            },
            &self.handle,
        );
    }

    /// Wait for every task dispatched before this call.
    ///
    /// Tasks dispatched while waiting belong to the next call. Returns the
    /// number of tasks that finished, successfully or not.
    ///
    /// Must be called from outside the runtime, once the command's result has
    /// been produced.
    pub fn await_all(&self) -> usize {
        let mut pending = std::mem::take(&mut *self.lock_in_flight());
        if pending.is_empty() {
            return 0;
        }

        let timeout = self.shutdown_timeout;
        self.handle.block_on(async move {
            let mut finished = 0usize;
            let drain = async {
                while let Some(result) = pending.join_next().await {
                    finished += 1;
                    if let Err(err) = result {
                        debug!(error = %err, "telemetry task did not complete");
                    }
                }
            };

            match timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, drain).await.is_err() {
                        warn!(?limit, "telemetry still running at shutdown, abandoning");
                    }
                }
                None => drain.await,
            }

            finished
        })
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
