//! engine::lifecycle
//!
//! Per-command lifecycle with explicit pre- and post-hooks.
//!
//! # State Machine
//!
//! ```text
//! PreRun --ok--> Executing --> PostRun --> Done
//!   |                |
//!   +--err--> Failed <+-- (body error, after PostRun)
//! ```
//!
//! - A pre-hook error stops the chain: no body, no post-hooks.
//! - Post-hooks always run once the body has run, and cannot fail.
//! - The returned result is the body's result (or the pre-hook error).
//!   [`Lifecycle::run_to_end`] also returns the terminal phase.
//!
//! # Example
//!
//! ```ignore
//! use pb_cli::engine::{Category, Invocation, Lifecycle};
//!
//! let invocation = Invocation::new(Category::Stream, "list").requiring_profile();
//! Lifecycle::standard().run(&ctx, invocation, |ctx, inv| {
//!     let target = inv.target()?;
//!     println!("listing streams on {}", target.profile.url);
//!     Ok(())
//! })?;
//! ```

use std::fmt;

use thiserror::Error;
use tracing::debug;

use super::resolve::{resolve, ResolveError, ResolvedProfile};
use super::Context;
use crate::core::config::{ConfigError, Configuration};
use crate::core::session::{SessionError, SessionId};
use crate::telemetry::TelemetryTask;

/// Errors raised before the command body runs.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("error initializing configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("error creating session identity: {0}")]
    Session(#[from] SessionError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{hook}: {message}")]
    Hook { hook: &'static str, message: String },
}

/// Lifecycle state of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreRun,
    Executing,
    PostRun,
    Done,
    Failed,
}

/// Outcome of the command body as seen by post-hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

/// Command group, reported as the telemetry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Root-level commands (`version`, `completion`).
    Cli,
    Profile,
    Stream,
    User,
    Role,
    Query,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cli => "cli",
            Category::Profile => "profile",
            Category::Stream => "stream",
            Category::User => "user",
            Category::Role => "role",
            Category::Query => "query",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One command invocation moving through the lifecycle.
///
/// The descriptor fields are set by the dispatcher; `config`, `session` and
/// `profile` are filled in by pre-hooks.
#[derive(Debug, Clone)]
pub struct Invocation {
    category: Category,
    command: String,
    args: Vec<String>,
    requires_profile: bool,
    phase: Phase,
    config: Option<Configuration>,
    session: Option<SessionId>,
    profile: Option<ResolvedProfile>,
}

impl Invocation {
    pub fn new(category: Category, command: impl Into<String>) -> Self {
        Self {
            category,
            command: command.into(),
            args: Vec::new(),
            requires_profile: false,
            phase: Phase::PreRun,
            config: None,
            session: None,
            profile: None,
        }
    }

    /// Positional arguments recorded for telemetry.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the command as needing a resolved target profile.
    pub fn requiring_profile(mut self) -> Self {
        self.requires_profile = true;
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn requires_profile(&self) -> bool {
        self.requires_profile
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Configuration as left by bootstrap.
    pub fn config(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn profile(&self) -> Option<&ResolvedProfile> {
        self.profile.as_ref()
    }

    /// The resolved profile, for bodies that declared they need one.
    pub fn target(&self) -> anyhow::Result<&ResolvedProfile> {
        self.profile
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("command '{}' ran without a resolved profile", self.command))
    }

    pub fn set_config(&mut self, config: Configuration) {
        self.config = Some(config);
    }

    pub fn set_session(&mut self, session: SessionId) {
        self.session = Some(session);
    }

    pub fn set_profile(&mut self, profile: ResolvedProfile) {
        self.profile = Some(profile);
    }

    /// Snapshot for the telemetry post-hook.
    pub fn telemetry_task(&self) -> TelemetryTask {
        TelemetryTask {
            category: self.category.as_str().to_string(),
            command: self.command.clone(),
            args: self.args.clone(),
            session: self.session,
        }
    }
}

/// Runs before the command body. An error aborts the invocation.
pub trait PreHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn before(&self, ctx: &Context, invocation: &mut Invocation) -> Result<(), LifecycleError>;
}

/// Runs after the command body, whatever its outcome.
pub trait PostHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn after(&self, ctx: &Context, invocation: &Invocation, outcome: Outcome);
}

/// Pre-hook: create or merge the configuration file.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapConfig;

impl PreHook for BootstrapConfig {
    fn name(&self) -> &'static str {
        "bootstrap"
    }

    fn before(&self, ctx: &Context, invocation: &mut Invocation) -> Result<(), LifecycleError> {
        let config = ctx.config_store().bootstrap()?;
        invocation.set_config(config);
        Ok(())
    }
}

/// Pre-hook: create the session identity on first use.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureSession;

impl PreHook for EnsureSession {
    fn name(&self) -> &'static str {
        "session"
    }

    fn before(&self, ctx: &Context, invocation: &mut Invocation) -> Result<(), LifecycleError> {
        let session = ctx.session_store().ensure()?;
        invocation.set_session(session);
        Ok(())
    }
}

/// Pre-hook: resolve the target profile for commands that need one.
///
/// Uses the configuration left by [`BootstrapConfig`], bootstrapping itself
/// if that hook is not installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveProfile;

impl PreHook for ResolveProfile {
    fn name(&self) -> &'static str {
        "resolve"
    }

    fn before(&self, ctx: &Context, invocation: &mut Invocation) -> Result<(), LifecycleError> {
        if !invocation.requires_profile() {
            return Ok(());
        }

        let config = match invocation.config.take() {
            Some(config) => config,
            None => ctx.config_store().bootstrap()?,
        };
        let resolved = resolve(&config, ctx.requested_profile.as_deref());
        invocation.set_config(config);

        let resolved = resolved?;
        debug!(profile = %resolved.name, url = %resolved.profile.url, "resolved profile");
        invocation.set_profile(resolved);
        Ok(())
    }
}

/// Post-hook: dispatch one telemetry task.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchTelemetry;

impl PostHook for DispatchTelemetry {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn after(&self, ctx: &Context, invocation: &Invocation, _outcome: Outcome) {
        ctx.telemetry.dispatch(invocation.telemetry_task());
    }
}

/// Ordered pre- and post-hooks wrapped around every command body.
#[derive(Default)]
pub struct Lifecycle {
    pre_hooks: Vec<Box<dyn PreHook>>,
    post_hooks: Vec<Box<dyn PostHook>>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field(
                "pre_hooks",
                &self.pre_hooks.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .field(
                "post_hooks",
                &self.post_hooks.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Lifecycle {
    /// A lifecycle with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bootstrap, session, resolve; then telemetry.
    pub fn standard() -> Self {
        Self::new()
            .with_pre_hook(BootstrapConfig)
            .with_pre_hook(EnsureSession)
            .with_pre_hook(ResolveProfile)
            .with_post_hook(DispatchTelemetry)
    }

    pub fn with_pre_hook(mut self, hook: impl PreHook + 'static) -> Self {
        self.pre_hooks.push(Box::new(hook));
        self
    }

    pub fn with_post_hook(mut self, hook: impl PostHook + 'static) -> Self {
        self.post_hooks.push(Box::new(hook));
        self
    }

    /// Run `body` inside the lifecycle.
    pub fn run<T, F>(&self, ctx: &Context, invocation: Invocation, body: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Context, &Invocation) -> anyhow::Result<T>,
    {
        self.run_to_end(ctx, invocation, body).1
    }

    /// Run `body` inside the lifecycle and report the terminal phase,
    /// `Done` or `Failed`, alongside its result.
    pub fn run_to_end<T, F>(
        &self,
        ctx: &Context,
        mut invocation: Invocation,
        body: F,
    ) -> (Phase, anyhow::Result<T>)
    where
        F: FnOnce(&Context, &Invocation) -> anyhow::Result<T>,
    {
        invocation.phase = Phase::PreRun;
        for hook in &self.pre_hooks {
            if let Err(err) = hook.before(ctx, &mut invocation) {
                debug!(hook = hook.name(), error = %err, "pre-run failed");
                return (Phase::Failed, Err(err.into()));
            }
        }

        invocation.phase = Phase::Executing;
        debug!(
            category = %invocation.category,
            command = %invocation.command,
            "executing"
        );
        let result = body(ctx, &invocation);

        invocation.phase = Phase::PostRun;
        let outcome = if result.is_ok() {
            Outcome::Succeeded
        } else {
            Outcome::Failed
        };
        for hook in &self.post_hooks {
            hook.after(ctx, &invocation, outcome);
        }

        let terminal = match outcome {
            Outcome::Succeeded => Phase::Done,
            Outcome::Failed => Phase::Failed,
        };
        (terminal, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Profile, DEMO_PROFILE};
    use crate::core::paths::PbPaths;
    use crate::telemetry::{TelemetryCoordinator, TelemetryError, TelemetryEvent, TelemetrySink};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::runtime::Runtime;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    #[async_trait]
    impl TelemetrySink for RecordingSink {
        async fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    /// Records the phase each hook observed.
    #[derive(Clone, Default)]
    struct Trace(Arc<Mutex<Vec<String>>>);

    impl Trace {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct TracePre(Trace);

    impl PreHook for TracePre {
        fn name(&self) -> &'static str {
            "trace-pre"
        }

        fn before(&self, _ctx: &Context, inv: &mut Invocation) -> Result<(), LifecycleError> {
            self.0.push(format!("pre:{:?}", inv.phase()));
            Ok(())
        }
    }

    struct FailingPre;

    impl PreHook for FailingPre {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn before(&self, _ctx: &Context, _inv: &mut Invocation) -> Result<(), LifecycleError> {
            Err(LifecycleError::Hook {
                hook: "failing",
                message: "refused".to_string(),
            })
        }
    }

    struct TracePost(Trace);

    impl PostHook for TracePost {
        fn name(&self) -> &'static str {
            "trace-post"
        }

        fn after(&self, _ctx: &Context, inv: &Invocation, outcome: Outcome) {
            self.0.push(format!("post:{:?}:{:?}", inv.phase(), outcome));
        }
    }

    struct Harness {
        _temp: TempDir,
        rt: Runtime,
        sink: Arc<RecordingSink>,
        ctx: Context,
    }

    impl Harness {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let rt = Runtime::new().unwrap();
            let sink = Arc::new(RecordingSink::default());
            let telemetry = Arc::new(TelemetryCoordinator::new(
                rt.handle().clone(),
                sink.clone(),
            ));
            let ctx = Context::new(
                PbPaths::new(temp.path().to_path_buf()),
                rt.handle().clone(),
                telemetry,
            );
            Self {
                _temp: temp,
                rt,
                sink,
                ctx,
            }
        }

        fn events(&self) -> Vec<TelemetryEvent> {
            self.ctx.telemetry.await_all();
            self.sink.events.lock().unwrap().clone()
        }
    }

    #[test]
    fn hooks_run_in_order() {
        let h = Harness::new();
        let trace = Trace::default();
        let lifecycle = Lifecycle::new()
            .with_pre_hook(TracePre(trace.clone()))
            .with_post_hook(TracePost(trace.clone()));

        let body_trace = trace.clone();
        lifecycle
            .run(&h.ctx, Invocation::new(Category::Cli, "version"), |_, inv| {
                body_trace.push(format!("body:{:?}", inv.phase()));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            trace.entries(),
            vec![
                "pre:PreRun".to_string(),
                "body:Executing".to_string(),
                "post:PostRun:Succeeded".to_string(),
            ]
        );
    }

    #[test]
    fn pre_run_failure_skips_body_and_post() {
        let h = Harness::new();
        let trace = Trace::default();
        let lifecycle = Lifecycle::new()
            .with_pre_hook(FailingPre)
            .with_post_hook(TracePost(trace.clone()));

        let mut body_ran = false;
        let result = lifecycle.run(&h.ctx, Invocation::new(Category::Cli, "x"), |_, _| {
            body_ran = true;
            Ok(())
        });

        assert!(result.is_err());
        assert!(!body_ran);
        assert!(trace.entries().is_empty());
    }

    #[test]
    fn body_failure_still_runs_post_hooks() {
        let h = Harness::new();
        let trace = Trace::default();
        let lifecycle = Lifecycle::new().with_post_hook(TracePost(trace.clone()));

        let result: anyhow::Result<()> = lifecycle.run(
            &h.ctx,
            Invocation::new(Category::Stream, "list"),
            |_, _| anyhow::bail!("server unreachable"),
        );

        assert_eq!(result.unwrap_err().to_string(), "server unreachable");
        assert_eq!(trace.entries(), vec!["post:PostRun:Failed".to_string()]);
    }

    #[test]
    fn terminal_phase_reported() {
        let h = Harness::new();
        let lifecycle = Lifecycle::new();

        let (phase, result) =
            lifecycle.run_to_end(&h.ctx, Invocation::new(Category::Cli, "version"), |_, _| Ok(7));
        assert_eq!(phase, Phase::Done);
        assert_eq!(result.unwrap(), 7);

        let (phase, result): (Phase, anyhow::Result<()>) = lifecycle.run_to_end(
            &h.ctx,
            Invocation::new(Category::Stream, "list"),
            |_, _| anyhow::bail!("server unreachable"),
        );
        assert_eq!(phase, Phase::Failed);
        assert!(result.is_err());

        let (phase, result) = Lifecycle::new().with_pre_hook(FailingPre).run_to_end(
            &h.ctx,
            Invocation::new(Category::Cli, "x"),
            |_, _| Ok(()),
        );
        assert_eq!(phase, Phase::Failed);
        assert!(result.is_err());
    }

    #[test]
    fn standard_lifecycle_bootstraps_and_resolves() {
        let h = Harness::new();

        let resolved = Lifecycle::standard()
            .run(
                &h.ctx,
                Invocation::new(Category::Stream, "list").requiring_profile(),
                |_, inv| {
                    assert!(inv.session().is_some());
                    Ok(inv.target()?.clone())
                },
            )
            .unwrap();

        assert_eq!(resolved.name, DEMO_PROFILE);
        assert_eq!(resolved.profile, Profile::demo());
        assert!(h.ctx.paths.config_file().exists());
        assert!(h.ctx.paths.session_file().exists());
    }

    #[test]
    fn profile_not_resolved_when_not_required() {
        let h = Harness::new();

        Lifecycle::standard()
            .run(&h.ctx, Invocation::new(Category::Profile, "list"), |_, inv| {
                assert!(inv.profile().is_none());
                assert!(inv.config().is_some());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn missing_profile_aborts_before_body() {
        let mut h = Harness::new();
        h.ctx.requested_profile = Some("missing".to_string());

        let mut body_ran = false;
        let err = Lifecycle::standard()
            .run(
                &h.ctx,
                Invocation::new(Category::Stream, "list").requiring_profile(),
                |_, _| {
                    body_ran = true;
                    Ok(())
                },
            )
            .unwrap_err();

        assert!(!body_ran);
        assert!(matches!(
            err.downcast_ref::<LifecycleError>(),
            Some(LifecycleError::Resolve(ResolveError::ProfileNotFound(_)))
        ));
        assert!(h.events().is_empty());
    }

    #[test]
    fn telemetry_dispatched_for_success_and_failure() {
        let h = Harness::new();
        let lifecycle = Lifecycle::standard();

        lifecycle
            .run(
                &h.ctx,
                Invocation::new(Category::Stream, "info").with_args(["backend"]),
                |_, _| Ok(()),
            )
            .unwrap();
        let failed: anyhow::Result<()> =
            lifecycle.run(&h.ctx, Invocation::new(Category::User, "list"), |_, _| {
                anyhow::bail!("forbidden")
            });
        assert!(failed.is_err());

        let events = h.events();
        assert_eq!(events.len(), 2);
        let mut commands: Vec<_> = events
            .iter()
            .map(|e| format!("{}/{}", e.category, e.command))
            .collect();
        commands.sort();
        assert_eq!(commands, vec!["stream/info", "user/list"]);
        assert!(events.iter().all(|e| e.session_id.is_some()));
        let info = events.iter().find(|e| e.command == "info").unwrap();
        assert_eq!(info.args, vec!["backend".to_string()]);
    }

    #[test]
    fn category_names() {
        assert_eq!(Category::Cli.as_str(), "cli");
        assert_eq!(Category::Query.to_string(), "query");
    }

    #[test]
    fn target_without_resolution_is_error() {
        let inv = Invocation::new(Category::Stream, "list");
        assert!(inv.target().is_err());
    }

    #[test]
    fn runtime_kept_alive_by_harness() {
        let h = Harness::new();
        assert_eq!(h.rt.block_on(async { 1 + 1 }), 2);
    }
}
