//! logging
//!
//! Diagnostic logging setup.
//!
//! stdout is reserved for command results; every log line goes to stderr.
//! The filter comes from `PB_LOG` (tracing `EnvFilter` syntax), else `debug`
//! for this crate when `--debug` is given, else `warn`.

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "PB_LOG";

/// Filter used when `PB_LOG` is unset or invalid.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "pb_cli=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
