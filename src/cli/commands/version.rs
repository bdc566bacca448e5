//! version command - Print version information

use anyhow::Result;

use crate::engine::Context;
use crate::ui::output;

/// Print the client version and build target.
pub fn version(ctx: &Context) -> Result<()> {
    output::result(format!("pb version {}", env!("CARGO_PKG_VERSION")));
    output::print(
        format!(
            "target: {}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        ),
        ctx.verbosity(),
    );
    Ok(())
}
