//! stream command - Manage log streams

use anyhow::{bail, Context as _, Result};

use crate::client::{ServerClient, StreamStats};
use crate::engine::Context;
use crate::ui::{output, prompts};

/// Create a stream.
pub fn add(ctx: &Context, client: &ServerClient, name: &str) -> Result<()> {
    ctx.block_on(client.create_stream(name))
        .with_context(|| format!("failed to create stream '{}'", name))?;
    output::print(format!("Created stream '{}'.", name), ctx.verbosity());
    Ok(())
}

/// Delete a stream, confirming first unless forced.
pub fn remove(ctx: &Context, client: &ServerClient, name: &str, force: bool) -> Result<()> {
    if !force {
        if !ctx.interactive {
            bail!("refusing to delete stream '{}' without --force", name);
        }
        let message = format!("Delete stream '{}' and all of its data?", name);
        if !prompts::confirm(&message, false, true)? {
            output::print("Aborted.", ctx.verbosity());
            return Ok(());
        }
    }

    ctx.block_on(client.delete_stream(name))
        .with_context(|| format!("failed to delete stream '{}'", name))?;
    output::print(format!("Deleted stream '{}'.", name), ctx.verbosity());
    Ok(())
}

/// List streams.
pub fn list(ctx: &Context, client: &ServerClient) -> Result<()> {
    let streams = ctx
        .block_on(client.list_streams())
        .context("failed to list streams")?;

    if streams.is_empty() {
        output::print("No streams.", ctx.verbosity());
        return Ok(());
    }
    let names: Vec<&str> = streams.iter().map(|s| s.name.as_str()).collect();
    output::result(output::format_list(&names, ""));
    Ok(())
}

/// Show statistics for a stream.
pub fn info(ctx: &Context, client: &ServerClient, name: &str) -> Result<()> {
    let stats = ctx
        .block_on(client.stream_stats(name))
        .with_context(|| format!("failed to fetch stats for stream '{}'", name))?;
    output::result(render_stats(name, &stats));
    Ok(())
}

fn render_stats(name: &str, stats: &StreamStats) -> String {
    let mut rows = vec![
        ("stream", name.to_string()),
        ("events", stats.ingestion.count.to_string()),
        ("ingested size", stats.ingestion.size.clone()),
        ("storage size", stats.storage.size.clone()),
    ];
    if let Some(time) = &stats.time {
        rows.push(("as of", time.clone()));
    }
    output::format_fields(&rows)
}
