//! user command - Manage users

use anyhow::{Context as _, Result};

use crate::client::ServerClient;
use crate::engine::Context;
use crate::ui::output;

/// Create a user and print the generated password.
pub fn add(ctx: &Context, client: &ServerClient, name: &str, roles: &[String]) -> Result<()> {
    let password = ctx
        .block_on(client.create_user(name, roles))
        .with_context(|| format!("failed to create user '{}'", name))?;

    output::print(format!("Created user '{}'. Password:", name), ctx.verbosity());
    output::result(password);
    Ok(())
}

/// Delete a user.
pub fn remove(ctx: &Context, client: &ServerClient, name: &str) -> Result<()> {
    ctx.block_on(client.delete_user(name))
        .with_context(|| format!("failed to delete user '{}'", name))?;
    output::print(format!("Deleted user '{}'.", name), ctx.verbosity());
    Ok(())
}

/// List users.
pub fn list(ctx: &Context, client: &ServerClient) -> Result<()> {
    let users = ctx
        .block_on(client.list_users())
        .context("failed to list users")?;

    if users.is_empty() {
        output::print("No users.", ctx.verbosity());
        return Ok(());
    }
    let ids: Vec<&str> = users.iter().map(|u| u.id()).collect();
    output::result(output::format_list(&ids, ""));
    Ok(())
}

/// Replace a user's roles.
pub fn set_role(ctx: &Context, client: &ServerClient, name: &str, roles: &[String]) -> Result<()> {
    ctx.block_on(client.set_user_roles(name, roles))
        .with_context(|| format!("failed to set roles for user '{}'", name))?;
    output::print(
        format!("Roles for '{}' set to: {}", name, roles.join(", ")),
        ctx.verbosity(),
    );
    Ok(())
}
