//! role command - Manage roles

use anyhow::{bail, Context as _, Result};

use crate::cli::args::Privilege;
use crate::client::{RolePrivilege, RoleResource, ServerClient};
use crate::engine::Context;
use crate::ui::output;

/// Build the privilege list for a new role.
fn privileges(privilege: Privilege, stream: Option<&str>) -> Result<Vec<RolePrivilege>> {
    let resource = match (privilege.is_stream_scoped(), stream) {
        (true, Some(stream)) => Some(RoleResource {
            stream: stream.to_string(),
        }),
        (true, None) => bail!("--stream is required for the {} privilege", privilege.as_str()),
        (false, Some(_)) => bail!("the {} privilege is not scoped to a stream", privilege.as_str()),
        (false, None) => None,
    };
    Ok(vec![RolePrivilege {
        privilege: privilege.as_str().to_string(),
        resource,
    }])
}

/// Create a role.
pub fn add(
    ctx: &Context,
    client: &ServerClient,
    name: &str,
    privilege: Privilege,
    stream: Option<&str>,
) -> Result<()> {
    let privileges = privileges(privilege, stream)?;
    ctx.block_on(client.create_role(name, &privileges))
        .with_context(|| format!("failed to create role '{}'", name))?;
    output::print(format!("Created role '{}'.", name), ctx.verbosity());
    Ok(())
}

/// List roles.
pub fn list(ctx: &Context, client: &ServerClient) -> Result<()> {
    let roles = ctx
        .block_on(client.list_roles())
        .context("failed to list roles")?;

    if roles.is_empty() {
        output::print("No roles.", ctx.verbosity());
        return Ok(());
    }
    output::result(output::format_list(&roles, ""));
    Ok(())
}

/// Delete a role.
pub fn remove(ctx: &Context, client: &ServerClient, name: &str) -> Result<()> {
    ctx.block_on(client.delete_role(name))
        .with_context(|| format!("failed to delete role '{}'", name))?;
    output::print(format!("Deleted role '{}'.", name), ctx.verbosity());
    Ok(())
}
