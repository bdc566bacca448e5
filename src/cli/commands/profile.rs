//! profile command - Manage server profiles

use anyhow::{bail, Context as _, Result};

use crate::core::config::{Configuration, Profile, DEMO_PROFILE};
use crate::engine::{Context, Invocation};
use crate::ui::{output, prompts};

/// Add or replace a profile, prompting for missing credentials.
pub fn add(
    ctx: &Context,
    name: &str,
    url: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<()> {
    let username = match username {
        Some(u) => u.to_string(),
        None if ctx.interactive => prompts::input("Username", None, true)?,
        None => bail!("username required; pass it after the url or run interactively"),
    };
    let password = match password {
        Some(p) => p.to_string(),
        None if ctx.interactive => prompts::password("Password", true)?,
        None => bail!("password required; pass it after the username or run interactively"),
    };

    let profile = Profile::new(url, username, password);
    let (config, replaced) = ctx
        .config_store()
        .update(|config| {
            let replaced = config.profiles.contains_key(name);
            config.add_profile(name, profile)?;
            Ok(replaced)
        })
        .with_context(|| format!("failed to save profile '{}'", name))?;

    let verb = if replaced { "Updated" } else { "Added" };
    output::print(format!("{} profile '{}'.", verb, name), ctx.verbosity());
    if config.default_profile() == Some(name) {
        output::print(format!("'{}' is the default profile.", name), ctx.verbosity());
    }
    Ok(())
}

/// Remove a profile.
pub fn remove(ctx: &Context, name: &str) -> Result<()> {
    let (config, _) = ctx
        .config_store()
        .update(|config| config.remove_profile(name))?;

    output::print(format!("Removed profile '{}'.", name), ctx.verbosity());
    if name == DEMO_PROFILE {
        output::warn(
            "the demo profile is recreated the next time pb runs",
            ctx.verbosity(),
        );
    }
    if config.default_profile().is_none() {
        output::warn(
            "no default profile is set; run 'pb profile default <name>'",
            ctx.verbosity(),
        );
    }
    Ok(())
}

/// List profiles, marking the default.
pub fn list(ctx: &Context, invocation: &Invocation) -> Result<()> {
    let config = current(ctx, invocation)?;
    if config.profiles.is_empty() {
        output::print("No profiles configured.", ctx.verbosity());
        return Ok(());
    }

    let default = config.default_profile();
    for (name, profile) in &config.profiles {
        let marker = if default == Some(name.as_str()) { "*" } else { " " };
        output::result(format!(
            "{} {}\n{}",
            marker,
            name,
            indent(&output::format_fields(&[
                ("url", profile.url.clone()),
                ("username", profile.username.clone()),
            ]))
        ));
    }
    Ok(())
}

/// Show the default profile, or select a new one.
pub fn default(ctx: &Context, invocation: &Invocation, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            ctx.config_store()
                .update(|config| config.set_default_profile(name))?;
            output::print(format!("Default profile is now '{}'.", name), ctx.verbosity());
        }
        None => match current(ctx, invocation)?.default_profile() {
            Some(name) => output::result(name),
            None => bail!("no default profile is set; run 'pb profile default <name>'"),
        },
    }
    Ok(())
}

/// The configuration left by bootstrap, or a fresh read without it.
fn current(ctx: &Context, invocation: &Invocation) -> Result<Configuration> {
    match invocation.config() {
        Some(config) => Ok(config.clone()),
        None => Ok(ctx.config_store().load()?.unwrap_or_default()),
    }
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
