//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! [`dispatch`] maps each parsed command to an [`Invocation`] (category,
//! name, telemetry args, whether it needs a target profile) and runs the
//! handler as the body of the [`Lifecycle`]. Handlers never bootstrap or
//! resolve anything themselves; they read what the pre-hooks left on the
//! invocation.
//!
//! # Async Commands
//!
//! Server commands are async because they involve network I/O. Handlers
//! drive them with [`Context::block_on`] from the synchronous dispatch path.

mod completion;
mod profile;
mod query;
mod role;
mod stream;
mod user;
mod version;

pub use completion::completion;
pub use query::{parse_time, QueryRange};
pub use version::version;

use crate::cli::args::{Command, ProfileAction, QueryAction, RoleAction, StreamAction, UserAction};
use crate::client::ServerClient;
use crate::engine::{Category, Context, Invocation, Lifecycle};
use anyhow::Result;

/// Dispatch a command through the lifecycle.
pub fn dispatch(command: Command, ctx: &Context, lifecycle: &Lifecycle) -> Result<()> {
    match command {
        Command::Profile { action } => dispatch_profile(action, ctx, lifecycle),
        Command::Stream { action } => dispatch_stream(action, ctx, lifecycle),
        Command::User { action } => dispatch_user(action, ctx, lifecycle),
        Command::Role { action } => dispatch_role(action, ctx, lifecycle),
        Command::Query { action } => dispatch_query(action, ctx, lifecycle),
        Command::Version => lifecycle.run(
            ctx,
            Invocation::new(Category::Cli, "version"),
            |ctx, _| version::version(ctx),
        ),
        Command::Completion { shell } => {
            let invocation = Invocation::new(Category::Cli, "completion")
                .with_args([format!("{shell:?}").to_lowercase()]);
            lifecycle.run(ctx, invocation, |_, _| completion::completion(shell))
        }
    }
}

fn dispatch_profile(action: ProfileAction, ctx: &Context, lifecycle: &Lifecycle) -> Result<()> {
    match action {
        ProfileAction::Add {
            name,
            url,
            username,
            password,
        } => {
            // Credentials never reach telemetry.
            let invocation = Invocation::new(Category::Profile, "add").with_args([&name, &url]);
            lifecycle.run(ctx, invocation, |ctx, _| {
                profile::add(ctx, &name, &url, username.as_deref(), password.as_deref())
            })
        }
        ProfileAction::Remove { name } => {
            let invocation = Invocation::new(Category::Profile, "remove").with_args([&name]);
            lifecycle.run(ctx, invocation, |ctx, _| profile::remove(ctx, &name))
        }
        ProfileAction::List => lifecycle.run(
            ctx,
            Invocation::new(Category::Profile, "list"),
            profile::list,
        ),
        ProfileAction::Default { name } => {
            let invocation =
                Invocation::new(Category::Profile, "default").with_args(name.iter().cloned());
            lifecycle.run(ctx, invocation, |ctx, inv| {
                profile::default(ctx, inv, name.as_deref())
            })
        }
    }
}

fn dispatch_stream(action: StreamAction, ctx: &Context, lifecycle: &Lifecycle) -> Result<()> {
    let (command, args) = match &action {
        StreamAction::Add { name } => ("add", vec![name.clone()]),
        StreamAction::Remove { name, .. } => ("remove", vec![name.clone()]),
        StreamAction::List => ("list", Vec::new()),
        StreamAction::Info { name } => ("info", vec![name.clone()]),
    };
    let invocation = Invocation::new(Category::Stream, command)
        .with_args(args)
        .requiring_profile();

    lifecycle.run(ctx, invocation, |ctx, inv| {
        let client = server_client(inv)?;
        match &action {
            StreamAction::Add { name } => stream::add(ctx, &client, name),
            StreamAction::Remove { name, force } => stream::remove(ctx, &client, name, *force),
            StreamAction::List => stream::list(ctx, &client),
            StreamAction::Info { name } => stream::info(ctx, &client, name),
        }
    })
}

fn dispatch_user(action: UserAction, ctx: &Context, lifecycle: &Lifecycle) -> Result<()> {
    let (command, args) = match &action {
        UserAction::Add { name, .. } => ("add", vec![name.clone()]),
        UserAction::Remove { name } => ("remove", vec![name.clone()]),
        UserAction::List => ("list", Vec::new()),
        UserAction::SetRole { name, roles } => {
            let mut args = vec![name.clone()];
            args.extend(roles.iter().cloned());
            ("set-role", args)
        }
    };
    let invocation = Invocation::new(Category::User, command)
        .with_args(args)
        .requiring_profile();

    lifecycle.run(ctx, invocation, |ctx, inv| {
        let client = server_client(inv)?;
        match &action {
            UserAction::Add { name, roles } => user::add(ctx, &client, name, roles),
            UserAction::Remove { name } => user::remove(ctx, &client, name),
            UserAction::List => user::list(ctx, &client),
            UserAction::SetRole { name, roles } => user::set_role(ctx, &client, name, roles),
        }
    })
}

fn dispatch_role(action: RoleAction, ctx: &Context, lifecycle: &Lifecycle) -> Result<()> {
    let (command, args) = match &action {
        RoleAction::Add {
            name, privilege, ..
        } => ("add", vec![name.clone(), privilege.as_str().to_string()]),
        RoleAction::List => ("list", Vec::new()),
        RoleAction::Remove { name } => ("remove", vec![name.clone()]),
    };
    let invocation = Invocation::new(Category::Role, command)
        .with_args(args)
        .requiring_profile();

    lifecycle.run(ctx, invocation, |ctx, inv| {
        let client = server_client(inv)?;
        match &action {
            RoleAction::Add {
                name,
                privilege,
                stream,
            } => role::add(ctx, &client, name, *privilege, stream.as_deref()),
            RoleAction::List => role::list(ctx, &client),
            RoleAction::Remove { name } => role::remove(ctx, &client, name),
        }
    })
}

fn dispatch_query(action: QueryAction, ctx: &Context, lifecycle: &Lifecycle) -> Result<()> {
    match action {
        QueryAction::Run { query, from, to } => {
            // The statement itself is not reported.
            let invocation = Invocation::new(Category::Query, "run")
                .with_args([&from, &to])
                .requiring_profile();
            lifecycle.run(ctx, invocation, |ctx, inv| {
                let client = server_client(inv)?;
                query::run(ctx, &client, &query, &from, &to)
            })
        }
        QueryAction::List => {
            let invocation = Invocation::new(Category::Query, "list").requiring_profile();
            lifecycle.run(ctx, invocation, |ctx, inv| {
                let client = server_client(inv)?;
                query::list(ctx, &client)
            })
        }
    }
}

fn server_client(invocation: &Invocation) -> Result<ServerClient> {
    Ok(ServerClient::new(invocation.target()?)?)
}
