//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--profile <name>`: Target profile (also `$PB_PROFILE`)
//! - `--config-dir <path>`: Configuration directory (also `$PB_CONFIG_DIR`)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::paths::CONFIG_DIR_ENV;

/// pb - command line client for Parseable
#[derive(Parser, Debug)]
#[command(name = "pb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Profile to run the command against (defaults to the configured default)
    #[arg(long, global = true, env = "PB_PROFILE", value_name = "NAME")]
    pub profile: Option<String>,

    /// Directory holding config.toml and session.toml
    #[arg(long, global = true, env = CONFIG_DIR_ENV, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; disables prompts
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Prompts are allowed unless `--quiet` is set or stdin is not a TTY.
    pub fn interactive(&self) -> bool {
        !self.quiet && std::io::stdin().is_terminal()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage server profiles
    #[command(
        name = "profile",
        long_about = "Manage server profiles.\n\n\
            A profile is a named Parseable server with its credentials. Commands \
            that talk to a server use the profile given by --profile, or the \
            default profile when none is given. The 'demo' profile is always \
            present and points at the public demo server.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Add a local server and make it the default
    pb profile add local http://localhost:8000 admin admin
    pb profile default local

    # See configured profiles (* marks the default)
    pb profile list"
    )]
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage log streams
    #[command(
        name = "stream",
        after_help = "\
WORKFLOW EXAMPLES:
    pb stream add backend
    pb stream info backend
    pb --profile demo stream list"
    )]
    Stream {
        #[command(subcommand)]
        action: StreamAction,
    },

    /// Manage users
    #[command(name = "user")]
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage roles
    #[command(name = "role")]
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },

    /// Run SQL queries
    #[command(name = "query")]
    Query {
        #[command(subcommand)]
        action: QueryAction,
    },

    /// Print version information
    #[command(name = "version")]
    Version,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    pb completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    pb completion zsh >> ~/.zshrc

    # Fish
    pb completion fish > ~/.config/fish/completions/pb.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileAction {
    /// Add or replace a profile
    Add {
        /// Profile name
        name: String,
        /// Server URL, e.g. http://localhost:8000
        url: String,
        /// Username (prompted when omitted)
        username: Option<String>,
        /// Password (prompted when omitted)
        password: Option<String>,
    },
    /// Remove a profile
    #[command(alias = "delete")]
    Remove {
        /// Profile name
        name: String,
    },
    /// List profiles
    List,
    /// Show or set the default profile
    Default {
        /// Profile to make the default
        name: Option<String>,
    },
}

/// Stream subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum StreamAction {
    /// Create a stream
    #[command(alias = "create")]
    Add {
        /// Stream name
        name: String,
    },
    /// Delete a stream and its data
    #[command(alias = "delete")]
    Remove {
        /// Stream name
        name: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// List streams
    List,
    /// Show ingestion and storage statistics
    Info {
        /// Stream name
        name: String,
    },
}

/// User subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum UserAction {
    /// Create a user; prints the generated password
    Add {
        /// User name
        name: String,
        /// Role to grant (repeatable)
        #[arg(long = "role", value_name = "ROLE")]
        roles: Vec<String>,
    },
    /// Delete a user
    #[command(alias = "delete")]
    Remove {
        /// User name
        name: String,
    },
    /// List users
    List,
    /// Replace a user's roles
    SetRole {
        /// User name
        name: String,
        /// Roles to assign
        #[arg(required = true)]
        roles: Vec<String>,
    },
}

/// Role subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum RoleAction {
    /// Create a role granting one privilege
    Add {
        /// Role name
        name: String,
        /// Privilege the role grants
        #[arg(long, value_enum)]
        privilege: Privilege,
        /// Stream the privilege applies to (reader, writer and ingestor)
        #[arg(long)]
        stream: Option<String>,
    },
    /// List roles
    List,
    /// Delete a role
    #[command(alias = "delete")]
    Remove {
        /// Role name
        name: String,
    },
}

/// Query subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum QueryAction {
    /// Run a SQL query and print the records as JSON
    Run {
        /// SQL statement
        query: String,
        /// Start of the time range: a duration back from now (10m, 1h, 2d) or RFC3339
        #[arg(long, default_value = "1m")]
        from: String,
        /// End of the time range: "now", a duration back from now, or RFC3339
        #[arg(long, default_value = "now")]
        to: String,
    },
    /// List the saved queries of the profile's user
    List,
}

/// Privileges a role can grant
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Admin,
    Editor,
    Writer,
    Reader,
    Ingestor,
}

impl Privilege {
    /// Server-side name of the privilege.
    pub fn as_str(self) -> &'static str {
        match self {
            Privilege::Admin => "admin",
            Privilege::Editor => "editor",
            Privilege::Writer => "writer",
            Privilege::Reader => "reader",
            Privilege::Ingestor => "ingestor",
        }
    }

    /// Whether the privilege is granted per stream.
    pub fn is_stream_scoped(self) -> bool {
        matches!(self, Privilege::Writer | Privilege::Reader | Privilege::Ingestor)
    }
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
