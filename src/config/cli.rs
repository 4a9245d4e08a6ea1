use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Yatube binary.
#[derive(Debug, Parser)]
#[command(name = "yatube", version, about = "Yatube blogging server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "YATUBE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Manage user accounts.
    Users(UsersArgs),
    /// Manage groups posts can be filed under.
    Groups(GroupsArgs),
    /// Issue and revoke login sessions.
    Sessions(SessionsArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the number of posts per listing page.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Toggle the page cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override how long cached pages are served.
    #[arg(long = "cache-page-ttl-seconds", value_name = "SECONDS")]
    pub cache_page_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum UsersCommand {
    /// Create a user account.
    Add(AddUserArgs),
}

#[derive(Debug, Args, Clone)]
pub struct AddUserArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Handle of the new user.
    #[arg(value_name = "USERNAME")]
    pub username: String,
}

#[derive(Debug, Args, Clone)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum GroupsCommand {
    /// Create a group; an existing slug is left untouched.
    Add(AddGroupArgs),
}

#[derive(Debug, Args, Clone)]
pub struct AddGroupArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Human-readable group title.
    #[arg(value_name = "TITLE")]
    pub title: String,

    /// URL slug; derived from the title when omitted.
    #[arg(long, value_name = "SLUG")]
    pub slug: Option<String>,

    /// Free-form description shown on the group page.
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub description: String,
}

#[derive(Debug, Args, Clone)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum SessionsCommand {
    /// Mint a session token for a user and print it once.
    Issue(IssueSessionArgs),
    /// Revoke a session by its public prefix.
    Revoke(RevokeSessionArgs),
}

#[derive(Debug, Args, Clone)]
pub struct IssueSessionArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(value_name = "USERNAME")]
    pub username: String,

    /// Lifetime of the session; sessions without one never expire.
    #[arg(long = "ttl-hours", value_name = "HOURS")]
    pub ttl_hours: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct RevokeSessionArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(value_name = "PREFIX")]
    pub prefix: String,
}

impl Command {
    /// Database override carried by an administrative command, if any.
    pub(crate) fn database_override(&self) -> Option<&DatabaseOverride> {
        match self {
            Command::Serve(_) => None,
            Command::Users(args) => match &args.command {
                UsersCommand::Add(add) => Some(&add.database),
            },
            Command::Groups(args) => match &args.command {
                GroupsCommand::Add(add) => Some(&add.database),
            },
            Command::Sessions(args) => match &args.command {
                SessionsCommand::Issue(issue) => Some(&issue.database),
                SessionsCommand::Revoke(revoke) => Some(&revoke.database),
            },
        }
    }
}
