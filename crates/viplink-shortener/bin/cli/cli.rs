use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};
use viplink_shortener::config::DEFAULT_BASE_URL;
use viplink_telemetry::LogFormat;

pub const BASE_URL_ENV: &str = "VIPLINK_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "VIPLINK_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "VIPLINK_MYSQL_DSN";
pub const LOG_FORMAT_ENV: &str = "VIPLINK_LOG_FORMAT";
pub const MAX_ATTEMPTS_ENV: &str = "VIPLINK_MAX_ATTEMPTS";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "viplink", about = "Create and manage short links")]
pub struct CLI {
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Where links live. `in-memory` lasts for one invocation only, so it can
    /// create links but not find them again.
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory,
        global = true
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"), global = true)]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    pub log_format: LogFormat,

    /// Draws per identifier, and persist attempts per link.
    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = DEFAULT_MAX_ATTEMPTS, global = true)]
    pub max_attempts: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the links table.
    #[command(subcommand)]
    Schema(SchemaCommand),
    #[command(flatten)]
    Link(LinkCommand),
}

#[derive(Debug, Subcommand)]
pub enum LinkCommand {
    /// Shorten a URL.
    Create(CreateArgs),
    /// Look up a suffix and count the visit.
    Resolve { suffix: String },
    /// Show a link by its secret key.
    Inspect { secret_key: String },
    /// Delete a link by its secret key.
    Delete { secret_key: String },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum SchemaCommand {
    Init,
    Drop,
    Clear,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub long_url: String,

    /// Vanity suffix. Makes the link a VIP link, which expires.
    #[arg(long)]
    pub vip_key: Option<String>,

    #[arg(long, requires = "vip_key")]
    pub ttl: Option<u32>,

    /// One of SECONDS, MINUTES, HOURS, DAYS.
    #[arg(long, requires = "vip_key")]
    pub ttl_unit: Option<String>,
}

impl LinkCommand {
    /// Whether the command reads links written by an earlier invocation.
    pub fn needs_stored_links(&self) -> bool {
        !matches!(self, LinkCommand::Create(_))
    }
}
