mod cli;

use crate::cli::{Command, CreateArgs, LinkCommand, SchemaCommand, StorageBackendArg, CLI};
use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use viplink_core::{CreateLinkRequest, RegistryAdmin, SecretKey, Shortener, Suffix};
use viplink_generator::AllocatorSettings;
use viplink_shortener::{ShortLinkService, ShortenerSettings};
use viplink_storage::{InMemoryRegistry, MySqlRegistry, Registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    viplink_telemetry::init(config.log_format)?;
    check_backend(config.storage, &config.command)?;

    info!(
        base_url = %config.base_url,
        storage_backend = %config.storage,
        "starting viplink"
    );

    match config.storage {
        StorageBackendArg::InMemory => run(InMemoryRegistry::new(), config).await,
        StorageBackendArg::Mysql => {
            let Some(mysql_dsn) = config.mysql_dsn.as_deref() else {
                bail!("mysql dsn is required when storage backend is mysql");
            };
            let registry = MySqlRegistry::connect(mysql_dsn)
                .await
                .context("connecting to mysql")?;
            run(registry, config).await
        }
    }
}

async fn run<R>(registry: R, config: CLI) -> anyhow::Result<()>
where
    R: Registry + RegistryAdmin,
{
    let settings = ShortenerSettings::builder()
        .base_url(config.base_url)
        .allocator(
            AllocatorSettings::builder()
                .max_attempts(config.max_attempts)
                .build(),
        )
        .build();

    match config.command {
        Command::Schema(command) => schema(&registry, command).await,
        Command::Link(command) => link(ShortLinkService::new(registry, settings), command).await,
    }
}

/// Rejects commands that could only ever report "not found" on `storage`.
fn check_backend(storage: StorageBackendArg, command: &Command) -> anyhow::Result<()> {
    let Command::Link(link) = command else {
        return Ok(());
    };
    if storage == StorageBackendArg::InMemory && link.needs_stored_links() {
        bail!("this command needs a persistent backend; pass --storage mysql");
    }
    Ok(())
}

async fn link<S: Shortener>(service: S, command: LinkCommand) -> anyhow::Result<()> {
    match command {
        LinkCommand::Create(args) => print(&service.create(request(args)).await?),
        LinkCommand::Resolve { suffix } => {
            let suffix = Suffix::new(suffix)?;
            print(&service.resolve(&suffix).await?)
        }
        LinkCommand::Inspect { secret_key } => {
            let secret_key = SecretKey::new(secret_key)?;
            print(&service.inspect(&secret_key).await?)
        }
        LinkCommand::Delete { secret_key } => {
            let secret_key = SecretKey::new(secret_key)?;
            let deleted = service.delete(&secret_key).await?;
            print(&serde_json::json!({ "deleted": deleted }))
        }
    }
}

async fn schema<R: RegistryAdmin>(registry: &R, command: SchemaCommand) -> anyhow::Result<()> {
    match command {
        SchemaCommand::Init => registry.create_schema().await?,
        SchemaCommand::Drop => registry.drop_schema().await?,
        SchemaCommand::Clear => registry.clear().await?,
    }
    info!(?command, "schema command done");
    Ok(())
}

fn request(args: CreateArgs) -> CreateLinkRequest {
    CreateLinkRequest {
        long_url: args.long_url,
        vip_key: args.vip_key,
        ttl: args.ttl,
        ttl_unit: args.ttl_unit,
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
