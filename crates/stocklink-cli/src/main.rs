mod sync;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use stocklink_core::{AppConfig, FileMappingStore};
use stocklink_shopee::{MemoryTokenStore, ShopeeClient, Signer, TokenManager};
use stocklink_sync::SyncOrchestrator;
use tracing_subscriber::EnvFilter;

use crate::sync::SyncCommands;

#[derive(Debug, Parser)]
#[command(name = "stocklink-cli")]
#[command(about = "Stocklink command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Shopee shop authorization
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Per-shop column mappings
    Mapping {
        #[command(subcommand)]
        command: MappingCommands,
    },
    /// Push local stock to Shopee
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[derive(Debug, Subcommand)]
enum AuthCommands {
    /// Print the signed partner authorization URL
    Url {
        /// Callback URL (defaults to `SHOPEE_REDIRECT_URL`)
        #[arg(long)]
        redirect: Option<String>,
    },
    /// Show token state for every known shop
    Status,
}

#[derive(Debug, Subcommand)]
enum MappingCommands {
    /// Print the stored mapping for a shop
    Show {
        #[arg(long)]
        shop_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("stocklink-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = stocklink_core::load_app_config()?;
    match command {
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    stocklink_db::ping(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = stocklink_db::run_migrations(&pool).await?;
                    tracing::info!(applied, "migrations complete");
                    println!("migrations applied: {applied}");
                }
            }
        }
        Commands::Auth {
            command: AuthCommands::Url { redirect },
        } => {
            let client = ShopeeClient::with_base_url(
                Signer::new(config.shopee_partner_id, &config.shopee_partner_key),
                TokenManager::new(Arc::new(MemoryTokenStore::new())),
                config.http_timeout_secs,
                &config.shopee_host,
                Some(&config.user_agent),
            )?;
            let redirect = redirect.unwrap_or_else(|| config.shopee_redirect_url.clone());
            println!("{}", client.auth_partner_url(&redirect));
        }
        Commands::Auth {
            command: AuthCommands::Status,
        } => {
            let orchestrator = orchestrator(&config).await?;
            print_json(&orchestrator.client().tokens().statuses().await?)?;
        }
        Commands::Mapping {
            command: MappingCommands::Show { shop_id },
        } => {
            let mapping = FileMappingStore::new(&config.mapping_dir).load(shop_id)?;
            print_json(&mapping)?;
        }
        Commands::Sync { command } => {
            let pool = connect(&config).await?;
            let orchestrator = SyncOrchestrator::from_app_config(&config, pool.clone())?;
            sync::run(&orchestrator, &pool, &config, command).await?;
        }
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = stocklink_db::PoolConfig::from_app_config(config);
    Ok(stocklink_db::connect_pool(&config.database_url, pool_config).await?)
}

async fn orchestrator(config: &AppConfig) -> anyhow::Result<SyncOrchestrator> {
    let pool = connect(config).await?;
    Ok(SyncOrchestrator::from_app_config(config, pool)?)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
