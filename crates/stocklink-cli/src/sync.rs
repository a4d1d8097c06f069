//! Sync command handlers for the CLI.
//!
//! These run the same orchestrator operations as the HTTP API and print the
//! results as pretty JSON on stdout. Logs go to stderr.

use std::time::Duration;

use clap::Subcommand;
use stocklink_core::AppConfig;
use stocklink_sync::SyncOrchestrator;

use crate::print_json;

/// Sub-commands available under `sync`.
#[derive(Debug, Subcommand)]
pub enum SyncCommands {
    /// Show what a run would do without calling Shopee
    Preview {
        #[arg(long)]
        shop_id: i64,
        /// Number of candidates to inspect
        #[arg(long, default_value = "5")]
        limit: usize,
    },
    /// Sync a batch of mapped products
    Run {
        #[arg(long)]
        shop_id: i64,
        /// Batch size (defaults to `SYNC_LIMIT`)
        #[arg(long)]
        limit: Option<usize>,
        /// Pause after each product sent to Shopee (defaults to `SYNC_DELAY_MS`)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Sync one product by its local id
    Product {
        #[arg(long)]
        shop_id: i64,
        #[arg(long)]
        product_id: String,
    },
    /// Show recent sync log entries, newest first
    Logs {
        #[arg(long)]
        shop_id: i64,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

/// Dispatches a `sync` sub-command.
///
/// # Errors
///
/// Returns an error if the orchestrator operation or log query fails, or if a
/// single-product sync reports failure.
pub(crate) async fn run(
    orchestrator: &SyncOrchestrator,
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: SyncCommands,
) -> anyhow::Result<()> {
    match command {
        SyncCommands::Preview { shop_id, limit } => {
            print_json(&orchestrator.preview(shop_id, limit.max(1)).await?)?;
        }
        SyncCommands::Run {
            shop_id,
            limit,
            delay_ms,
        } => {
            let limit = limit.unwrap_or(config.sync_limit).max(1);
            let delay = Duration::from_millis(delay_ms.unwrap_or(config.sync_delay_ms));
            tracing::info!(shop_id, limit, delay = ?delay, "starting sync run");
            let summary = orchestrator.run_sync(shop_id, limit, delay).await?;
            print_json(&summary)?;
        }
        SyncCommands::Product {
            shop_id,
            product_id,
        } => {
            let outcome = orchestrator.sync_product(shop_id, &product_id).await?;
            print_json(&outcome)?;
            if !outcome.success {
                tracing::warn!(shop_id, product_id = %product_id, "product sync failed");
                anyhow::bail!("sync failed for product {product_id}");
            }
        }
        SyncCommands::Logs { shop_id, limit } => {
            let rows = stocklink_db::list_sync_logs(pool, shop_id, limit.max(1)).await?;
            if rows.is_empty() {
                println!("no sync logs for shop {shop_id}; run `sync run` first");
                return Ok(());
            }
            print_json(&rows)?;
        }
    }
    Ok(())
}
