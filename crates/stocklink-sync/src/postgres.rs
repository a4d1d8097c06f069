//! Postgres-backed implementations of the persistence seams.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use stocklink_core::{
    AppConfig, FileMappingStore, MappingConfig, SyncCandidate, SyncStats, TokenBackend,
};
use stocklink_db::{MappedTable, NewSyncLog, ShopTokenRow, TableAnalysis};
use stocklink_shopee::{
    MemoryTokenStore, ShopCredentials, ShopeeClient, Signer, TokenManager, TokenStore,
    TokenStoreError,
};

use crate::error::SyncError;
use crate::orchestrator::SyncOrchestrator;
use crate::store::{ProductStore, SyncLog};

impl SyncOrchestrator {
    /// Wires an orchestrator against Postgres and the configured Shopee host.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Shopee`] if the HTTP client cannot be built or the
    /// configured host is not a valid URL.
    pub fn from_app_config(config: &AppConfig, pool: PgPool) -> Result<Self, SyncError> {
        let token_store: Arc<dyn TokenStore> = match config.token_backend {
            TokenBackend::Memory => Arc::new(MemoryTokenStore::new()),
            TokenBackend::Database => Arc::new(PgTokenStore::new(pool.clone())),
        };
        let client = ShopeeClient::with_base_url(
            Signer::new(config.shopee_partner_id, &config.shopee_partner_key),
            TokenManager::new(token_store),
            config.http_timeout_secs,
            &config.shopee_host,
            Some(&config.user_agent),
        )?;
        tracing::debug!(
            host = %config.shopee_host,
            token_backend = %config.token_backend,
            mapping_dir = %config.mapping_dir.display(),
            "sync orchestrator configured"
        );
        Ok(Self::new(
            client,
            FileMappingStore::new(&config.mapping_dir),
            Arc::new(PgProductStore::new(pool.clone())),
            Arc::new(PgSyncLog::new(pool)),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_i64_limit(limit: Option<usize>) -> Option<i64> {
    limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn candidates(
        &self,
        mapping: &MappingConfig,
        limit: Option<usize>,
    ) -> Result<Vec<SyncCandidate>, SyncError> {
        let table = MappedTable::from_config(mapping)?;
        Ok(stocklink_db::list_sync_candidates(&self.pool, &table, to_i64_limit(limit)).await?)
    }

    async fn count(&self, mapping: &MappingConfig) -> Result<i64, SyncError> {
        let table = MappedTable::from_config(mapping)?;
        Ok(stocklink_db::count_sync_candidates(&self.pool, &table).await?)
    }

    async fn candidate(
        &self,
        mapping: &MappingConfig,
        product_id: &str,
    ) -> Result<Option<SyncCandidate>, SyncError> {
        let table = MappedTable::from_config(mapping)?;
        Ok(stocklink_db::get_sync_candidate(&self.pool, &table, product_id).await?)
    }

    async fn record_stock(
        &self,
        mapping: &MappingConfig,
        product_id: &str,
        stock: i64,
    ) -> Result<(), SyncError> {
        let table = MappedTable::from_config(mapping)?;
        stocklink_db::update_product_stock(&self.pool, &table, product_id, stock)
            .await
            .map_err(|e| match e {
                stocklink_db::DbError::NotFound => SyncError::ProductNotFound {
                    product_id: product_id.to_string(),
                },
                other => SyncError::Db(other),
            })
    }

    async fn stats(&self, mapping: &MappingConfig) -> Result<SyncStats, SyncError> {
        let table = MappedTable::from_config(mapping)?;
        Ok(stocklink_db::sync_stats(&self.pool, &table).await?)
    }

    async fn describe_tables(&self) -> Result<Vec<TableAnalysis>, SyncError> {
        Ok(stocklink_db::analyze_product_tables(&self.pool).await?)
    }

    async fn ping(&self) -> Result<(), SyncError> {
        stocklink_db::ping(&self.pool)
            .await
            .map_err(|e| SyncError::Db(e.into()))
    }
}

#[derive(Debug, Clone)]
pub struct PgSyncLog {
    pool: PgPool,
}

impl PgSyncLog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncLog for PgSyncLog {
    async fn append(&self, entry: NewSyncLog) -> Result<(), SyncError> {
        stocklink_db::insert_sync_log(&self.pool, &entry).await?;
        Ok(())
    }
}

/// Shop credentials persisted in `shop_tokens`, surviving restarts.
#[derive(Debug, Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn credentials_from_row(row: ShopTokenRow) -> ShopCredentials {
    ShopCredentials {
        shop_id: row.shop_id,
        access_token: row.access_token,
        refresh_token: row.refresh_token,
        expires_at: row.expires_at,
    }
}

fn store_error(err: stocklink_db::DbError) -> TokenStoreError {
    TokenStoreError::new(err.to_string())
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn get(&self, shop_id: i64) -> Result<Option<ShopCredentials>, TokenStoreError> {
        let row = stocklink_db::get_shop_token(&self.pool, shop_id)
            .await
            .map_err(store_error)?;
        Ok(row.map(credentials_from_row))
    }

    async fn put(&self, credentials: ShopCredentials) -> Result<(), TokenStoreError> {
        stocklink_db::upsert_shop_token(
            &self.pool,
            credentials.shop_id,
            &credentials.access_token,
            &credentials.refresh_token,
            credentials.expires_at,
        )
        .await
        .map_err(store_error)
    }

    async fn list(&self) -> Result<Vec<ShopCredentials>, TokenStoreError> {
        let rows = stocklink_db::list_shop_tokens(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(credentials_from_row).collect())
    }
}
