//! Seams between the orchestrator and local persistence.

use async_trait::async_trait;
use stocklink_core::{MappingConfig, SyncCandidate, SyncStats};
use stocklink_db::{NewSyncLog, TableAnalysis};
use tokio::sync::RwLock;

use crate::error::SyncError;

/// The merchant's product table, read and written through a mapping.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Candidates newest-first; `limit = None` means all of them.
    async fn candidates(
        &self,
        mapping: &MappingConfig,
        limit: Option<usize>,
    ) -> Result<Vec<SyncCandidate>, SyncError>;

    /// Number of rows that pass the mapping filter.
    async fn count(&self, mapping: &MappingConfig) -> Result<i64, SyncError>;

    async fn candidate(
        &self,
        mapping: &MappingConfig,
        product_id: &str,
    ) -> Result<Option<SyncCandidate>, SyncError>;

    /// Stores the pushed quantity and stamps the last-updated column.
    async fn record_stock(
        &self,
        mapping: &MappingConfig,
        product_id: &str,
        stock: i64,
    ) -> Result<(), SyncError>;

    async fn stats(&self, mapping: &MappingConfig) -> Result<SyncStats, SyncError>;

    /// Tables that look like product catalogs, for mapping setup.
    async fn describe_tables(&self) -> Result<Vec<TableAnalysis>, SyncError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), SyncError>;
}

/// Append-only record of sync attempts.
#[async_trait]
pub trait SyncLog: Send + Sync {
    async fn append(&self, entry: NewSyncLog) -> Result<(), SyncError>;
}

/// Product table held in memory. Ignores the mapping's column names and
/// filter; rows are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryProductStore {
    rows: RwLock<Vec<SyncCandidate>>,
}

impl MemoryProductStore {
    #[must_use]
    pub fn new(rows: Vec<SyncCandidate>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub async fn rows(&self) -> Vec<SyncCandidate> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn candidates(
        &self,
        _mapping: &MappingConfig,
        limit: Option<usize>,
    ) -> Result<Vec<SyncCandidate>, SyncError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self, _mapping: &MappingConfig) -> Result<i64, SyncError> {
        Ok(i64::try_from(self.rows.read().await.len()).unwrap_or(i64::MAX))
    }

    async fn candidate(
        &self,
        _mapping: &MappingConfig,
        product_id: &str,
    ) -> Result<Option<SyncCandidate>, SyncError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|row| row.product_id == product_id)
            .cloned())
    }

    async fn record_stock(
        &self,
        _mapping: &MappingConfig,
        product_id: &str,
        stock: i64,
    ) -> Result<(), SyncError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.product_id == product_id)
            .ok_or_else(|| SyncError::ProductNotFound {
                product_id: product_id.to_string(),
            })?;
        row.current_stock = stock;
        row.last_updated = Some(chrono::Utc::now().to_rfc3339());
        Ok(())
    }

    async fn stats(&self, _mapping: &MappingConfig) -> Result<SyncStats, SyncError> {
        let rows = self.rows.read().await;
        let count = |pred: &dyn Fn(&SyncCandidate) -> bool| {
            i64::try_from(rows.iter().filter(|r| pred(r)).count()).unwrap_or(i64::MAX)
        };
        Ok(SyncStats {
            total_products: count(&|_| true),
            has_shopee_id: count(&|r| r.shopee_item_id.is_some()),
            in_stock: count(&|r| r.shopee_item_id.is_some() && r.current_stock > 0),
        })
    }

    async fn describe_tables(&self) -> Result<Vec<TableAnalysis>, SyncError> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

/// Log entries held in memory.
#[derive(Debug, Default)]
pub struct MemorySyncLog {
    entries: RwLock<Vec<NewSyncLog>>,
}

impl MemorySyncLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<NewSyncLog> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl SyncLog for MemorySyncLog {
    async fn append(&self, entry: NewSyncLog) -> Result<(), SyncError> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}
