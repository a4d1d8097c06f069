//! Append-only audit trail of per-product sync attempts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `sync_logs` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SyncLogRow {
    pub id: i64,
    pub shop_id: i64,
    pub product_id: String,
    pub shopee_item_id: Option<String>,
    pub action: String,
    pub old_stock: Option<i64>,
    pub new_stock: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input to [`insert_sync_log`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncLog {
    pub shop_id: i64,
    pub product_id: String,
    pub shopee_item_id: Option<String>,
    pub action: String,
    pub old_stock: Option<i64>,
    pub new_stock: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Appends one entry and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_sync_log(pool: &PgPool, entry: &NewSyncLog) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO sync_logs \
             (shop_id, product_id, shopee_item_id, action, old_stock, new_stock, success, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(entry.shop_id)
    .bind(&entry.product_id)
    .bind(entry.shopee_item_id.as_deref())
    .bind(&entry.action)
    .bind(entry.old_stock)
    .bind(entry.new_stock)
    .bind(entry.success)
    .bind(entry.error_message.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Most recent entries for a shop, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_logs(
    pool: &PgPool,
    shop_id: i64,
    limit: i64,
) -> Result<Vec<SyncLogRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncLogRow>(
        "SELECT id, shop_id, product_id, shopee_item_id, action, old_stock, new_stock, \
                success, error_message, created_at \
         FROM sync_logs \
         WHERE shop_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(shop_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
