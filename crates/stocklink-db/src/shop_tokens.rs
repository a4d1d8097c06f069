//! Database operations for `shop_tokens`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `shop_tokens` table.
#[derive(Clone, sqlx::FromRow)]
pub struct ShopTokenRow {
    pub shop_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShopTokenRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopTokenRow")
            .field("shop_id", &self.shop_id)
            .field("expires_at", &self.expires_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Inserts or replaces the credentials for a shop.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_shop_token(
    pool: &PgPool,
    shop_id: i64,
    access_token: &str,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO shop_tokens (shop_id, access_token, refresh_token, expires_at) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (shop_id) DO UPDATE \
         SET access_token = EXCLUDED.access_token, \
             refresh_token = EXCLUDED.refresh_token, \
             expires_at = EXCLUDED.expires_at, \
             updated_at = NOW()",
    )
    .bind(shop_id)
    .bind(access_token)
    .bind(refresh_token)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_shop_token(pool: &PgPool, shop_id: i64) -> Result<Option<ShopTokenRow>, DbError> {
    let row = sqlx::query_as::<_, ShopTokenRow>(
        "SELECT shop_id, access_token, refresh_token, expires_at, updated_at \
         FROM shop_tokens WHERE shop_id = $1",
    )
    .bind(shop_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shop_tokens(pool: &PgPool) -> Result<Vec<ShopTokenRow>, DbError> {
    let rows = sqlx::query_as::<_, ShopTokenRow>(
        "SELECT shop_id, access_token, refresh_token, expires_at, updated_at \
         FROM shop_tokens ORDER BY shop_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
