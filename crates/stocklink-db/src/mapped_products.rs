//! Queries against a merchant's own product table, shaped by a
//! [`MappingConfig`].
//!
//! Table and column names come from a validated mapping and are emitted
//! double-quoted; filter literals are always bound parameters. Every mapped
//! column is cast so the canonical row type decodes regardless of how the
//! local schema types it.

use sqlx::{PgPool, Postgres, QueryBuilder};
use stocklink_core::{
    ColumnMappings, FilterValue, MappingConfig, MappingError, Predicate, SyncCandidate, SyncStats,
    TableRef,
};

use crate::DbError;

/// A mapping resolved into SQL-safe parts.
#[derive(Debug, Clone)]
pub struct MappedTable {
    table: TableRef,
    columns: ColumnMappings,
    predicates: Vec<Predicate>,
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    product_id: Option<String>,
    product_name: Option<String>,
    current_stock: Option<i64>,
    shopee_item_id: Option<String>,
    sku: Option<String>,
    last_updated: Option<String>,
}

impl From<CandidateRow> for SyncCandidate {
    fn from(row: CandidateRow) -> Self {
        Self {
            product_id: row.product_id.unwrap_or_default(),
            product_name: row.product_name,
            current_stock: row.current_stock.unwrap_or(0),
            shopee_item_id: row.shopee_item_id,
            sku: row.sku,
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_products: i64,
    has_shopee_id: i64,
    in_stock: i64,
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.trim())
}

impl MappedTable {
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] if the stored table, columns, or
    /// row filter no longer pass validation.
    pub fn from_config(config: &MappingConfig) -> Result<Self, MappingError> {
        config.column_mappings.validate()?;
        Ok(Self {
            table: config.table_ref()?,
            columns: config.column_mappings.clone(),
            predicates: config.predicates()?,
        })
    }

    fn select_list(&self) -> String {
        let c = &self.columns;
        format!(
            "SELECT CAST({} AS TEXT) AS product_id, \
                    CAST({} AS TEXT) AS product_name, \
                    CAST({} AS BIGINT) AS current_stock, \
                    CAST({} AS TEXT) AS shopee_item_id, \
                    CAST({} AS TEXT) AS sku, \
                    CAST({} AS TEXT) AS last_updated \
             FROM {}",
            quote(&c.product_id),
            quote(&c.product_name),
            quote(&c.stock_quantity),
            quote(&c.shopee_item_id),
            quote(&c.sku),
            quote(&c.last_updated),
            self.table.quoted(),
        )
    }

    /// Appends ` WHERE ...` for the mapping filter, if any.
    fn push_filter(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(quote(&predicate.column));
            qb.push(" ");
            qb.push(predicate.op.as_sql());
            if let Some(value) = &predicate.value {
                qb.push(" ");
                match value {
                    FilterValue::Int(v) => qb.push_bind(*v),
                    FilterValue::Float(v) => qb.push_bind(*v),
                    FilterValue::Text(v) => qb.push_bind(v.clone()),
                    FilterValue::Bool(v) => qb.push_bind(*v),
                };
            }
        }
    }

    pub(crate) fn candidates_query(&self, limit: Option<i64>) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(self.select_list());
        self.push_filter(&mut qb);
        qb.push(" ORDER BY ");
        qb.push(quote(&self.columns.last_updated));
        qb.push(" DESC NULLS LAST");
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        qb
    }

    pub(crate) fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.table.quoted()));
        self.push_filter(&mut qb);
        qb
    }

    /// Lookup by a single column; the mapping filter does not apply.
    pub(crate) fn lookup_query(&self, column: &str, value: &str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(self.select_list());
        qb.push(" WHERE CAST(");
        qb.push(quote(column));
        qb.push(" AS TEXT) = ");
        qb.push_bind(value.to_string());
        qb.push(" LIMIT 1");
        qb
    }

    pub(crate) fn stats_query(&self) -> QueryBuilder<'static, Postgres> {
        let item = quote(&self.columns.shopee_item_id);
        let stock = quote(&self.columns.stock_quantity);
        let mut qb = QueryBuilder::new(format!(
            "SELECT COUNT(*) AS total_products, \
                    COUNT(CASE WHEN {item} IS NOT NULL THEN 1 END) AS has_shopee_id, \
                    COUNT(CASE WHEN {item} IS NOT NULL AND {stock} > 0 THEN 1 END) AS in_stock \
             FROM {}",
            self.table.quoted(),
        ));
        self.push_filter(&mut qb);
        qb
    }

    pub(crate) fn update_stock_query(
        &self,
        product_id: &str,
        new_stock: i64,
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", self.table.quoted()));
        qb.push(quote(&self.columns.stock_quantity));
        qb.push(" = ");
        qb.push_bind(new_stock);
        qb.push(", ");
        qb.push(quote(&self.columns.last_updated));
        qb.push(" = NOW() WHERE CAST(");
        qb.push(quote(&self.columns.product_id));
        qb.push(" AS TEXT) = ");
        qb.push_bind(product_id.to_string());
        qb
    }
}

/// Candidates in `last_updated` order, newest first. `limit = None` returns
/// every matching row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_candidates(
    pool: &PgPool,
    table: &MappedTable,
    limit: Option<i64>,
) -> Result<Vec<SyncCandidate>, DbError> {
    let mut qb = table.candidates_query(limit);
    let rows = qb
        .build_query_as::<CandidateRow>()
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(SyncCandidate::from).collect())
}

/// Number of rows that pass the mapping filter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_sync_candidates(pool: &PgPool, table: &MappedTable) -> Result<i64, DbError> {
    let mut qb = table.count_query();
    let count = qb
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_sync_candidate(
    pool: &PgPool,
    table: &MappedTable,
    product_id: &str,
) -> Result<Option<SyncCandidate>, DbError> {
    let mut qb = table.lookup_query(&table.columns.product_id, product_id);
    let row = qb
        .build_query_as::<CandidateRow>()
        .fetch_optional(pool)
        .await?;
    Ok(row.map(SyncCandidate::from))
}

/// Writes the synced quantity back and stamps `last_updated`.
///
/// # Errors
///
/// - [`DbError::NotFound`] if no row has that product id.
/// - [`DbError::Sqlx`] if the update fails.
pub async fn update_product_stock(
    pool: &PgPool,
    table: &MappedTable,
    product_id: &str,
    new_stock: i64,
) -> Result<(), DbError> {
    let mut qb = table.update_stock_query(product_id, new_stock);
    let result = qb.build().execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sync_stats(pool: &PgPool, table: &MappedTable) -> Result<SyncStats, DbError> {
    let mut qb = table.stats_query();
    let row = qb.build_query_as::<StatsRow>().fetch_one(pool).await?;
    Ok(SyncStats {
        total_products: row.total_products,
        has_shopee_id: row.has_shopee_id,
        in_stock: row.in_stock,
    })
}
