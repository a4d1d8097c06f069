//! Discovery of local tables that look like product catalogs, to help an
//! operator write a mapping.

use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

const SAMPLE_ROWS: i64 = 3;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableAnalysis {
    pub schema: String,
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    pub sample_data: Vec<Value>,
}

#[derive(Debug, sqlx::FromRow)]
struct TableName {
    table_schema: String,
    table_name: String,
}

/// Double-quotes a catalog-supplied identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Base tables in the current search path whose names contain `product`,
/// `item`, or `stock`, each with its columns and up to three sample rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any catalog or sample query fails.
pub async fn analyze_product_tables(pool: &PgPool) -> Result<Vec<TableAnalysis>, DbError> {
    let tables = sqlx::query_as::<_, TableName>(
        "SELECT table_schema::text AS table_schema, table_name::text AS table_name \
         FROM information_schema.tables \
         WHERE table_type = 'BASE TABLE' \
           AND table_schema = ANY (current_schemas(false)) \
           AND (table_name ILIKE '%product%' \
                OR table_name ILIKE '%item%' \
                OR table_name ILIKE '%stock%') \
         ORDER BY table_schema, table_name",
    )
    .fetch_all(pool)
    .await?;

    let mut analysis = Vec::with_capacity(tables.len());
    for table in tables {
        let columns = sqlx::query_as::<_, ColumnInfo>(
            "SELECT column_name::text AS column_name, data_type::text AS data_type, \
                    (is_nullable = 'YES') AS is_nullable, column_default::text AS column_default \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
        )
        .bind(&table.table_schema)
        .bind(&table.table_name)
        .fetch_all(pool)
        .await?;

        let sample_sql = format!(
            "SELECT row_to_json(t) FROM {}.{} AS t LIMIT $1",
            quote_ident(&table.table_schema),
            quote_ident(&table.table_name),
        );
        let sample_data = sqlx::query_scalar::<_, Value>(&sample_sql)
            .bind(SAMPLE_ROWS)
            .fetch_all(pool)
            .await?;

        tracing::debug!(
            schema = %table.table_schema,
            table = %table.table_name,
            columns = columns.len(),
            "analyzed candidate product table"
        );
        analysis.push(TableAnalysis {
            schema: table.table_schema,
            table_name: table.table_name,
            columns,
            sample_data,
        });
    }

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_escapes_embedded_quotes() {
        assert_eq!(quote_ident("products"), "\"products\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
