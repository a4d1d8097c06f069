//! Live integration tests for stocklink-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database from the sqlx
//! test harness, so they need `DATABASE_URL` pointing at a server the test
//! user may create databases on. Run with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use stocklink_core::{ColumnMappings, MappingConfig};
use stocklink_db::{
    analyze_product_tables, count_sync_candidates, get_shop_token, get_sync_candidate,
    insert_sync_log, list_shop_tokens, list_sync_candidates, list_sync_logs, sync_stats,
    update_product_stock, upsert_shop_token, DbError, MappedTable, NewSyncLog,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Creates a merchant-style `barang` table with four rows, one of them
/// inactive and one without a Shopee id.
async fn seed_barang(pool: &sqlx::PgPool) {
    sqlx::query(
        "CREATE TABLE barang ( \
             kode      TEXT PRIMARY KEY, \
             nama      TEXT NOT NULL, \
             stok      INTEGER NOT NULL, \
             shopee_id BIGINT, \
             sku       TEXT, \
             aktif     BOOLEAN NOT NULL DEFAULT TRUE, \
             diubah    TIMESTAMPTZ \
         )",
    )
    .execute(pool)
    .await
    .expect("create barang failed");

    sqlx::query(
        "INSERT INTO barang (kode, nama, stok, shopee_id, sku, aktif, diubah) VALUES \
             ('B1', 'Kopi', 10, 1001, 'K-1', TRUE,  NOW() - INTERVAL '1 day'), \
             ('B2', 'Teh',   0, 1002, 'T-1', TRUE,  NOW()), \
             ('B3', 'Gula',  5, NULL, NULL,  TRUE,  NOW() - INTERVAL '2 days'), \
             ('B4', 'Susu',  8, 1004, 'S-1', FALSE, NOW())",
    )
    .execute(pool)
    .await
    .expect("insert barang failed");
}

fn barang_table(where_condition: Option<&str>) -> MappedTable {
    let now = Utc::now();
    let config = MappingConfig {
        shop_id: 7,
        table_name: "barang".to_string(),
        column_mappings: ColumnMappings {
            product_id: "kode".to_string(),
            product_name: "nama".to_string(),
            stock_quantity: "stok".to_string(),
            shopee_item_id: "shopee_id".to_string(),
            sku: "sku".to_string(),
            last_updated: "diubah".to_string(),
        },
        where_condition: where_condition.map(str::to_string),
        created_at: now,
        updated_at: now,
    };
    MappedTable::from_config(&config).expect("mapping should validate")
}

fn log_entry(product_id: &str, success: bool) -> NewSyncLog {
    NewSyncLog {
        shop_id: 7,
        product_id: product_id.to_string(),
        shopee_item_id: Some("1001".to_string()),
        action: "sync_stock".to_string(),
        old_stock: None,
        new_stock: success.then_some(10),
        success,
        error_message: (!success).then(|| "Shopee update failed".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Section 1: Mapped product queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn candidates_respect_filter_and_recency(pool: sqlx::PgPool) {
    seed_barang(&pool).await;
    let table = barang_table(Some("aktif = true"));

    let rows = list_sync_candidates(&pool, &table, None)
        .await
        .expect("list_sync_candidates failed");
    let ids: Vec<&str> = rows.iter().map(|r| r.product_id.as_str()).collect();
    assert_eq!(ids, ["B2", "B1", "B3"]);

    let first = &rows[1];
    assert_eq!(first.product_name.as_deref(), Some("Kopi"));
    assert_eq!(first.current_stock, 10);
    assert_eq!(first.shopee_item_id.as_deref(), Some("1001"));
    assert!(rows[2].shopee_item_id.is_none());

    let limited = list_sync_candidates(&pool, &table, Some(2))
        .await
        .expect("limited list failed");
    assert_eq!(limited.len(), 2);

    let count = count_sync_candidates(&pool, &table)
        .await
        .expect("count failed");
    assert_eq!(count, 3);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn lookup_by_id_ignores_filter(pool: sqlx::PgPool) {
    seed_barang(&pool).await;
    let table = barang_table(Some("aktif = true"));

    let inactive = get_sync_candidate(&pool, &table, "B4")
        .await
        .expect("lookup failed")
        .expect("B4 should be found");
    assert_eq!(inactive.product_name.as_deref(), Some("Susu"));

    let missing = get_sync_candidate(&pool, &table, "nope")
        .await
        .expect("lookup failed");
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn update_stock_writes_quantity_and_timestamp(pool: sqlx::PgPool) {
    seed_barang(&pool).await;
    let table = barang_table(None);

    update_product_stock(&pool, &table, "B3", 42)
        .await
        .expect("update failed");
    let row = get_sync_candidate(&pool, &table, "B3")
        .await
        .expect("lookup failed")
        .expect("B3 should exist");
    assert_eq!(row.current_stock, 42);
    assert!(row.last_updated.is_some());

    let err = update_product_stock(&pool, &table, "nope", 1)
        .await
        .expect_err("missing row should fail");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn stats_count_ids_and_stock(pool: sqlx::PgPool) {
    seed_barang(&pool).await;

    let all = sync_stats(&pool, &barang_table(None))
        .await
        .expect("stats failed");
    assert_eq!(all.total_products, 4);
    assert_eq!(all.has_shopee_id, 3);
    assert_eq!(all.in_stock, 2);

    let active = sync_stats(&pool, &barang_table(Some("aktif = true")))
        .await
        .expect("stats failed");
    assert_eq!(active.total_products, 3);
    assert_eq!(active.in_stock, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn analysis_finds_product_like_tables(pool: sqlx::PgPool) {
    sqlx::query("CREATE TABLE product_master (id INTEGER PRIMARY KEY, qty INTEGER)")
        .execute(&pool)
        .await
        .expect("create failed");
    sqlx::query("INSERT INTO product_master VALUES (1, 5), (2, 6), (3, 7), (4, 8)")
        .execute(&pool)
        .await
        .expect("insert failed");

    let tables = analyze_product_tables(&pool).await.expect("analysis failed");
    let master = tables
        .iter()
        .find(|t| t.table_name == "product_master")
        .expect("product_master should be reported");
    assert_eq!(master.columns.len(), 2);
    assert_eq!(master.columns[0].column_name, "id");
    assert_eq!(master.sample_data.len(), 3);
    assert!(tables.iter().all(|t| t.table_name != "sync_logs"));
}

// ---------------------------------------------------------------------------
// Section 2: Shop tokens
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn shop_token_upsert_replaces_credentials(pool: sqlx::PgPool) {
    let expires = Utc::now() + Duration::hours(4);
    upsert_shop_token(&pool, 7, "access-1", "refresh-1", expires)
        .await
        .expect("first upsert failed");
    upsert_shop_token(&pool, 7, "access-2", "refresh-2", expires)
        .await
        .expect("second upsert failed");
    upsert_shop_token(&pool, 3, "access-3", "", expires)
        .await
        .expect("third upsert failed");

    let row = get_shop_token(&pool, 7)
        .await
        .expect("get failed")
        .expect("shop 7 should have a token");
    assert_eq!(row.access_token, "access-2");
    assert_eq!(row.refresh_token, "refresh-2");

    let shops: Vec<i64> = list_shop_tokens(&pool)
        .await
        .expect("list failed")
        .iter()
        .map(|r| r.shop_id)
        .collect();
    assert_eq!(shops, [3, 7]);

    assert!(get_shop_token(&pool, 99).await.expect("get failed").is_none());
}

// ---------------------------------------------------------------------------
// Section 3: Sync logs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn sync_logs_list_newest_first_per_shop(pool: sqlx::PgPool) {
    let first = insert_sync_log(&pool, &log_entry("B1", true))
        .await
        .expect("insert failed");
    let second = insert_sync_log(&pool, &log_entry("B2", false))
        .await
        .expect("insert failed");
    let mut other_shop = log_entry("B9", true);
    other_shop.shop_id = 8;
    insert_sync_log(&pool, &other_shop)
        .await
        .expect("insert failed");

    let rows = list_sync_logs(&pool, 7, 10).await.expect("list failed");
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, [second, first]);
    assert_eq!(rows[0].error_message.as_deref(), Some("Shopee update failed"));
    assert_eq!(rows[0].new_stock, None);
    assert_eq!(rows[1].new_stock, Some(10));

    let limited = list_sync_logs(&pool, 7, 1).await.expect("list failed");
    assert_eq!(limited.len(), 1);
}
