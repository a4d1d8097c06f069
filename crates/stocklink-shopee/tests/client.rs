//! Integration tests for `ShopeeClient` using wiremock HTTP mocks.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use stocklink_shopee::{
    Clock, ItemListQuery, MemoryTokenStore, SellerStockUpdate, ShopeeClient, ShopeeError, Signer,
    StockListEntry, TokenManager, UpdateStockRequest,
};
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PARTNER_ID: i64 = 2_012_584;
const PARTNER_KEY: &str = "test-partner-key";
const SHOP_ID: i64 = 37_419_605;
const NOW_TS: i64 = 1_700_000_000;

fn fixed_clock() -> Clock {
    let now = Utc.timestamp_opt(NOW_TS, 0).unwrap();
    Arc::new(move || now)
}

fn test_client(base_url: &str) -> ShopeeClient {
    let tokens = TokenManager::with_clock(Arc::new(MemoryTokenStore::new()), fixed_clock());
    ShopeeClient::with_base_url(
        Signer::new(PARTNER_ID, PARTNER_KEY),
        tokens,
        30,
        base_url,
        None,
    )
    .expect("client construction should not fail")
}

async fn authorized_client(base_url: &str) -> ShopeeClient {
    let client = test_client(base_url);
    client
        .tokens()
        .set(SHOP_ID, "tok-abc", "ref-abc", Some(14_400))
        .await
        .expect("token stored");
    client
}

#[tokio::test]
async fn get_item_list_sends_signed_shop_request() {
    let server = MockServer::start().await;
    let client = authorized_client(&server.uri()).await;
    let expected_sign = client.signer().sign(
        "/api/v2/product/get_item_list",
        NOW_TS,
        "tok-abc",
        &SHOP_ID.to_string(),
    );

    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_list"))
        .and(query_param("partner_id", PARTNER_ID.to_string()))
        .and(query_param("timestamp", NOW_TS.to_string()))
        .and(query_param("access_token", "tok-abc"))
        .and(query_param("shop_id", SHOP_ID.to_string()))
        .and(query_param("sign", expected_sign.as_str()))
        .and(query_param("offset", "0"))
        .and(query_param("page_size", "20"))
        .and(query_param("item_status", "NORMAL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "message": "",
            "request_id": "r1",
            "response": {
                "item": [
                    {"item_id": 18_329_949_601_i64, "item_status": "NORMAL", "update_time": 1},
                    {"item_id": 42, "item_status": "NORMAL"}
                ],
                "total_count": 2,
                "has_next_page": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = client
        .get_item_list(SHOP_ID, &ItemListQuery::default())
        .await
        .expect("item list");

    assert_eq!(list.total_count, 2);
    assert_eq!(list.item.len(), 2);
    assert_eq!(list.item[0].item_id, 18_329_949_601);
    assert_eq!(list.item[0].extra["update_time"], 1);
}

#[tokio::test]
async fn shop_call_without_token_never_reaches_shopee() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.get_shop_info(SHOP_ID).await.unwrap_err();
    assert!(
        matches!(err, ShopeeError::Unauthenticated { shop_id, .. } if shop_id == SHOP_ID),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn expired_token_is_refused_locally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // Issue a one-second token at NOW_TS, then read it through a clock
    // that is already past expiry.
    let store = Arc::new(MemoryTokenStore::new());
    TokenManager::with_clock(store.clone(), fixed_clock())
        .set(SHOP_ID, "tok-old", "ref", Some(1))
        .await
        .expect("stored");
    let later = Utc.timestamp_opt(NOW_TS + 5, 0).unwrap();
    let client = ShopeeClient::with_base_url(
        Signer::new(PARTNER_ID, PARTNER_KEY),
        TokenManager::with_clock(store, Arc::new(move || later)),
        30,
        &server.uri(),
        None,
    )
    .expect("client");

    let err = client.get_shop_info(SHOP_ID).await.unwrap_err();
    assert!(matches!(err, ShopeeError::Unauthenticated { .. }), "{err}");
}

#[tokio::test]
async fn api_error_envelope_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_base_info"))
        .and(query_param("item_id_list", "999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "error_param",
            "message": "Item not found",
            "request_id": "r2"
        })))
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    let err = client.get_item(SHOP_ID, 999).await.unwrap_err();
    match err {
        ShopeeError::Api { code, message } => {
            assert_eq!(code, "error_param");
            assert_eq!(message, "Item not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/shop/get_shop_info"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    match client.get_shop_info(SHOP_ID).await.unwrap_err() {
        ShopeeError::Upstream { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected Upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/shop/get_shop_info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    assert!(matches!(
        client.get_shop_info(SHOP_ID).await,
        Err(ShopeeError::Decode { .. })
    ));
}

#[tokio::test]
async fn get_item_base_info_joins_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_base_info"))
        .and(query_param("item_id_list", "42,43"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "message": "",
            "response": {
                "item_list": [
                    {"item_id": 42, "item_name": "Kopi Bubuk"},
                    {"item_id": 43, "item_name": "Teh Celup"}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    let items = client
        .get_item_base_info(SHOP_ID, &[42, 43])
        .await
        .expect("base info");
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].item_name.as_deref(), Some("Teh Celup"));
}

#[tokio::test]
async fn update_stock_posts_typed_body() {
    let server = MockServer::start().await;
    let request = UpdateStockRequest {
        item_id: 42,
        stock_list: vec![StockListEntry {
            model_id: 0,
            seller_stock: vec![SellerStockUpdate {
                location_id: "IDZ".to_string(),
                stock: 12,
            }],
        }],
    };

    Mock::given(method("POST"))
        .and(path("/api/v2/product/update_stock"))
        .and(query_param("shop_id", SHOP_ID.to_string()))
        .and(body_json(serde_json::json!({
            "item_id": 42,
            "stock_list": [{"model_id": 0, "seller_stock": [{"location_id": "IDZ", "stock": 12}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "message": "",
            "response": {"success_list": [{"model_id": 0, "stock": 12}], "failure_list": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    let body = client
        .update_stock(SHOP_ID, &request)
        .await
        .expect("update ok");
    assert_eq!(body["response"]["success_list"][0]["stock"], 12);
}

#[tokio::test]
async fn update_stock_rejects_empty_list_without_calling_shopee() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    let request = UpdateStockRequest {
        item_id: 42,
        stock_list: vec![],
    };
    assert!(matches!(
        client.update_stock(SHOP_ID, &request).await,
        Err(ShopeeError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn exchange_code_stores_tokens() {
    let server = MockServer::start().await;
    let client = test_client(&server.uri());
    let expected_sign = client
        .signer()
        .sign("/api/v2/auth/token/get", NOW_TS, "", "");

    Mock::given(method("POST"))
        .and(path("/api/v2/auth/token/get"))
        .and(query_param("partner_id", PARTNER_ID.to_string()))
        .and(query_param("sign", expected_sign.as_str()))
        .and(query_param_is_missing("access_token"))
        .and(body_json(serde_json::json!({
            "code": "abc123",
            "partner_id": PARTNER_ID,
            "shop_id": SHOP_ID
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "message": "",
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expire_in": 14_400
        })))
        .expect(1)
        .mount(&server)
        .await;

    let grant = client
        .exchange_code("abc123", SHOP_ID)
        .await
        .expect("exchange ok");
    assert_eq!(grant.expires_in, 14_400);
    assert!(client.tokens().is_valid(SHOP_ID).await.unwrap());
    let status = client.tokens().status(SHOP_ID).await.unwrap();
    assert!(status.has_refresh_token);
    assert_eq!(status.expires_in_seconds, 14_400);
}

#[tokio::test]
async fn exchange_code_without_expiry_uses_default_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/token/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let grant = client.exchange_code("c", SHOP_ID).await.expect("ok");
    assert_eq!(grant.expires_in, 14_400);
}

#[tokio::test]
async fn exchange_code_rejected_leaves_shop_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/token/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "error_auth",
            "message": "Invalid code"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    assert!(matches!(
        client.exchange_code("bad", SHOP_ID).await,
        Err(ShopeeError::Api { .. })
    ));
    assert!(!client.tokens().is_valid(SHOP_ID).await.unwrap());
}

#[tokio::test]
async fn exchange_code_missing_token_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/token/get"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "", "message": ""})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    assert!(matches!(
        client.exchange_code("c", SHOP_ID).await,
        Err(ShopeeError::MissingToken { .. })
    ));
}

#[test]
fn auth_partner_url_is_partner_signed() {
    let client = test_client("https://partner.test-stable.shopeemobile.com");
    let url = client.auth_partner_url("https://shop.example/callback");
    let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

    assert_eq!(url.path(), "/api/v2/shop/auth_partner");
    assert_eq!(pairs["partner_id"], PARTNER_ID.to_string());
    assert_eq!(pairs["timestamp"], NOW_TS.to_string());
    assert_eq!(pairs["redirect"], "https://shop.example/callback");
    assert_eq!(
        pairs["sign"],
        client
            .signer()
            .sign("/api/v2/shop/auth_partner", NOW_TS, "", "")
    );
}

#[tokio::test]
async fn item_list_with_details_merges_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "response": {
                "item": [{"item_id": 1}, {"item_id": 2}],
                "total_count": 7,
                "has_next_page": true
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_base_info"))
        .and(query_param("item_id_list", "1,2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "response": {"item_list": [{"item_id": 2, "item_name": "Dua"}]}
        })))
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    let page = client
        .item_list_with_details(SHOP_ID, &ItemListQuery::default())
        .await
        .expect("page");

    assert_eq!(page.total_count, 7);
    assert!(page.has_next_page);
    assert!(!page.items[0].has_details);
    assert!(page.items[1].has_details);
    assert_eq!(
        page.items[1].details.as_ref().and_then(|d| d.item_name.as_deref()),
        Some("Dua")
    );
}

#[tokio::test]
async fn item_list_with_details_tags_refused_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "response": {"item": [{"item_id": 1}], "total_count": 1}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_base_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "error_server",
            "message": "busy"
        })))
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    let page = client
        .item_list_with_details(SHOP_ID, &ItemListQuery::default())
        .await
        .expect("page");
    assert_eq!(page.items.len(), 1);
    assert!(page.items[0]
        .detail_error
        .as_deref()
        .is_some_and(|e| e.contains("busy")));
}

#[tokio::test]
async fn stock_helper_builds_template_from_current_stock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_base_info"))
        .and(query_param("item_id_list", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "response": {"item_list": [{
                "item_id": 42,
                "stock_info_v2": {
                    "summary_info": {"total_reserved_stock": 1, "total_available_stock": 8},
                    "seller_stock": [{"stock": [
                        {"location_id": "L1", "stock": 5},
                        {"location_id": "L2", "stock": 3}
                    ]}]
                }
            }]}
        })))
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    let helper = client.stock_helper(SHOP_ID, 42).await.expect("helper");
    assert_eq!(helper.summary.total_available_stock, 8);
    assert_eq!(helper.update_template.stock_list.len(), 1);
    assert_eq!(helper.update_template.stock_list[0].seller_stock[0].stock, 5);
    assert_eq!(helper.update_template.stock_list[0].seller_stock[1].stock, 3);
}

#[tokio::test]
async fn stock_helper_reports_missing_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/product/get_item_base_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "",
            "response": {"item_list": []}
        })))
        .mount(&server)
        .await;

    let client = authorized_client(&server.uri()).await;
    assert!(matches!(
        client.stock_helper(SHOP_ID, 42).await,
        Err(ShopeeError::ItemNotFound { item_id: 42, .. })
    ));
}

#[tokio::test]
async fn get_item_list_rejects_oversized_page() {
    let client = test_client("http://127.0.0.1:9");
    let query = ItemListQuery {
        page_size: 500,
        ..ItemListQuery::default()
    };
    assert!(matches!(
        client.get_item_list(SHOP_ID, &query).await,
        Err(ShopeeError::InvalidRequest(_))
    ));
}
