//! Shopee passthrough handlers.
//!
//! - `GET  /api/v1/shopee/auth`                              (public)
//! - `GET  /api/v1/shopee/callback`                          (public)
//! - `GET  /api/v1/shopee/status`
//! - `GET  /api/v1/shopee/{shop_id}/items`
//! - `GET  /api/v1/shopee/{shop_id}/items/details`
//! - `GET  /api/v1/shopee/{shop_id}/base-info`
//! - `GET  /api/v1/shopee/{shop_id}/stock-helper/{item_id}`
//! - `POST /api/v1/shopee/{shop_id}/stock`
//! - `GET  /api/v1/shopee/{shop_id}/shop-info`

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::Redirect,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stocklink_shopee::{
    ItemBaseInfo, ItemList, ItemListQuery, ItemListWithDetails, StockHelper, TokenStatus,
    UpdateStockRequest,
};

use crate::middleware::RequestId;

use super::{map_shopee_error, parse_json_body, ApiError, ApiResponse, AppState};

const TOKEN_PREVIEW_CHARS: usize = 10;
const DETAILS_PAGE_SIZE: i64 = 5;

#[derive(Debug, Deserialize)]
pub(super) struct CallbackQuery {
    pub code: Option<String>,
    pub shop_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CallbackData {
    shop_id: i64,
    access_token_preview: String,
    refresh_token_preview: String,
    expires_in: i64,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ItemsQuery {
    pub offset: Option<i64>,
    pub page_size: Option<i64>,
    pub item_status: Option<String>,
}

impl ItemsQuery {
    fn into_query(self, default_page_size: i64) -> ItemListQuery {
        let defaults = ItemListQuery::default();
        ItemListQuery {
            offset: self.offset.unwrap_or(defaults.offset),
            page_size: self.page_size.unwrap_or(default_page_size),
            item_status: self.item_status.unwrap_or(defaults.item_status),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BaseInfoQuery {
    pub item_ids: Option<String>,
}

fn preview(token: &str) -> String {
    let head: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
    format!("{head}...")
}

fn parse_item_ids(request_id: &str, raw: Option<&str>) -> Result<Vec<i64>, ApiError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        ApiError::new(request_id, "validation_error", "item_ids is required")
    })?;
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|id| {
            id.parse::<i64>().map_err(|_| {
                ApiError::new(
                    request_id,
                    "validation_error",
                    format!("invalid item id {id:?}"),
                )
            })
        })
        .collect()
}

pub(super) async fn authorize(State(state): State<AppState>) -> Redirect {
    let url = state.sync.client().auth_partner_url(&state.redirect_url);
    tracing::info!("redirecting to shopee authorization");
    Redirect::to(url.as_str())
}

pub(super) async fn callback(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<ApiResponse<CallbackData>>, ApiError> {
    let (Some(code), Some(shop_id)) = (query.code.filter(|c| !c.is_empty()), query.shop_id)
    else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "missing code or shop_id",
        ));
    };

    let grant = state
        .sync
        .client()
        .exchange_code(&code, shop_id)
        .await
        .map_err(|e| map_shopee_error(req_id.0.clone(), &e))?;

    tracing::info!(shop_id, expires_in = grant.expires_in, "shop authorized");
    Ok(ApiResponse::ok(
        CallbackData {
            shop_id: grant.shop_id,
            access_token_preview: preview(&grant.credentials.access_token),
            refresh_token_preview: preview(&grant.credentials.refresh_token),
            expires_in: grant.expires_in,
            expires_at: grant.credentials.expires_at,
        },
        req_id.0,
    ))
}

pub(super) async fn token_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<TokenStatus>>>, ApiError> {
    let statuses = state
        .sync
        .client()
        .tokens()
        .statuses()
        .await
        .map_err(|e| map_shopee_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(statuses, req_id.0))
}

pub(super) async fn list_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ApiResponse<ItemList>>, ApiError> {
    let query = query.into_query(ItemListQuery::default().page_size);
    let list = state
        .sync
        .client()
        .get_item_list(shop_id, &query)
        .await
        .map_err(|e| map_shopee_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(list, req_id.0))
}

pub(super) async fn list_items_with_details(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ApiResponse<ItemListWithDetails>>, ApiError> {
    let query = query.into_query(DETAILS_PAGE_SIZE);
    let list = state
        .sync
        .client()
        .item_list_with_details(shop_id, &query)
        .await
        .map_err(|e| map_shopee_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(list, req_id.0))
}

pub(super) async fn item_base_info(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    Query(query): Query<BaseInfoQuery>,
) -> Result<Json<ApiResponse<Vec<ItemBaseInfo>>>, ApiError> {
    let item_ids = parse_item_ids(&req_id.0, query.item_ids.as_deref())?;
    let items = state
        .sync
        .client()
        .get_item_base_info(shop_id, &item_ids)
        .await
        .map_err(|e| map_shopee_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(items, req_id.0))
}

pub(super) async fn stock_helper(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((shop_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<StockHelper>>, ApiError> {
    let helper = state
        .sync
        .client()
        .stock_helper(shop_id, item_id)
        .await
        .map_err(|e| map_shopee_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(helper, req_id.0))
}

pub(super) async fn update_stock(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    body: Bytes,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let request: UpdateStockRequest = parse_json_body(&req_id.0, &body)?;
    let response = state
        .sync
        .client()
        .update_stock(shop_id, &request)
        .await
        .map_err(|e| map_shopee_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(response, req_id.0))
}

pub(super) async fn shop_info(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let info = state
        .sync
        .client()
        .get_shop_info(shop_id)
        .await
        .map_err(|e| map_shopee_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(info, req_id.0))
}
