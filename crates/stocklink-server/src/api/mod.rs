mod shopee;
mod sync;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use stocklink_core::MappingError;
use stocklink_db::DbError;
use stocklink_shopee::ShopeeError;
use stocklink_sync::{SyncError, SyncOrchestrator};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

/// Batch sizes and pauses applied when a request does not override them.
#[derive(Debug, Clone, Copy)]
pub struct SyncDefaults {
    pub sync_limit: usize,
    pub sync_delay_ms: u64,
    pub cron_max_products: usize,
    pub cron_delay_ms: u64,
}

impl SyncDefaults {
    #[must_use]
    pub fn from_app_config(config: &stocklink_core::AppConfig) -> Self {
        Self {
            sync_limit: config.sync_limit,
            sync_delay_ms: config.sync_delay_ms,
            cron_max_products: config.cron_max_products,
            cron_delay_ms: config.cron_delay_ms,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sync: SyncOrchestrator,
    pub redirect_url: String,
    pub defaults: SyncDefaults,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub message: String,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    authorized_shops: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn ok(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: code.into(),
            message: message.into(),
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "configuration_error" => StatusCode::UNPROCESSABLE_ENTITY,
            "upstream_error" | "decode_error" => StatusCode::BAD_GATEWAY,
            "transport_error" => StatusCode::GATEWAY_TIMEOUT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, 200)
}

const MAX_DELAY_MS: u64 = 60_000;

/// Per-item pause, capped at one minute.
pub(super) fn normalize_delay(delay_ms: Option<u64>, default: u64) -> Duration {
    Duration::from_millis(delay_ms.unwrap_or(default).min(MAX_DELAY_MS))
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    if let DbError::Mapping(mapping) = error {
        return map_mapping_error(request_id, mapping);
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_mapping_error(request_id: String, error: &MappingError) -> ApiError {
    match error {
        MappingError::NotFound { .. } => ApiError::new(request_id, "not_found", error.to_string()),
        MappingError::Invalid { .. } => {
            ApiError::new(request_id, "configuration_error", error.to_string())
        }
        MappingError::Validation(_) => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        MappingError::Io { .. } | MappingError::Serialize(_) => {
            tracing::error!(error = %error, "mapping store failed");
            ApiError::new(request_id, "internal_error", "mapping store failed")
        }
    }
}

pub(super) fn map_shopee_error(request_id: String, error: &ShopeeError) -> ApiError {
    let code = match error {
        ShopeeError::Unauthenticated { .. } => "unauthorized",
        ShopeeError::ItemNotFound { .. } => "not_found",
        ShopeeError::InvalidRequest(_) => "validation_error",
        ShopeeError::Api { .. } | ShopeeError::Upstream { .. } | ShopeeError::MissingToken { .. } => {
            "upstream_error"
        }
        ShopeeError::Decode { .. } => "decode_error",
        ShopeeError::Transport(_) => "transport_error",
        ShopeeError::InvalidBaseUrl { .. } | ShopeeError::TokenStore(_) => {
            tracing::error!(error = %error, "shopee client failed");
            return ApiError::new(request_id, "internal_error", "shopee client failed");
        }
    };
    tracing::warn!(error = %error, code, "shopee request failed");
    ApiError::new(request_id, code, error.to_string())
}

pub(super) fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    match error {
        SyncError::Mapping(e) => map_mapping_error(request_id, e),
        SyncError::Shopee(e) => map_shopee_error(request_id, e),
        SyncError::Db(e) => map_db_error(request_id, e),
        SyncError::ProductNotFound { .. } => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        SyncError::MissingItemId { .. } | SyncError::InvalidItemId { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        SyncError::NoStockLocations { .. } | SyncError::EmptyPayload { .. } => {
            ApiError::new(request_id, "upstream_error", error.to_string())
        }
    }
}

/// Decodes a JSON request body, reporting malformed input as a validation
/// error.
pub(super) fn parse_json_body<T: DeserializeOwned>(
    request_id: &str,
    body: &Bytes,
) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("invalid request body: {e}"),
        )
    })
}

/// Like [`parse_json_body`] but an empty body yields the default value.
pub(super) fn parse_optional_body<T: DeserializeOwned + Default>(
    request_id: &str,
    body: &Bytes,
) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_json_body(request_id, body)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/shopee/status", get(shopee::token_status))
        .route("/api/v1/shopee/{shop_id}/items", get(shopee::list_items))
        .route(
            "/api/v1/shopee/{shop_id}/items/details",
            get(shopee::list_items_with_details),
        )
        .route(
            "/api/v1/shopee/{shop_id}/base-info",
            get(shopee::item_base_info),
        )
        .route(
            "/api/v1/shopee/{shop_id}/stock-helper/{item_id}",
            get(shopee::stock_helper),
        )
        .route("/api/v1/shopee/{shop_id}/stock", post(shopee::update_stock))
        .route("/api/v1/shopee/{shop_id}/shop-info", get(shopee::shop_info))
        .route("/api/v1/sync/analyze", get(sync::analyze_tables))
        .route("/api/v1/sync/mapping", post(sync::setup_mapping))
        .route("/api/v1/sync/{shop_id}/status", get(sync::sync_status))
        .route("/api/v1/sync/{shop_id}/test", get(sync::test_sync))
        .route("/api/v1/sync/{shop_id}/run", post(sync::run_sync))
        .route(
            "/api/v1/sync/{shop_id}/products/{product_id}",
            post(sync::sync_product),
        )
        .route("/api/v1/sync/{shop_id}/cron", post(sync::cron_sync))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/shopee/auth", get(shopee::authorize))
        .route("/api/v1/shopee/callback", get(shopee::callback));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let authorized_shops = match state.sync.client().tokens().statuses().await {
        Ok(statuses) => statuses.iter().filter(|s| s.is_valid).count(),
        Err(e) => {
            tracing::warn!(error = %e, "health check: token store unavailable");
            0
        }
    };

    match state.sync.products().ping().await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::ok(
                HealthData {
                    status: "ok",
                    database: "ok",
                    authorized_shops,
                },
                req_id.0,
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    success: false,
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                        authorized_shops,
                    },
                    meta: ResponseMeta::new(req_id.0),
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
