//! Stock sync handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use stocklink_core::NewMapping;
use stocklink_db::TableAnalysis;
use stocklink_sync::{
    CronSummary, MappingSetup, NextRun, ScheduledRun, SyncOutcome, SyncPreview, SyncStatusReport,
    SyncSummary,
};

use crate::middleware::RequestId;

use super::{
    map_sync_error, normalize_delay, normalize_limit, parse_json_body, parse_optional_body,
    ApiError, ApiResponse, AppState, ResponseMeta,
};

const PREVIEW_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub(super) struct TestQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RunSyncRequest {
    pub limit: Option<usize>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CronRequest {
    pub max_products: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct TestSyncData {
    shop_id: i64,
    test_mode: bool,
    #[serde(flatten)]
    preview: SyncPreview,
}

#[derive(Debug, Serialize)]
pub(super) struct RunSyncData {
    shop_id: i64,
    sync_completed: bool,
    summary: SyncSummary,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductSyncData {
    shop_id: i64,
    product_id: String,
    sync_result: SyncOutcome,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum CronData {
    Skipped {
        shop_id: i64,
        message: &'static str,
    },
    Completed {
        shop_id: i64,
        cron_summary: CronSummary,
        next_run_recommendation: NextRun,
    },
}

pub(super) async fn analyze_tables(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<TableAnalysis>>>, ApiError> {
    let tables = state
        .sync
        .analyze()
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(tables, req_id.0))
}

pub(super) async fn setup_mapping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ApiResponse<MappingSetup>>, ApiError> {
    let input: NewMapping = parse_json_body(&req_id.0, &body)?;
    let setup = state
        .sync
        .setup_mapping(input)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(setup, req_id.0))
}

pub(super) async fn sync_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
) -> Result<Json<ApiResponse<SyncStatusReport>>, ApiError> {
    let report = state
        .sync
        .status(shop_id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(report, req_id.0))
}

pub(super) async fn test_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    Query(query): Query<TestQuery>,
) -> Result<Json<ApiResponse<TestSyncData>>, ApiError> {
    let preview = state
        .sync
        .preview(shop_id, normalize_limit(query.limit, PREVIEW_LIMIT))
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(
        TestSyncData {
            shop_id,
            test_mode: true,
            preview,
        },
        req_id.0,
    ))
}

pub(super) async fn run_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    body: Bytes,
) -> Result<Json<ApiResponse<RunSyncData>>, ApiError> {
    let request: RunSyncRequest = parse_optional_body(&req_id.0, &body)?;
    let limit = normalize_limit(request.limit, state.defaults.sync_limit);
    let delay = normalize_delay(request.delay_ms, state.defaults.sync_delay_ms);

    let summary = state
        .sync
        .run_sync(shop_id, limit, delay)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(
        RunSyncData {
            shop_id,
            sync_completed: true,
            summary,
        },
        req_id.0,
    ))
}

pub(super) async fn sync_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((shop_id, product_id)): Path<(i64, String)>,
) -> Result<Json<ApiResponse<ProductSyncData>>, ApiError> {
    let outcome = state
        .sync
        .sync_product(shop_id, &product_id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        success: outcome.success,
        data: ProductSyncData {
            shop_id,
            product_id,
            sync_result: outcome,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn cron_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    body: Bytes,
) -> Result<Json<ApiResponse<CronData>>, ApiError> {
    let request: CronRequest = parse_optional_body(&req_id.0, &body)?;
    let max_products = normalize_limit(request.max_products, state.defaults.cron_max_products);
    let delay = normalize_delay(None, state.defaults.cron_delay_ms);

    let run = state
        .sync
        .run_scheduled(shop_id, max_products, delay)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    let (success, data) = match run {
        ScheduledRun::NoValidToken => (
            false,
            CronData::Skipped {
                shop_id,
                message: "No valid token, sync skipped",
            },
        ),
        ScheduledRun::Completed { summary, next_run } => (
            true,
            CronData::Completed {
                shop_id,
                cron_summary: summary,
                next_run_recommendation: next_run,
            },
        ),
    };
    Ok(Json(ApiResponse {
        success,
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
