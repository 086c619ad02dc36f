//! Ledger record endpoints

use axum::{
    extract::State,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::{AccountingRecord, AccountingRecordView};
use crate::services::ledger::{LedgerStatistics, RecordInput, RecordQuery};
use crate::types::{ApiResponse, Caller};
use crate::{error::ApiError, AppState};

use super::extract::{JsonBody, PathParam, QueryParams};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// GET /accounting
pub async fn list_records(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<RecordQuery>,
) -> Result<Json<ApiResponse<Vec<AccountingRecordView>>>, ApiError> {
    Ok(Json(ApiResponse::success(state.ledger.list(&caller, query).await?)))
}

/// POST /accounting
///
/// 수수료/순수익은 서버에서 계산 (대리점 비율 기준)
pub async fn create_record(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<RecordInput>,
) -> Result<Json<ApiResponse<AccountingRecord>>, ApiError> {
    let record = state.ledger.create(&caller, req).await?;
    Ok(Json(ApiResponse::with_message("Record created", record)))
}

/// PUT /accounting/:id
pub async fn update_record(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<RecordInput>,
) -> Result<Json<ApiResponse<AccountingRecord>>, ApiError> {
    let record = state.ledger.update(&caller, id, req).await?;
    Ok(Json(ApiResponse::with_message("Record updated", record)))
}

/// DELETE /accounting/:id (관리자 전용)
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.ledger.delete(&caller, id).await?;
    Ok(Json(ApiResponse::message("Record deleted")))
}

/// GET /accounting/statistics
pub async fn statistics(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<StatisticsQuery>,
) -> Result<Json<ApiResponse<LedgerStatistics>>, ApiError> {
    let stats = state
        .ledger
        .statistics(&caller, query.start_date, query.end_date)
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}
