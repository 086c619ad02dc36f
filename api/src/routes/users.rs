//! Distributor administration and operation log endpoints

use axum::{
    extract::State,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::{DistributorSummary, OperationLogView, User};
use crate::services::accounts::{DistributorDetail, DistributorPatch};
use crate::types::{ApiResponse, Caller};
use crate::{error::ApiError, AppState};

use super::extract::{JsonBody, PathParam, QueryParams};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// GET /users/distributors
pub async fn list_distributors(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<DistributorSummary>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.accounts.list_distributors(&caller).await?,
    )))
}

/// GET /users/distributors/:id
pub async fn get_distributor(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ApiResponse<DistributorDetail>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.accounts.distributor_detail(&caller, id).await?,
    )))
}

/// PUT /users/distributors/:id
pub async fn update_distributor(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<DistributorPatch>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state.accounts.update_distributor(&caller, id, req).await?;
    Ok(Json(ApiResponse::with_message("Distributor updated", user)))
}

/// POST /users/distributors/:id/unlock
pub async fn unlock_settings(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.accounts.unlock_settings(&caller, id).await?;
    Ok(Json(ApiResponse::message("Settings unlocked")))
}

/// GET /users/logs
pub async fn operation_logs(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<LogQuery>,
) -> Result<Json<ApiResponse<Vec<OperationLogView>>>, ApiError> {
    let logs = state
        .accounts
        .operation_logs(&caller, query.start_date, query.end_date)
        .await?;
    Ok(Json(ApiResponse::success(logs)))
}
