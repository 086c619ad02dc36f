//! Member Endpoints
//!
//! 대리점은 본인 회원만 조회/수정 가능 (서비스 레이어에서 판정)

use axum::{
    extract::State,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::MemberView;
use crate::services::members::{MemberDetail, MemberInput, MemberQuery};
use crate::services::BatchOutcome;
use crate::types::{ApiResponse, Caller};
use crate::{error::ApiError, AppState};

use super::extract::{JsonBody, PathParam, QueryParams};

// ============ Request Types ============

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAmountRequest {
    pub member_ids: Vec<i64>,
    pub monthly_amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkContractRequest {
    pub member_ids: Vec<i64>,
    pub sign_date: NaiveDate,
    pub years: u32,
}

// ============ Handlers ============

/// GET /members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<MemberQuery>,
) -> Result<Json<ApiResponse<Vec<MemberView>>>, ApiError> {
    Ok(Json(ApiResponse::success(state.members.list(&caller, query).await?)))
}

/// POST /members
pub async fn create_member(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<MemberInput>,
) -> Result<Json<ApiResponse<MemberView>>, ApiError> {
    let member = state.members.create(&caller, req).await?;
    Ok(Json(ApiResponse::with_message("Member created", member)))
}

/// GET /members/:id
pub async fn get_member(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ApiResponse<MemberDetail>>, ApiError> {
    Ok(Json(ApiResponse::success(state.members.get(&caller, id).await?)))
}

/// PUT /members/:id
pub async fn update_member(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<MemberInput>,
) -> Result<Json<ApiResponse<MemberView>>, ApiError> {
    let member = state.members.update(&caller, id, req).await?;
    Ok(Json(ApiResponse::with_message("Member updated", member)))
}

/// DELETE /members/:id
///
/// 계약, 청구서, 장부 기록까지 함께 삭제
pub async fn delete_member(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.members.delete(&caller, id).await?;
    Ok(Json(ApiResponse::message("Member deleted")))
}

/// GET /members/expiring?days=30
pub async fn expiring_documents(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<ExpiringQuery>,
) -> Result<Json<ApiResponse<Vec<MemberView>>>, ApiError> {
    let members = state
        .members
        .expiring_documents(&caller, query.days.unwrap_or(30))
        .await?;
    Ok(Json(ApiResponse::success(members)))
}

/// POST /members/bulk/amount
pub async fn bulk_set_amount(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<BulkAmountRequest>,
) -> Result<Json<ApiResponse<BatchOutcome>>, ApiError> {
    let outcome = state
        .labor
        .bulk_set_amount(&caller, &req.member_ids, req.monthly_amount)
        .await?;
    Ok(Json(ApiResponse::with_message(
        format!("{} succeeded, {} failed", outcome.succeeded, outcome.failed),
        outcome,
    )))
}

/// POST /members/bulk/contract
pub async fn bulk_set_contract(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<BulkContractRequest>,
) -> Result<Json<ApiResponse<BatchOutcome>>, ApiError> {
    let outcome = state
        .labor
        .bulk_set_contract(&caller, &req.member_ids, req.sign_date, req.years)
        .await?;
    Ok(Json(ApiResponse::with_message(
        format!("{} succeeded, {} failed", outcome.succeeded, outcome.failed),
        outcome,
    )))
}
