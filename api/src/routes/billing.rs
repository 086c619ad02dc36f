//! Billing Endpoints
//!
//! 월별 청구서 확인, 통계, 임대료 수금 리포트, 월말 알림

use axum::{
    extract::State,
    Extension, Json,
};
use serde::Deserialize;

use crate::db::{MonthlyBill, MonthlyBillView, MonthlyReminder, RentCollectionRow};
use crate::services::billing::{AdminSummary, CurrentMonthStats, ReminderGeneration};
use crate::services::BatchOutcome;
use crate::types::{ApiResponse, Caller};
use crate::{error::ApiError, AppState};

use super::extract::{JsonBody, PathParam, QueryParams};
use super::parse_month;

// ============ Request Types ============

#[derive(Debug, Deserialize)]
pub struct BillQuery {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentCollectionQuery {
    pub start_month: Option<String>,
    pub end_month: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfirmRequest {
    pub bill_ids: Vec<i64>,
    pub notes: Option<String>,
}

// ============ Bills ============

/// GET /billing/bills?month=YYYY-MM
pub async fn list_bills(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<BillQuery>,
) -> Result<Json<ApiResponse<Vec<MonthlyBillView>>>, ApiError> {
    let month = parse_month(query.month.as_deref(), "month")?;
    Ok(Json(ApiResponse::success(
        state.billing.list_bills(&caller, month).await?,
    )))
}

/// POST /billing/bills/:id/confirm
pub async fn confirm_bill(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
    body: Option<JsonBody<ConfirmRequest>>,
) -> Result<Json<ApiResponse<MonthlyBill>>, ApiError> {
    let req = body.map(|JsonBody(req)| req).unwrap_or_default();
    let bill = state
        .billing
        .confirm_bill(&caller, id, req.notes.as_deref())
        .await?;
    Ok(Json(ApiResponse::with_message("Bill confirmed", bill)))
}

/// POST /billing/bills/confirm
///
/// 항목별 독립 처리, 실패 건수만 집계
pub async fn confirm_bills(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<BatchConfirmRequest>,
) -> Result<Json<ApiResponse<BatchOutcome>>, ApiError> {
    let outcome = state
        .billing
        .confirm_bills(&caller, &req.bill_ids, req.notes.as_deref())
        .await?;
    Ok(Json(ApiResponse::with_message(
        format!("Confirmed {} bills, {} failed", outcome.succeeded, outcome.failed),
        outcome,
    )))
}

// ============ Statistics ============

/// GET /billing/stats/current
pub async fn current_month_stats(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<CurrentMonthStats>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.billing.current_month_stats(&caller).await?,
    )))
}

/// GET /billing/stats/admin-summary
pub async fn admin_summary(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<AdminSummary>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.billing.admin_summary(&caller).await?,
    )))
}

/// GET /billing/rent-collection?startMonth=YYYY-MM&endMonth=YYYY-MM
pub async fn rent_collection(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<RentCollectionQuery>,
) -> Result<Json<ApiResponse<Vec<RentCollectionRow>>>, ApiError> {
    let start = parse_month(query.start_month.as_deref(), "startMonth")?;
    let end = parse_month(query.end_month.as_deref(), "endMonth")?;
    Ok(Json(ApiResponse::success(
        state.billing.rent_collection(&caller, start, end).await?,
    )))
}

// ============ Reminders ============

/// POST /billing/reminders/generate
pub async fn generate_reminders(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<ReminderGeneration>>, ApiError> {
    let generated = state.billing.generate_reminders(&caller).await?;
    Ok(Json(ApiResponse::with_message(
        format!("Created {} reminders", generated.created),
        generated,
    )))
}

/// GET /billing/reminders
pub async fn list_reminders(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<MonthlyReminder>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.billing.list_reminders(&caller).await?,
    )))
}

/// POST /billing/reminders/:id/read
pub async fn mark_reminder_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.billing.mark_reminder_read(&caller, id).await?;
    Ok(Json(ApiResponse::message("Reminder marked as read")))
}
