//! Labor pool and task endpoints

use axum::{
    extract::State,
    Extension, Json,
};
use serde::Deserialize;

use crate::db::{LaborTaskView, PoolMember};
use crate::services::labor::{CreateTaskInput, StartTaskInput, TaskCreated, TaskExited};
use crate::services::members::MemberInput;
use crate::types::{ApiResponse, Caller, TaskStatus};
use crate::{error::ApiError, AppState};

use super::extract::{JsonBody, PathParam, QueryParams};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolQuery {
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitRequest {
    pub exit_reason: Option<String>,
}

/// GET /labor/pool
pub async fn list_pool(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<PoolQuery>,
) -> Result<Json<ApiResponse<Vec<PoolMember>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.labor.list_pool(&caller, query.is_active).await?,
    )))
}

/// POST /labor/pool
pub async fn add_to_pool(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<MemberInput>,
) -> Result<Json<ApiResponse<PoolMember>>, ApiError> {
    let pool = state.labor.add_to_pool(&caller, req).await?;
    Ok(Json(ApiResponse::with_message("Added to pool", pool)))
}

/// GET /labor/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    QueryParams(query): QueryParams<TaskQuery>,
) -> Result<Json<ApiResponse<Vec<LaborTaskView>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.labor.list_tasks(&caller, query.status).await?,
    )))
}

/// POST /labor/tasks
///
/// 풀 인원 → 회원 + 계약 + 월별 청구서 (단일 트랜잭션)
pub async fn create_task(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<CreateTaskInput>,
) -> Result<Json<ApiResponse<TaskCreated>>, ApiError> {
    let created = state.labor.create_from_pool(&caller, req).await?;
    Ok(Json(ApiResponse::with_message("Labor task created", created)))
}

/// POST /labor/tasks/start
pub async fn start_task(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<StartTaskInput>,
) -> Result<Json<ApiResponse<TaskCreated>>, ApiError> {
    let created = state.labor.start_for_member(&caller, req).await?;
    Ok(Json(ApiResponse::with_message("Labor task started", created)))
}

/// POST /labor/tasks/:id/exit
pub async fn exit_task(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    PathParam(id): PathParam<i64>,
    body: Option<JsonBody<ExitRequest>>,
) -> Result<Json<ApiResponse<TaskExited>>, ApiError> {
    let req = body.map(|JsonBody(req)| req).unwrap_or_default();
    let exited = state
        .labor
        .exit(&caller, id, req.exit_reason.as_deref())
        .await?;
    Ok(Json(ApiResponse::with_message("Labor task exited", exited)))
}
