//! Auth Endpoints
//!
//! 로그인/가입은 공개, 나머지는 bearer 토큰 필요

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::db::{InviteCodeView, User};
use crate::services::accounts::{LoginOutcome, RegisterInput, SettingsInput};
use crate::types::{ApiResponse, Caller, Role};
use crate::{error::ApiError, AppState};

use super::extract::JsonBody;

// ============ Request Types ============

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteCodeRequest {
    pub role: Role,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

// ============ Handlers ============

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<ApiResponse<LoginOutcome>>, ApiError> {
    let outcome = state.accounts.login(&req.username, &req.password).await?;
    Ok(Json(ApiResponse::with_message("Login successful", outcome)))
}

/// POST /auth/register
///
/// 초대 코드 소모 + 사용자 생성 (코드의 역할/수수료 비율 적용)
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterInput>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state.accounts.register(req).await?;
    Ok(Json(ApiResponse::with_message("Registration successful", user)))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    Ok(Json(ApiResponse::success(state.accounts.me(&caller).await?)))
}

/// PUT /auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<ProfileRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state
        .accounts
        .update_profile(&caller, &req.name, req.password.as_deref())
        .await?;
    Ok(Json(ApiResponse::with_message("Profile updated", user)))
}

/// POST /auth/invite-codes
pub async fn generate_invite_codes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<InviteCodeRequest>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let codes = state
        .accounts
        .issue_invite_codes(&caller, req.role, req.count)
        .await?;
    Ok(Json(ApiResponse::with_message(
        format!("Generated {} invite codes", codes.len()),
        codes,
    )))
}

/// GET /auth/invite-codes
pub async fn list_invite_codes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<InviteCodeView>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.accounts.list_invite_codes(&caller).await?,
    )))
}

/// PUT /auth/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(req): JsonBody<SettingsInput>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state.accounts.update_settings(&caller, req).await?;
    Ok(Json(ApiResponse::with_message("Settings saved", user)))
}
