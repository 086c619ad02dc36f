//! Bearer token middleware
//!
//! 인증이 권한 검사보다 먼저: 토큰이 없거나 잘못되면 401로 즉시 종료하고
//! 핸들러(소유권 검사 포함)는 실행되지 않음

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::ApiError, AppState};

use super::token::decode_token;

/// `Authorization: Bearer <jwt>` 검증 후 `Caller`를 extensions에 주입
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_token(token, &state.config.jwt_secret)?;

    request.extensions_mut().insert(claims.caller());

    Ok(next.run(request).await)
}
