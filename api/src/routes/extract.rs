//! Request extractors
//!
//! axum 기본 추출기의 거부 응답(plain text 400/415/422)을
//! `ApiError::ValidationError` 봉투 응답으로 바꾼 래퍼

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON 본문
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// 쿼리 문자열
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// 경로 파라미터
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);
