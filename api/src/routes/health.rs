//! Health Check Endpoint
//!
//! # Interview Q&A
//!
//! Q: 인증 없이 열려 있는 이유는?
//! A: 프로세스 감시(systemd, 리버스 프록시)가 토큰 없이 호출
//!    - 응답에 사용자 데이터는 포함하지 않음
//!
//! Q: DB 연결 상태도 체크하는 이유는?
//! A: 프로세스가 살아 있어도 SQLite 파일 잠금/손상 시 장부 기능 전체가 불가
//!    - 연결 실패 시 status = "degraded" + 503

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health check 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub database: DatabaseStatus,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_start = std::time::Instant::now();
    let database = match state.db.health_check().await {
        Ok(()) => DatabaseStatus {
            connected: true,
            latency_ms: Some(db_start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            DatabaseStatus {
                connected: false,
                latency_ms: None,
            }
        }
    };

    let code = if database.connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if database.connected { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: format!("{:?}", state.config.environment).to_lowercase(),
        database,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (code, Json(body))
}
