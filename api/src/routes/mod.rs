//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크 (공개)
//! - `/auth/*` - 로그인, 가입, 프로필, 초대 코드, 개인 설정
//! - `/members/*` - 회원 관리, 증서 만료, 일괄 금액/계약 설정
//! - `/labor/*` - 인력 풀, 노동 계약
//! - `/billing/*` - 월별 청구서, 통계, 수금 리포트, 알림
//! - `/accounting/*` - 장부 기록, 통계
//! - `/users/*` - 대리점 관리, 작업 로그
//!
//! # Interview Q&A
//!
//! Q: 인증 미들웨어를 `route_layer`로 붙이는 이유는?
//! A: 매칭된 보호 라우트에만 적용
//!    - 존재하지 않는 경로는 인증 여부와 무관하게 404
//!    - 공개 라우트(/health, /auth/login, /auth/register)는 별도 Router에서 merge

pub mod accounting;
pub mod auth;
pub mod billing;
pub mod extract;
pub mod health;
pub mod labor;
pub mod members;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::config::Config;
use crate::error::ApiError;
use crate::types::BillMonth;
use crate::AppState;

/// `YYYY-MM` 쿼리 파라미터 파싱 (빈 문자열은 미지정)
pub(crate) fn parse_month(value: Option<&str>, field: &str) -> Result<Option<BillMonth>, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: String| ApiError::ValidationError(format!("{field}: {e}"))),
    }
}

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health                          - 서버 상태 확인
/// POST /auth/login | /auth/register     - 공개
///
/// GET  /auth/me       PUT /auth/profile   PUT /auth/settings
/// GET|POST /auth/invite-codes
///
/// GET|POST /members   GET|PUT|DELETE /members/:id
/// GET  /members/expiring
/// POST /members/bulk/amount | /members/bulk/contract
///
/// GET|POST /labor/pool   GET|POST /labor/tasks
/// POST /labor/tasks/start   POST /labor/tasks/:id/exit
///
/// GET  /billing/bills   POST /billing/bills/confirm   POST /billing/bills/:id/confirm
/// GET  /billing/stats/current | /billing/stats/admin-summary | /billing/rent-collection
/// GET  /billing/reminders   POST /billing/reminders/generate | /billing/reminders/:id/read
///
/// GET|POST /accounting   GET /accounting/statistics   PUT|DELETE /accounting/:id
///
/// GET  /users/distributors   GET|PUT /users/distributors/:id
/// POST /users/distributors/:id/unlock   GET /users/logs
/// ```
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let protected = Router::new()
        // Auth
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        .route(
            "/auth/invite-codes",
            get(auth::list_invite_codes).post(auth::generate_invite_codes),
        )
        .route("/auth/settings", put(auth::update_settings))
        // Members
        .route("/members", get(members::list_members).post(members::create_member))
        .route("/members/expiring", get(members::expiring_documents))
        .route("/members/bulk/amount", post(members::bulk_set_amount))
        .route("/members/bulk/contract", post(members::bulk_set_contract))
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        // Labor
        .route("/labor/pool", get(labor::list_pool).post(labor::add_to_pool))
        .route("/labor/tasks", get(labor::list_tasks).post(labor::create_task))
        .route("/labor/tasks/start", post(labor::start_task))
        .route("/labor/tasks/:id/exit", post(labor::exit_task))
        // Billing
        .route("/billing/bills", get(billing::list_bills))
        .route("/billing/bills/confirm", post(billing::confirm_bills))
        .route("/billing/bills/:id/confirm", post(billing::confirm_bill))
        .route("/billing/stats/current", get(billing::current_month_stats))
        .route("/billing/stats/admin-summary", get(billing::admin_summary))
        .route("/billing/rent-collection", get(billing::rent_collection))
        .route("/billing/reminders", get(billing::list_reminders))
        .route("/billing/reminders/generate", post(billing::generate_reminders))
        .route("/billing/reminders/:id/read", post(billing::mark_reminder_read))
        // Accounting
        .route(
            "/accounting",
            get(accounting::list_records).post(accounting::create_record),
        )
        .route("/accounting/statistics", get(accounting::statistics))
        .route(
            "/accounting/:id",
            put(accounting::update_record).delete(accounting::delete_record),
        )
        // Users
        .route("/users/distributors", get(users::list_distributors))
        .route(
            "/users/distributors/:id",
            get(users::get_distributor).put(users::update_distributor),
        )
        .route("/users/distributors/:id/unlock", post(users::unlock_settings))
        .route("/users/logs", get(users::operation_logs))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .merge(protected)
        .fallback(|| async { ApiError::NotFound("Route".to_string()) })
        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // 상태 주입
        .with_state(state)
}

/// CORS 설정
///
/// 프로덕션: `ALLOWED_ORIGINS` (쉼표 구분)만 허용
/// 개발: 로컬 프론트엔드 dev 서버 허용
fn cors_layer(config: &Config) -> CorsLayer {
    if config.is_production() {
        let origins: Vec<HeaderValue> = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        if origins.is_empty() {
            tracing::warn!("ALLOWED_ORIGINS is empty, cross-origin requests will be rejected");
        }

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:5173"), // Vite dev server
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:5173"),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{create_token, hash_password};
    use crate::db::Database;
    use crate::services::testing;
    use crate::types::{Caller, Role};

    async fn app() -> (Router, AppState) {
        let db = tokio_test::assert_ok!(Database::connect_in_memory().await);
        let state = AppState::new(db, Config::development());
        (create_router(state.clone()), state)
    }

    fn token_for(state: &AppState, caller: &Caller) -> String {
        create_token(
            caller.id,
            &caller.username,
            caller.role,
            &caller.username,
            &state.config.jwt_secret,
            1,
        )
        .unwrap()
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month(None, "month").unwrap(), None);
        assert_eq!(parse_month(Some(""), "month").unwrap(), None);
        assert_eq!(
            parse_month(Some("2024-03"), "month").unwrap(),
            BillMonth::new(2024, 3)
        );
        assert!(matches!(
            parse_month(Some("2024-3"), "month"),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _) = app().await;
        let (status, body) = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"]["connected"], true);
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let (app, _) = app().await;

        let (status, body) = send(&app, request("GET", "/members", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, request("GET", "/members", Some("garbage"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (app, _) = app().await;
        let (status, body) = send(&app, request("GET", "/nope", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_distributor_cannot_delete_record() {
        let (app, state) = app().await;
        let b = testing::user(&state.db, "bee", Role::DistributorB, 8.0).await;
        let token = token_for(&state, &b);

        let (status, body) = send(&app, request("DELETE", "/accounting/1", Some(&token), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_register_with_used_code_is_rejected() {
        let (app, state) = app().await;
        let admin = testing::admin(&state.db).await;
        let codes = state
            .accounts
            .issue_invite_codes(&admin, Role::DistributorA, 1)
            .await
            .unwrap();

        let payload = |username: &str| {
            json!({
                "username": username,
                "password": "secret123",
                "name": username,
                "inviteCode": codes[0],
            })
        };

        let (status, body) = send(&app, request("POST", "/auth/register", None, Some(payload("alice")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "distributor_a");

        let (status, body) = send(&app, request("POST", "/auth/register", None, Some(payload("bob")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_login_then_me() {
        let (app, state) = app().await;
        state
            .db
            .seed_admin(&hash_password("admin-pass").unwrap())
            .await
            .unwrap();

        let (status, _) = send(
            &app,
            request("POST", "/auth/login", None, Some(json!({"username": "admin", "password": "wrong"}))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            request("POST", "/auth/login", None, Some(json!({"username": "admin", "password": "admin-pass"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, request("GET", "/auth/me", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "admin");
        assert!(body["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_bad_month_query_is_validation_error() {
        let (app, state) = app().await;
        let a = testing::user(&state.db, "ace", Role::DistributorA, 6.0).await;
        let token = token_for(&state, &a);

        let (status, body) = send(&app, request("GET", "/billing/bills?month=2024-13", Some(&token), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_input_uses_error_envelope() {
        let (app, state) = app().await;
        let a = testing::user(&state.db, "ace", Role::DistributorA, 6.0).await;
        let token = token_for(&state, &a);

        let broken_json = Request::builder()
            .method("POST")
            .uri("/accounting")
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from("{\"memberId\": "))
            .unwrap();
        let no_content_type = Request::builder()
            .method("POST")
            .uri("/members")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from("{}"))
            .unwrap();

        for req in [
            broken_json,
            no_content_type,
            request("GET", "/members/abc", Some(&token), None),
            request("GET", "/labor/pool?isActive=maybe", Some(&token), None),
        ] {
            let (status, body) = send(&app, req).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert_eq!(body["code"], "VALIDATION_ERROR");
        }
    }
}
