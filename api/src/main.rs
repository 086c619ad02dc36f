//! Distributor Accounting API Server
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Client (SPA Frontend)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  Bearer JWT
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                         │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Routes Layer                        ││
//! │  │  /auth  /members  /labor  /billing  /accounting  /users  ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Services Layer                        ││
//! │  │  Accounts  Members  Labor  Billing  Ledger  (access)    ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Data Layer                            ││
//! │  │  SQLite (sqlx)    Operation log repository              ││
//! │  └─────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use accounting_api::{auth::hash_password, routes, AppState, Config, Database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,sqlx=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "accounting_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting distributor accounting API server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!(environment = ?config.environment, "Configuration loaded");

    // SQLite 파일 경로의 상위 디렉토리 준비
    ensure_database_dir(&config.database_url)?;

    // 데이터베이스 연결
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Database connected");

    // 마이그레이션 실행
    db.run_migrations().await?;
    tracing::info!("Migrations completed");

    // 관리자 계정이 없을 때만 생성
    let admin_hash = hash_password(&config.admin_password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?;
    db.seed_admin(&admin_hash).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // 라우터 구성
    let app = routes::create_router(AppState::new(db, config));

    // 서버 시작
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `sqlite://data/app.db` 형태면 `data/` 생성
fn ensure_database_dir(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
    }
    Ok(())
}
