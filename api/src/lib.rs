//! Distributor Accounting API Library
//!
//! # Overview
//!
//! 관리자와 두 단계(A/B) 대리점이 회원, 노동 계약, 월별 청구서, 장부를 관리하는
//! 멀티 테넌트 장부 시스템의 백엔드 API
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐    │
//! │  │ Routes  │→ │Services │→ │   DB    │  │  Types  │    │
//! │  └────┬────┘  └────┬────┘  └────┬────┘  └─────────┘    │
//! │       │            │            │                        │
//! │   auth middleware  access      SQLite (sqlx)            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `auth`: 비밀번호 해시, JWT, 인증 미들웨어
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 비즈니스 로직 (청구서, 장부, 회원, 계정, 권한)
//! - `db`: 데이터베이스 연동
//! - `types`: 공통 타입 정의
//!
//! ## Usage
//!
//! ```rust,ignore
//! use accounting_api::{routes, AppState, Config, Database};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Database::connect(&config.database_url).await?;
//!     db.run_migrations().await?;
//!
//!     let app = routes::create_router(AppState::new(db, config));
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use db::Database;
pub use error::ApiError;

use db::{OperationLogRepository, SqliteOperationLogRepository};
use services::{AccountService, BillingService, LaborService, LedgerService, MemberService};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub accounts: Arc<AccountService>,
    pub members: Arc<MemberService>,
    pub labor: Arc<LaborService>,
    pub billing: Arc<BillingService>,
    pub ledger: Arc<LedgerService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// SQLite 감사 로그를 사용하는 기본 구성
    pub fn new(db: Database, config: Config) -> Self {
        let audit = Arc::new(SqliteOperationLogRepository::new(db.pool().clone()));
        Self::with_audit(db, config, audit)
    }

    pub fn with_audit(db: Database, config: Config, audit: Arc<dyn OperationLogRepository>) -> Self {
        let config = Arc::new(config);
        Self {
            accounts: Arc::new(AccountService::new(db.clone(), audit.clone(), config.clone())),
            members: Arc::new(MemberService::new(db.clone(), audit.clone())),
            labor: Arc::new(LaborService::new(db.clone(), audit.clone())),
            billing: Arc::new(BillingService::new(db.clone(), audit.clone())),
            ledger: Arc::new(LedgerService::new(db.clone(), audit)),
            db: Arc::new(db),
            config,
        }
    }
}
