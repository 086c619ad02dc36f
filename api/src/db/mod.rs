//! Database Module
//!
//! # Interview Q&A
//!
//! Q: 왜 SQLite를 선택했는가?
//! A: 단일 사업자용 장부 시스템에 적합한 이유
//!
//!    1. 배포 단순: DB 서버 없이 파일 하나
//!    2. 트랜잭션: 다단계 생성(회원 + 계약 + 청구서)을 원자적으로 처리
//!    3. 트래픽: 동시 쓰기 요구가 낮음
//!
//! Q: 쿼리 함수가 `&mut SqliteConnection`을 받는 이유는?
//! A: 같은 함수를 풀 커넥션과 트랜잭션 양쪽에서 재사용
//!
//!    ```rust,ignore
//!    let mut conn = db.acquire().await?;
//!    members::find_by_id(&mut conn, id).await?;
//!
//!    let mut tx = db.begin().await?;
//!    members::find_by_id(&mut tx, id).await?;
//!    tx.commit().await?;
//!    ```
//!
//! Q: 스키마 변경은 어떻게 하는가?
//! A: `migrations/` 아래 버전별 추가(additive) 마이그레이션만 사용
//!    - 테이블 재생성/복사 방식은 사용하지 않음

mod models;
mod repository;

pub mod bills;
pub mod invites;
pub mod labor;
pub mod member_pool;
pub mod members;
pub mod records;
pub mod reminders;
pub mod users;

pub use models::*;
pub use repository::{NewOperationLog, OperationLogRepository, SqliteOperationLogRepository};

#[cfg(test)]
pub use repository::mock;

use std::str::FromStr;

use anyhow::Result;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

/// 데이터베이스 연결 및 쿼리 담당
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 5 (SQLite 단일 writer)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    /// - WAL 저널 + foreign_keys ON
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// 테스트용 인메모리 DB (마이그레이션 적용 완료)
    ///
    /// 인메모리 DB는 커넥션마다 별개이므로 커넥션 1개로 고정
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 풀에서 커넥션 하나 획득
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    /// 트랜잭션 시작
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// 관리자 계정이 없으면 기본 admin 생성
    ///
    /// 생성되었으면 true 반환
    pub async fn seed_admin(&self, password_hash: &str) -> Result<bool> {
        let mut conn = self.acquire().await?;
        if users::find_admin(&mut conn).await?.is_some() {
            return Ok(false);
        }

        users::insert(
            &mut conn,
            &users::NewUser {
                username: "admin",
                password_hash,
                name: "System Administrator",
                role: crate::types::Role::Admin,
                phone: None,
                email: None,
                commission_rate: 0.0,
                invite_code: &crate::services::accounts::generate_code(),
                invited_by: None,
            },
        )
        .await?;

        tracing::info!("Default admin account created (username: admin)");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_migrations_and_health() {
        let db = Database::connect_in_memory().await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(db.seed_admin("hash").await.unwrap());
        assert!(!db.seed_admin("hash").await.unwrap());

        let mut conn = db.acquire().await.unwrap();
        let admin = users::find_by_username(&mut conn, "admin").await.unwrap().unwrap();
        assert_eq!(admin.role, crate::types::Role::Admin);
        assert!(admin.invite_code.is_some());
    }
}
