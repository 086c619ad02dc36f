//! Operation Log Repository
//!
//! # Interview Q&A
//!
//! Q: 감사 로그만 trait으로 분리한 이유는?
//! A: 감사 로그는 "best-effort" 부수효과
//!
//!    - 본 작업(회원 생성, 청구서 확인 등)이 커밋된 뒤 기록
//!    - 로그 기록 실패가 본 작업을 실패시키면 안 됨
//!    - trait 뒤에 두면 테스트에서 항상 실패하는 구현으로 이 성질을 검증 가능
//!
//!    ```rust,ignore
//!    // Service 레이어
//!    audit.record(NewOperationLog::new(caller.id, "confirm_bill")).await;
//!
//!    // 테스트용 Mock
//!    let audit = Arc::new(mock::FailingOperationLog);
//!    ```

use async_trait::async_trait;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use super::models::OperationLogView;

/// 새 감사 로그 항목
#[derive(Debug, Clone)]
pub struct NewOperationLog {
    pub user_id: i64,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub details: Option<String>,
}

impl NewOperationLog {
    pub fn new(user_id: i64, action: &str) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            target_type: None,
            target_id: None,
            details: None,
        }
    }

    pub fn target(mut self, target_type: &str, target_id: i64) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = Some(target_id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// 감사 로그 저장소 인터페이스
#[async_trait]
pub trait OperationLogRepository: Send + Sync {
    async fn append(&self, entry: &NewOperationLog) -> Result<()>;

    /// 최근 로그 조회 (user_id 지정 시 해당 사용자만)
    async fn recent(
        &self,
        user_id: Option<i64>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: u32,
    ) -> Result<Vec<OperationLogView>>;

    /// best-effort 기록: 실패는 경고 로그만 남기고 삼킴
    async fn record(&self, entry: NewOperationLog) {
        if let Err(e) = self.append(&entry).await {
            tracing::warn!(
                user_id = entry.user_id,
                action = %entry.action,
                "Failed to write operation log: {e}"
            );
        }
    }
}

/// SQLite 구현
pub struct SqliteOperationLogRepository {
    pool: SqlitePool,
}

impl SqliteOperationLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperationLogRepository for SqliteOperationLogRepository {
    async fn append(&self, entry: &NewOperationLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO operation_logs (user_id, action, target_type, target_id, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.details)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(
        &self,
        user_id: Option<i64>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: u32,
    ) -> Result<Vec<OperationLogView>> {
        let logs = sqlx::query_as::<_, OperationLogView>(
            r#"
            SELECT ol.*, u.name AS user_name, u.role AS user_role
            FROM operation_logs ol
            LEFT JOIN users u ON ol.user_id = u.id
            WHERE (?1 IS NULL OR ol.user_id = ?1)
              AND (?2 IS NULL OR DATE(ol.created_at) >= ?2)
              AND (?3 IS NULL OR DATE(ol.created_at) <= ?3)
            ORDER BY ol.created_at DESC, ol.id DESC
            LIMIT ?4
            "#
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// 항상 실패하는 감사 로그 (best-effort 검증용)
    pub struct FailingOperationLog;

    #[async_trait]
    impl OperationLogRepository for FailingOperationLog {
        async fn append(&self, _entry: &NewOperationLog) -> Result<()> {
            anyhow::bail!("operation log unavailable")
        }

        async fn recent(
            &self,
            _user_id: Option<i64>,
            _start: Option<NaiveDate>,
            _end: Option<NaiveDate>,
            _limit: u32,
        ) -> Result<Vec<OperationLogView>> {
            Ok(vec![])
        }
    }

    /// 메모리에 action만 모으는 감사 로그
    #[derive(Default)]
    pub struct RecordingOperationLog {
        pub entries: Mutex<Vec<NewOperationLog>>,
    }

    impl RecordingOperationLog {
        pub fn actions(&self) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.action.clone())
                .collect()
        }
    }

    #[async_trait]
    impl OperationLogRepository for RecordingOperationLog {
        async fn append(&self, entry: &NewOperationLog) -> Result<()> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn recent(
            &self,
            _user_id: Option<i64>,
            _start: Option<NaiveDate>,
            _end: Option<NaiveDate>,
            _limit: u32,
        ) -> Result<Vec<OperationLogView>> {
            Ok(vec![])
        }
    }
}
