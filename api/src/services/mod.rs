//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `access`: 역할/소유자 기반 권한 판정
//! - `AccountService`: 가입, 로그인, 초대 코드, 대리점 관리
//! - `MemberService`: 회원 CRUD, 증명서 만료 조회
//! - `LaborService`: 인원 풀, 노동 계약 생성/종료, 일괄 금액·계약 설정
//! - `BillingService`: 월별 청구서 확인, 집계, 월간 리마인더
//! - `LedgerService`: 장부 기록과 수수료 계산
//!
//! 모든 서비스는 `Database`와 감사 로그 저장소를 주입받음 (전역 상태 없음)

pub mod access;
pub mod accounts;
pub mod billing;
pub mod labor;
pub mod ledger;
pub mod members;

pub use accounts::AccountService;
pub use billing::BillingService;
pub use labor::LaborService;
pub use ledger::LedgerService;
pub use members::MemberService;

use serde::Serialize;

/// 일괄 처리 결과
///
/// 항목 하나의 실패가 나머지를 중단시키지 않음
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: u32,
    pub failed: u32,
}

impl BatchOutcome {
    pub fn tally<T, E: std::fmt::Display>(&mut self, id: i64, result: &Result<T, E>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(e) => {
                tracing::debug!(item_id = id, "Batch item skipped: {e}");
                self.failed += 1;
            }
        }
    }
}

/// 서비스 테스트 공용 fixture
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::db::{mock::RecordingOperationLog, members, users, Database};
    use crate::types::{Caller, Role};

    pub async fn setup() -> (Database, Arc<RecordingOperationLog>) {
        let db = Database::connect_in_memory().await.unwrap();
        (db, Arc::new(RecordingOperationLog::default()))
    }

    pub async fn user(db: &Database, username: &str, role: Role, rate: f64) -> Caller {
        let mut conn = db.acquire().await.unwrap();
        let id = users::insert(
            &mut conn,
            &users::NewUser {
                username,
                password_hash: "not-a-real-hash",
                name: username,
                role,
                phone: None,
                email: None,
                commission_rate: rate,
                invite_code: &format!("CODE-{username}"),
                invited_by: None,
            },
        )
        .await
        .unwrap();

        Caller { id, role, username: username.to_string() }
    }

    pub async fn admin(db: &Database) -> Caller {
        user(db, "root", Role::Admin, 0.0).await
    }

    pub async fn member(db: &Database, distributor_id: i64, name: &str) -> i64 {
        let mut conn = db.acquire().await.unwrap();
        members::insert(
            &mut conn,
            distributor_id,
            &members::MemberFields {
                name: Some(name.to_string()),
                city: Some("Shenzhen".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }
}
