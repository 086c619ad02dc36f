//! Billing Service
//!
//! # Interview Q&A
//!
//! Q: 월별 청구서는 언제, 어떻게 만들어지는가?
//! A: 계약(LaborTask)에 기간과 금액이 모두 채워지는 순간 일괄 생성
//!
//!    ```text
//!    sign=2025-01-15, years=2 → expire=2027-01-15
//!
//!    2025-01, 2025-02, ... , 2026-12   (24건, 2027-01 없음)
//!    ```
//!
//!    - 월 키는 sign 일자 + k개월 (월말 일자는 chrono가 해당 월 말일로 맞춤)
//!    - (member_id, bill_month) 가 이미 있으면 건너뜀 → 두 번 호출해도 중복 없음
//!    - UNIQUE 인덱스가 최후 방어선
//!
//! Q: 계약 종료 시 청구서는?
//! A: 이번 달 이후(초과) 청구서만 삭제, 지난 달과 이번 달은 이력으로 보존
//!
//! Q: 집계 쿼리의 범위는?
//! A: admin은 전체, 대리점은 본인 청구서만 (`Caller::scope`)

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqliteConnection;

use super::access::{self, Capability};
use super::BatchOutcome;
use crate::db::{
    bills, members, records, reminders, users, BillStats, Database, LaborTask, LedgerTotals,
    MonthlyBill, MonthlyBillView, MonthlyReminder, NewOperationLog, OperationLogRepository,
    RentCollectionRow,
};
use crate::error::ApiError;
use crate::types::{BillMonth, Caller};

/// 계약 기간 내 월별 청구서 생성
///
/// 계약이 부분 상태(기간 또는 금액 없음)면 아무것도 만들지 않음.
/// 새로 만든 청구서 수 반환
pub async fn generate_monthly_bills(
    conn: &mut SqliteConnection,
    task: &LaborTask,
    distributor_id: i64,
) -> Result<u32, sqlx::Error> {
    let Some((sign, expire)) = task.contract_range() else {
        return Ok(0);
    };

    let mut inserted = 0;
    for month in BillMonth::span(sign, expire) {
        if bills::find_for_member_month(&mut *conn, task.member_id, month)
            .await?
            .is_some()
        {
            continue;
        }

        bills::insert(
            &mut *conn,
            &bills::NewBill {
                labor_task_id: Some(task.id),
                member_id: task.member_id,
                distributor_id,
                bill_month: month,
                monthly_amount: task.monthly_amount,
            },
        )
        .await?;
        inserted += 1;
    }

    tracing::debug!(task_id = task.id, member_id = task.member_id, inserted, "Monthly bills generated");
    Ok(inserted)
}

// ============ Response Types ============

#[derive(Debug, Serialize)]
pub struct CurrentMonthStats {
    pub month: BillMonth,
    #[serde(flatten)]
    pub stats: BillStats,
}

/// 관리자 대시보드 요약
#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub distributor_count: i64,
    pub active_member_count: i64,
    pub month: BillMonth,
    pub current_month: BillStats,
    pub ledger: LedgerTotals,
}

#[derive(Debug, Serialize)]
pub struct ReminderGeneration {
    pub month: BillMonth,
    pub created: u32,
    pub skipped: u32,
}

pub struct BillingService {
    db: Database,
    audit: Arc<dyn OperationLogRepository>,
}

impl BillingService {
    pub fn new(db: Database, audit: Arc<dyn OperationLogRepository>) -> Self {
        Self { db, audit }
    }

    // ============ Bills ============

    pub async fn list_bills(
        &self,
        caller: &Caller,
        month: Option<BillMonth>,
    ) -> Result<Vec<MonthlyBillView>, ApiError> {
        let mut conn = self.db.acquire().await?;
        Ok(bills::list(&mut conn, caller.scope(), month).await?)
    }

    /// 입금(보증금 반환) 확인
    ///
    /// 재확인은 허용되며 confirmed_at / notes 를 덮어씀
    pub async fn confirm_bill(
        &self,
        caller: &Caller,
        bill_id: i64,
        notes: Option<&str>,
    ) -> Result<MonthlyBill, ApiError> {
        let mut conn = self.db.acquire().await?;

        let bill = bills::find_by_id(&mut conn, bill_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Bill".to_string()))?;
        access::require(caller, Capability::ConfirmBill, Some(bill.distributor_id))?;

        bills::confirm(&mut conn, bill_id, caller.id, notes).await?;
        let confirmed = bills::find_by_id(&mut conn, bill_id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        tracing::info!(bill_id, bill_month = %confirmed.bill_month, confirmed_by = caller.id, "Bill confirmed");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "confirm_bill")
                    .target("monthly_bill", bill_id)
                    .details(format!("Confirmed bill {} for member {}", confirmed.bill_month, confirmed.member_id)),
            )
            .await;

        Ok(confirmed)
    }

    /// 여러 청구서 일괄 확인 (건별 커밋)
    pub async fn confirm_bills(
        &self,
        caller: &Caller,
        bill_ids: &[i64],
        notes: Option<&str>,
    ) -> Result<BatchOutcome, ApiError> {
        if bill_ids.is_empty() {
            return Err(ApiError::ValidationError("billIds must not be empty".to_string()));
        }

        let mut outcome = BatchOutcome::default();
        for &id in bill_ids {
            let result = self.confirm_bill(caller, id, notes).await;
            outcome.tally(id, &result);
        }
        Ok(outcome)
    }

    // ============ Aggregates ============

    pub async fn current_month_stats(&self, caller: &Caller) -> Result<CurrentMonthStats, ApiError> {
        let month = BillMonth::current();
        let mut conn = self.db.acquire().await?;
        let stats = bills::stats_for_month(&mut conn, caller.scope(), month).await?;
        Ok(CurrentMonthStats { month, stats })
    }

    /// 월 × 대리점 수금 현황 (양 끝 포함)
    pub async fn rent_collection(
        &self,
        caller: &Caller,
        start: Option<BillMonth>,
        end: Option<BillMonth>,
    ) -> Result<Vec<RentCollectionRow>, ApiError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ApiError::ValidationError(format!(
                    "startMonth {s} is after endMonth {e}"
                )));
            }
        }

        let mut conn = self.db.acquire().await?;
        Ok(bills::rent_collection(&mut conn, caller.scope(), start, end).await?)
    }

    pub async fn admin_summary(&self, caller: &Caller) -> Result<AdminSummary, ApiError> {
        access::require(caller, Capability::ViewAdminSummary, None)?;

        let month = BillMonth::current();
        let mut conn = self.db.acquire().await?;
        Ok(AdminSummary {
            distributor_count: users::count_distributors(&mut conn).await?,
            active_member_count: members::count_active(&mut conn, None).await?,
            month,
            current_month: bills::stats_for_month(&mut conn, None, month).await?,
            ledger: records::totals(&mut conn, None, None, None, None).await?,
        })
    }

    // ============ Reminders ============

    /// 활성 대리점마다 이번 달 스냅샷 생성 (이미 있으면 건너뜀)
    pub async fn generate_reminders(&self, caller: &Caller) -> Result<ReminderGeneration, ApiError> {
        access::require(caller, Capability::GenerateReminders, None)?;

        let month = BillMonth::current();
        let mut tx = self.db.begin().await?;
        let mut created = 0;
        let mut skipped = 0;

        let distributor_ids = users::active_distributor_ids(&mut tx).await?;
        for distributor_id in distributor_ids {
            if reminders::exists(&mut tx, distributor_id, month).await? {
                skipped += 1;
                continue;
            }
            let stats = bills::stats_for_month(&mut tx, Some(distributor_id), month).await?;
            reminders::insert(&mut tx, distributor_id, month, &stats).await?;
            created += 1;
        }
        tx.commit().await?;

        tracing::info!(%month, created, skipped, "Monthly reminders generated");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "generate_reminders")
                    .details(format!("Generated {created} reminders for {month}")),
            )
            .await;

        Ok(ReminderGeneration { month, created, skipped })
    }

    pub async fn list_reminders(&self, caller: &Caller) -> Result<Vec<MonthlyReminder>, ApiError> {
        let mut conn = self.db.acquire().await?;
        Ok(reminders::list(&mut conn, caller.scope()).await?)
    }

    pub async fn mark_reminder_read(&self, caller: &Caller, id: i64) -> Result<(), ApiError> {
        let mut conn = self.db.acquire().await?;
        let reminder = reminders::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Reminder".to_string()))?;
        access::require(caller, Capability::ReadReminder, Some(reminder.distributor_id))?;

        reminders::mark_read(&mut conn, id).await?;
        Ok(())
    }
}
