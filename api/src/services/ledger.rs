//! Ledger Service
//!
//! 수기 장부 기록과 수수료 / 순수익 계산
//!
//! ```text
//! commission  = received × rate / 100      (rate 방식)
//!             = 입력 금액 그대로           (amount 방식)
//! net_revenue = received − deposit − insurance − commission
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::access::{self, Capability};
use crate::db::records::{RecordFilter, RecordValues};
use crate::db::{
    members, records, users, AccountingRecord, AccountingRecordView, Database, LedgerTotals,
    NewOperationLog, OperationLogRepository,
};
use crate::error::ApiError;
use crate::types::{Caller, CommissionType};

/// 장부 기록 생성/수정 요청 본문
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    pub member_id: Option<i64>,
    pub received_amount: Option<f64>,
    pub deposit: Option<f64>,
    pub insurance: Option<f64>,
    pub commission: Option<f64>,
    pub commission_type: Option<CommissionType>,
    pub record_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub member_id: Option<i64>,
    pub distributor_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct LedgerStatistics {
    #[serde(flatten)]
    pub totals: LedgerTotals,
    pub total_members: i64,
}

/// 수수료 계산
pub fn compute_commission(
    received_amount: f64,
    commission_type: CommissionType,
    supplied: Option<f64>,
    rate_percent: f64,
) -> Result<f64, ApiError> {
    match commission_type {
        CommissionType::Rate => Ok(received_amount * rate_percent / 100.0),
        CommissionType::Amount => {
            let amount = supplied.ok_or_else(|| {
                ApiError::BadRequest("commission is required when commissionType is 'amount'".to_string())
            })?;
            non_negative("commission", amount)?;
            Ok(amount)
        }
    }
}

pub fn net_revenue(received_amount: f64, deposit: f64, insurance: f64, commission: f64) -> f64 {
    received_amount - deposit - insurance - commission
}

fn non_negative(field: &str, value: f64) -> Result<(), ApiError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ApiError::ValidationError(format!("{field} must be a non-negative number")))
    }
}

pub struct LedgerService {
    db: Database,
    audit: Arc<dyn OperationLogRepository>,
}

impl LedgerService {
    pub fn new(db: Database, audit: Arc<dyn OperationLogRepository>) -> Self {
        Self { db, audit }
    }

    /// 장부 기록 생성
    ///
    /// 검증 → 회원 존재 → 소유권 → 대리점 비율로 수수료 계산 순서
    pub async fn create(&self, caller: &Caller, input: RecordInput) -> Result<AccountingRecord, ApiError> {
        let (Some(member_id), Some(received), Some(deposit), Some(insurance), Some(record_date)) = (
            input.member_id,
            input.received_amount,
            input.deposit,
            input.insurance,
            input.record_date,
        ) else {
            return Err(ApiError::BadRequest(
                "memberId, receivedAmount, deposit, insurance and recordDate are required".to_string(),
            ));
        };
        non_negative("receivedAmount", received)?;
        non_negative("deposit", deposit)?;
        non_negative("insurance", insurance)?;

        let mut conn = self.db.acquire().await?;
        let member = members::find_by_id(&mut conn, member_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Member".to_string()))?;
        access::require(caller, Capability::WriteRecord, Some(member.distributor_id))?;

        let distributor = users::find_by_id(&mut conn, member.distributor_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Distributor".to_string()))?;

        let commission_type = input.commission_type.unwrap_or_default();
        let commission =
            compute_commission(received, commission_type, input.commission, distributor.commission_rate)?;
        let values = RecordValues {
            received_amount: received,
            deposit,
            insurance,
            commission,
            commission_type,
            net_revenue: net_revenue(received, deposit, insurance, commission),
            record_date,
            city: input.city.or(member.city),
            notes: input.notes,
        };

        let id = records::insert(&mut conn, member_id, member.distributor_id, &values).await?;
        let record = records::find_by_id(&mut conn, id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        tracing::info!(record_id = id, member_id, commission, net_revenue = values.net_revenue, "Accounting record created");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "create_record")
                    .target("accounting_record", id)
                    .details(format!("Recorded {received} received for {}", member.name)),
            )
            .await;

        Ok(record)
    }

    /// 장부 기록 수정
    ///
    /// 수수료은 항상 대리점의 현재 비율로 다시 계산 (rate 방식으로 전환)
    pub async fn update(&self, caller: &Caller, id: i64, input: RecordInput) -> Result<AccountingRecord, ApiError> {
        let mut conn = self.db.acquire().await?;
        let existing = records::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Accounting record".to_string()))?;
        access::require(caller, Capability::WriteRecord, Some(existing.distributor_id))?;

        let distributor = users::find_by_id(&mut conn, existing.distributor_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Distributor".to_string()))?;

        let received = input.received_amount.unwrap_or(existing.received_amount);
        let deposit = input.deposit.unwrap_or(existing.deposit);
        let insurance = input.insurance.unwrap_or(existing.insurance);
        non_negative("receivedAmount", received)?;
        non_negative("deposit", deposit)?;
        non_negative("insurance", insurance)?;

        let commission = compute_commission(received, CommissionType::Rate, None, distributor.commission_rate)?;
        let values = RecordValues {
            received_amount: received,
            deposit,
            insurance,
            commission,
            commission_type: CommissionType::Rate,
            net_revenue: net_revenue(received, deposit, insurance, commission),
            record_date: input.record_date.unwrap_or(existing.record_date),
            city: input.city.or(existing.city),
            notes: input.notes.or(existing.notes),
        };

        records::update(&mut conn, id, &values).await?;
        let record = records::find_by_id(&mut conn, id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        self.audit
            .record(
                NewOperationLog::new(caller.id, "update_record")
                    .target("accounting_record", id)
                    .details(format!("Updated record, net revenue {}", record.net_revenue)),
            )
            .await;

        Ok(record)
    }

    /// admin 전용. 권한 검사를 존재 확인보다 먼저 수행
    pub async fn delete(&self, caller: &Caller, id: i64) -> Result<(), ApiError> {
        access::require(caller, Capability::DeleteRecord, None)?;

        let mut conn = self.db.acquire().await?;
        if records::delete(&mut conn, id).await? == 0 {
            return Err(ApiError::NotFound("Accounting record".to_string()));
        }
        drop(conn);

        tracing::info!(record_id = id, "Accounting record deleted");
        self.audit
            .record(NewOperationLog::new(caller.id, "delete_record").target("accounting_record", id))
            .await;

        Ok(())
    }

    pub async fn list(&self, caller: &Caller, query: RecordQuery) -> Result<Vec<AccountingRecordView>, ApiError> {
        let filter = RecordFilter {
            distributor_id: if caller.is_admin() { query.distributor_id } else { Some(caller.id) },
            member_id: query.member_id,
            start_date: query.start_date,
            end_date: query.end_date,
        };

        let mut conn = self.db.acquire().await?;
        Ok(records::list(&mut conn, &filter).await?)
    }

    /// 범위 내 합계 + 현재 활성 회원 수
    pub async fn statistics(
        &self,
        caller: &Caller,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<LedgerStatistics, ApiError> {
        if let (Some(s), Some(e)) = (start_date, end_date) {
            if s > e {
                return Err(ApiError::ValidationError("startDate is after endDate".to_string()));
            }
        }

        let mut conn = self.db.acquire().await?;
        let totals = records::totals(&mut conn, caller.scope(), None, start_date, end_date).await?;
        let total_members = members::count_active(&mut conn, caller.scope()).await?;

        Ok(LedgerStatistics { totals, total_members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use crate::types::Role;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(member_id: i64, received: f64, deposit: f64, insurance: f64) -> RecordInput {
        RecordInput {
            member_id: Some(member_id),
            received_amount: Some(received),
            deposit: Some(deposit),
            insurance: Some(insurance),
            record_date: Some(date(2025, 3, 1)),
            ..Default::default()
        }
    }

    #[test]
    fn test_commission_modes() {
        assert_eq!(compute_commission(10000.0, CommissionType::Rate, None, 6.0).unwrap(), 600.0);
        assert_eq!(compute_commission(10000.0, CommissionType::Amount, Some(250.0), 6.0).unwrap(), 250.0);
        assert!(matches!(
            compute_commission(10000.0, CommissionType::Amount, None, 6.0),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(net_revenue(10000.0, 1000.0, 500.0, 600.0), 7900.0);
    }

    #[tokio::test]
    async fn test_rate_mode_scenario() {
        let (db, audit) = testing::setup().await;
        let dist = testing::user(&db, "dist_a", Role::DistributorA, 6.0).await;
        let member_id = testing::member(&db, dist.id, "M").await;
        let service = LedgerService::new(db, audit.clone());

        let record = service.create(&dist, input(member_id, 10000.0, 1000.0, 500.0)).await.unwrap();
        assert_eq!(record.commission, 600.0);
        assert_eq!(record.net_revenue, 7900.0);
        assert_eq!(record.commission_type, CommissionType::Rate);
        assert_eq!(record.distributor_id, dist.id);
        assert_eq!(record.city.as_deref(), Some("Shenzhen"));
        assert_eq!(audit.actions(), vec!["create_record"]);
    }

    #[tokio::test]
    async fn test_amount_mode_uses_supplied_commission() {
        let (db, audit) = testing::setup().await;
        let dist = testing::user(&db, "dist_b", Role::DistributorB, 8.0).await;
        let member_id = testing::member(&db, dist.id, "M").await;
        let service = LedgerService::new(db, audit);

        let body = RecordInput {
            commission: Some(300.0),
            commission_type: Some(CommissionType::Amount),
            ..input(member_id, 5000.0, 0.0, 200.0)
        };
        let record = service.create(&dist, body).await.unwrap();
        assert_eq!(record.commission, 300.0);
        assert_eq!(
            record.net_revenue,
            record.received_amount - record.deposit - record.insurance - record.commission
        );
    }

    #[tokio::test]
    async fn test_create_validation_order() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        let member_id = testing::member(&db, a.id, "M").await;
        let service = LedgerService::new(db, audit);

        let missing = RecordInput { deposit: None, ..input(member_id, 100.0, 0.0, 0.0) };
        assert!(matches!(service.create(&a, missing).await, Err(ApiError::BadRequest(_))));
        assert!(matches!(
            service.create(&a, input(member_id, -1.0, 0.0, 0.0)).await,
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(&a, input(5555, 100.0, 0.0, 0.0)).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            service.create(&b, input(member_id, 100.0, 0.0, 0.0)).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_update_recomputes_with_current_rate() {
        let (db, audit) = testing::setup().await;
        let admin = testing::admin(&db).await;
        let dist = testing::user(&db, "dist_a", Role::DistributorA, 6.0).await;
        let member_id = testing::member(&db, dist.id, "M").await;
        let service = LedgerService::new(db.clone(), audit);

        let body = RecordInput {
            commission: Some(50.0),
            commission_type: Some(CommissionType::Amount),
            ..input(member_id, 1000.0, 100.0, 0.0)
        };
        let record = service.create(&dist, body).await.unwrap();

        {
            let mut conn = db.acquire().await.unwrap();
            let update = users::DistributorUpdate {
                name: None,
                phone: None,
                email: None,
                commission_rate: Some(10.0),
                status: None,
            };
            users::update_distributor(&mut conn, dist.id, &update).await.unwrap();
        }

        let patch = RecordInput { received_amount: Some(2000.0), ..Default::default() };
        let updated = service.update(&admin, record.id, patch).await.unwrap();
        assert_eq!(updated.commission, 200.0);
        assert_eq!(updated.commission_type, CommissionType::Rate);
        assert_eq!(updated.deposit, 100.0);
        assert_eq!(updated.net_revenue, 2000.0 - 100.0 - 0.0 - 200.0);
    }

    #[tokio::test]
    async fn test_delete_is_admin_only_regardless_of_existence() {
        let (db, audit) = testing::setup().await;
        let admin = testing::admin(&db).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        let member_id = testing::member(&db, b.id, "M").await;
        let service = LedgerService::new(db, audit);
        let record = service.create(&b, input(member_id, 100.0, 0.0, 0.0)).await.unwrap();

        assert!(matches!(service.delete(&b, record.id).await, Err(ApiError::Forbidden(_))));
        assert!(matches!(service.delete(&b, 123456).await, Err(ApiError::Forbidden(_))));
        assert!(matches!(service.delete(&admin, 123456).await, Err(ApiError::NotFound(_))));
        service.delete(&admin, record.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_statistics_scope() {
        let (db, audit) = testing::setup().await;
        let admin = testing::admin(&db).await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        let ma = testing::member(&db, a.id, "A1").await;
        let mb = testing::member(&db, b.id, "B1").await;
        let service = LedgerService::new(db, audit);

        service.create(&a, input(ma, 10000.0, 1000.0, 500.0)).await.unwrap();
        service.create(&b, input(mb, 1000.0, 0.0, 0.0)).await.unwrap();

        let own = service.statistics(&a, None, None).await.unwrap();
        assert_eq!(own.totals.record_count, 1);
        assert_eq!(own.totals.total_net_revenue, 7900.0);
        assert_eq!(own.total_members, 1);

        let all = service.statistics(&admin, None, None).await.unwrap();
        assert_eq!(all.totals.record_count, 2);
        assert_eq!(all.totals.total_received, 11000.0);
        assert_eq!(all.total_members, 2);

        let out_of_range = service
            .statistics(&admin, Some(date(2026, 1, 1)), None)
            .await
            .unwrap();
        assert_eq!(out_of_range.totals.record_count, 0);

        let listed = service.list(&b, RecordQuery { distributor_id: Some(a.id), ..Default::default() }).await.unwrap();
        assert!(listed.iter().all(|r| r.record.distributor_id == b.id));
    }
}
