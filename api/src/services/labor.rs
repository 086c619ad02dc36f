//! Labor Service
//!
//! 인원 풀 → 회원 + 노동 계약 전환, 계약 종료, 일괄 금액/계약 설정
//!
//! # Interview Q&A
//!
//! Q: 금액과 계약 기간을 따로 설정할 수 있는데 청구서는 언제 생기는가?
//! A: 둘 다 채워진 시점
//!
//!    ```text
//!    bulk amount   → 활성 계약이 없으면 "부분" 계약 생성 (기간 없음)
//!    bulk contract → 기간 채움 → 금액 > 0 이면 청구서 일괄 생성
//!    ```
//!
//!    반대 순서(기간 먼저, 금액 나중)도 같은 규칙으로 동작
//!
//! Q: 풀에서 계약을 만들 때 트랜잭션을 쓰는 이유는?
//! A: 회원 생성 → 계약 생성 → 청구서 생성 → 풀 플래그 변경 중
//!    어느 단계에서 실패해도 중간 상태(계약 없는 회원)가 남지 않도록

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::access::{self, Capability};
use super::billing::generate_monthly_bills;
use super::members::{resolve_owner, MemberInput};
use super::BatchOutcome;
use crate::db::labor::Contract;
use crate::db::{
    bills, labor, member_pool, members, Database, LaborTaskView, NewOperationLog,
    OperationLogRepository, PoolMember,
};
use crate::error::ApiError;
use crate::types::{add_years, today, BillMonth, Caller, Status, TaskStatus};

/// 계약 기간 상한 (년)
const MAX_CONTRACT_YEARS: u32 = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    pub member_pool_id: i64,
    pub contract_sign_date: NaiveDate,
    pub contract_years: u32,
    pub monthly_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTaskInput {
    pub member_id: i64,
    pub contract_sign_date: NaiveDate,
    pub contract_years: u32,
    pub monthly_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct TaskCreated {
    pub task_id: i64,
    pub member_id: i64,
    pub contract_expire_date: NaiveDate,
    pub bills_generated: u32,
}

#[derive(Debug, Serialize)]
pub struct TaskExited {
    pub task_id: i64,
    pub exit_date: NaiveDate,
    pub removed_bills: u64,
}

fn build_contract(sign_date: NaiveDate, years: u32) -> Result<Contract, ApiError> {
    if !(1..=MAX_CONTRACT_YEARS).contains(&years) {
        return Err(ApiError::ValidationError(format!(
            "contractYears must be between 1 and {MAX_CONTRACT_YEARS}"
        )));
    }
    let expire_date = add_years(sign_date, years)
        .ok_or_else(|| ApiError::ValidationError("Contract period is out of range".to_string()))?;

    Ok(Contract { sign_date, years, expire_date })
}

fn validate_amount(amount: f64) -> Result<(), ApiError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(ApiError::ValidationError("monthlyAmount must be greater than 0".to_string()))
    }
}

pub struct LaborService {
    db: Database,
    audit: Arc<dyn OperationLogRepository>,
}

impl LaborService {
    pub fn new(db: Database, audit: Arc<dyn OperationLogRepository>) -> Self {
        Self { db, audit }
    }

    // ============ Member Pool ============

    pub async fn list_pool(&self, caller: &Caller, is_active: Option<bool>) -> Result<Vec<PoolMember>, ApiError> {
        let mut conn = self.db.acquire().await?;
        Ok(member_pool::list(&mut conn, caller.scope(), is_active).await?)
    }

    pub async fn add_to_pool(&self, caller: &Caller, input: MemberInput) -> Result<PoolMember, ApiError> {
        let (requested, fields) = input.into_fields();
        let name = fields
            .name
            .clone()
            .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;

        let mut conn = self.db.acquire().await?;
        let distributor_id = resolve_owner(&mut conn, caller, requested).await?;
        let id = member_pool::insert(&mut conn, distributor_id, &fields).await?;
        let pool = member_pool::find_by_id(&mut conn, id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        self.audit
            .record(
                NewOperationLog::new(caller.id, "add_to_pool")
                    .target("member_pool", id)
                    .details(format!("Added {name} to the member pool")),
            )
            .await;

        Ok(pool)
    }

    // ============ Tasks ============

    pub async fn list_tasks(
        &self,
        caller: &Caller,
        status: Option<TaskStatus>,
    ) -> Result<Vec<LaborTaskView>, ApiError> {
        let mut conn = self.db.acquire().await?;
        Ok(labor::list(&mut conn, caller.scope(), status).await?)
    }

    /// 풀 인원으로 회원 + 계약 + 청구서 생성 (단일 트랜잭션)
    pub async fn create_from_pool(&self, caller: &Caller, input: CreateTaskInput) -> Result<TaskCreated, ApiError> {
        let contract = build_contract(input.contract_sign_date, input.contract_years)?;
        validate_amount(input.monthly_amount)?;

        let mut tx = self.db.begin().await?;
        let pool = member_pool::find_by_id(&mut tx, input.member_pool_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Pool member".to_string()))?;
        access::require(caller, Capability::ManageTask, Some(pool.distributor_id))?;
        if pool.is_active {
            return Err(ApiError::BadRequest("Pool member already has a contract".to_string()));
        }

        let member_id =
            members::insert(&mut tx, pool.distributor_id, &member_pool::to_member_fields(&pool)).await?;
        let task_id =
            labor::insert(&mut tx, member_id, Some(pool.id), Some(contract), input.monthly_amount).await?;
        member_pool::mark_active(&mut tx, pool.id).await?;

        let task = labor::find_by_id(&mut tx, task_id)
            .await?
            .ok_or(ApiError::InternalError)?;
        let bills_generated = generate_monthly_bills(&mut tx, &task, pool.distributor_id).await?;
        tx.commit().await?;

        tracing::info!(task_id, member_id, bills_generated, "Labor task created from pool");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "create_labor_task")
                    .target("labor_task", task_id)
                    .details(format!(
                        "Contract for {} from {} for {} years",
                        pool.name, contract.sign_date, contract.years
                    )),
            )
            .await;

        Ok(TaskCreated {
            task_id,
            member_id,
            contract_expire_date: contract.expire_date,
            bills_generated,
        })
    }

    /// 기존 회원에게 새 계약 시작 (활성 계약이 있으면 거부)
    pub async fn start_for_member(&self, caller: &Caller, input: StartTaskInput) -> Result<TaskCreated, ApiError> {
        let contract = build_contract(input.contract_sign_date, input.contract_years)?;
        validate_amount(input.monthly_amount)?;

        let mut tx = self.db.begin().await?;
        let member = members::find_by_id(&mut tx, input.member_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Member".to_string()))?;
        access::require(caller, Capability::ManageTask, Some(member.distributor_id))?;
        if labor::find_active_for_member(&mut tx, member.id).await?.is_some() {
            return Err(ApiError::BadRequest("Member already has an active labor task".to_string()));
        }

        let task_id = labor::insert(&mut tx, member.id, None, Some(contract), input.monthly_amount).await?;
        members::set_status(&mut tx, member.id, Status::Active).await?;

        let task = labor::find_by_id(&mut tx, task_id)
            .await?
            .ok_or(ApiError::InternalError)?;
        let bills_generated = generate_monthly_bills(&mut tx, &task, member.distributor_id).await?;
        tx.commit().await?;

        tracing::info!(task_id, member_id = member.id, bills_generated, "Labor task started");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "start_labor_task")
                    .target("labor_task", task_id)
                    .details(format!("Contract for {} from {}", member.name, contract.sign_date)),
            )
            .await;

        Ok(TaskCreated {
            task_id,
            member_id: member.id,
            contract_expire_date: contract.expire_date,
            bills_generated,
        })
    }

    pub async fn exit(&self, caller: &Caller, task_id: i64, reason: Option<&str>) -> Result<TaskExited, ApiError> {
        self.exit_on(caller, task_id, reason, today()).await
    }

    /// 계약 종료
    ///
    /// 회원은 inactive 로, `on` 이 속한 달보다 뒤의 청구서만 삭제
    pub async fn exit_on(
        &self,
        caller: &Caller,
        task_id: i64,
        reason: Option<&str>,
        on: NaiveDate,
    ) -> Result<TaskExited, ApiError> {
        let mut tx = self.db.begin().await?;
        let task = labor::find_by_id(&mut tx, task_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Labor task".to_string()))?;
        let member = members::find_by_id(&mut tx, task.member_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Member".to_string()))?;
        access::require(caller, Capability::ManageTask, Some(member.distributor_id))?;
        if task.task_status == TaskStatus::Exited {
            return Err(ApiError::BadRequest("Labor task has already exited".to_string()));
        }

        labor::mark_exited(&mut tx, task_id, on, reason).await?;
        members::set_status(&mut tx, member.id, Status::Inactive).await?;
        let removed_bills = bills::delete_after(&mut tx, task_id, BillMonth::of(on)).await?;
        tx.commit().await?;

        tracing::info!(task_id, member_id = member.id, removed_bills, "Labor task exited");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "exit_labor_task")
                    .target("labor_task", task_id)
                    .details(format!("{} exited: {}", member.name, reason.unwrap_or("-"))),
            )
            .await;

        Ok(TaskExited { task_id, exit_date: on, removed_bills })
    }

    // ============ Bulk ============

    /// 여러 회원의 월 금액 일괄 설정
    ///
    /// 없거나 비활성인 회원은 실패로 집계하고 계속 진행
    pub async fn bulk_set_amount(
        &self,
        caller: &Caller,
        member_ids: &[i64],
        monthly_amount: f64,
    ) -> Result<BatchOutcome, ApiError> {
        validate_amount(monthly_amount)?;
        if member_ids.is_empty() {
            return Err(ApiError::ValidationError("memberIds must not be empty".to_string()));
        }

        let month = BillMonth::current();
        let mut outcome = BatchOutcome::default();
        for &member_id in member_ids {
            let result = self.set_amount_for(caller, member_id, monthly_amount, month).await;
            outcome.tally(member_id, &result);
        }

        self.audit
            .record(NewOperationLog::new(caller.id, "bulk_set_amount").details(format!(
                "Set monthly amount {monthly_amount} for {} of {} members",
                outcome.succeeded,
                member_ids.len()
            )))
            .await;

        Ok(outcome)
    }

    async fn set_amount_for(
        &self,
        caller: &Caller,
        member_id: i64,
        monthly_amount: f64,
        month: BillMonth,
    ) -> Result<(), ApiError> {
        let mut tx = self.db.begin().await?;
        let member = members::find_by_id(&mut tx, member_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Member".to_string()))?;
        if member.status != Status::Active {
            return Err(ApiError::BadRequest("Member is not active".to_string()));
        }
        access::require(caller, Capability::ManageTask, Some(member.distributor_id))?;

        let task = match labor::find_active_for_member(&mut tx, member_id).await? {
            Some(task) => {
                labor::set_monthly_amount(&mut tx, task.id, monthly_amount).await?;
                task
            }
            None => {
                let id = labor::insert(&mut tx, member_id, None, None, monthly_amount).await?;
                labor::find_by_id(&mut tx, id).await?.ok_or(ApiError::InternalError)?
            }
        };
        let task_id = task.id;

        // 계약 기간이 이번 달을 포함하지 않으면 이번 달 청구서는 건드리지 않음
        let covers_month = match (task.contract_sign_date, task.contract_expire_date) {
            (Some(sign), Some(expire)) => BillMonth::span(sign, expire).contains(&month),
            _ => true,
        };

        if covers_month {
            match bills::find_for_member_month(&mut tx, member_id, month).await? {
                Some(bill) => {
                    bills::set_amount(&mut tx, bill.id, task_id, monthly_amount).await?;
                }
                None => {
                    bills::insert(
                        &mut tx,
                        &bills::NewBill {
                            labor_task_id: Some(task_id),
                            member_id,
                            distributor_id: member.distributor_id,
                            bill_month: month,
                            monthly_amount,
                        },
                    )
                    .await?;
                }
            }
        }

        // 기간이 먼저 설정된 계약이면 이제 나머지 달 청구서 생성
        if let Some(task) = labor::find_by_id(&mut tx, task_id).await? {
            generate_monthly_bills(&mut tx, &task, member.distributor_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// 여러 회원의 계약 기간 일괄 설정 (부분 계약 완성)
    pub async fn bulk_set_contract(
        &self,
        caller: &Caller,
        member_ids: &[i64],
        sign_date: NaiveDate,
        years: u32,
    ) -> Result<BatchOutcome, ApiError> {
        let contract = build_contract(sign_date, years)?;
        if member_ids.is_empty() {
            return Err(ApiError::ValidationError("memberIds must not be empty".to_string()));
        }

        let mut outcome = BatchOutcome::default();
        for &member_id in member_ids {
            let result = self.set_contract_for(caller, member_id, contract).await;
            outcome.tally(member_id, &result);
        }

        self.audit
            .record(NewOperationLog::new(caller.id, "bulk_set_contract").details(format!(
                "Set contract {} + {} years for {} of {} members",
                sign_date,
                years,
                outcome.succeeded,
                member_ids.len()
            )))
            .await;

        Ok(outcome)
    }

    async fn set_contract_for(&self, caller: &Caller, member_id: i64, contract: Contract) -> Result<u32, ApiError> {
        let mut tx = self.db.begin().await?;
        let member = members::find_by_id(&mut tx, member_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Member".to_string()))?;
        if member.status != Status::Active {
            return Err(ApiError::BadRequest("Member is not active".to_string()));
        }
        access::require(caller, Capability::ManageTask, Some(member.distributor_id))?;

        let task_id = match labor::find_active_for_member(&mut tx, member_id).await? {
            Some(task) if task.contract_sign_date.is_some() => {
                return Err(ApiError::BadRequest(
                    "Active task already has a contract period".to_string(),
                ));
            }
            Some(task) => {
                labor::set_contract(&mut tx, task.id, contract).await?;
                task.id
            }
            None => labor::insert(&mut tx, member_id, None, Some(contract), 0.0).await?,
        };

        // 금액만 있던 부분 계약의 이번 달 청구서가 새 기간 밖이면 제거
        let months = BillMonth::span(contract.sign_date, contract.expire_date);
        if let (Some(&first), Some(&last)) = (months.first(), months.last()) {
            bills::delete_unconfirmed_outside(&mut tx, task_id, first, last).await?;
        }

        let task = labor::find_by_id(&mut tx, task_id)
            .await?
            .ok_or(ApiError::InternalError)?;
        let generated = generate_monthly_bills(&mut tx, &task, member.distributor_id).await?;
        tx.commit().await?;

        Ok(generated)
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

    async fn pool_member(service: &LaborService, caller: &Caller, name: &str) -> PoolMember {
        let input = MemberInput { name: Some(name.to_string()), ..Default::default() };
        service.add_to_pool(caller, input).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_from_pool_builds_member_task_and_bills() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let service = LaborService::new(db.clone(), audit.clone());
        let pool = pool_member(&service, &a, "Pool Person").await;

        let created = service
            .create_from_pool(
                &a,
                CreateTaskInput {
                    member_pool_id: pool.id,
                    contract_sign_date: date(2025, 1, 15),
                    contract_years: 2,
                    monthly_amount: 3000.0,
                },
            )
            .await
            .unwrap();

        assert_eq!(created.contract_expire_date, date(2027, 1, 15));
        assert_eq!(created.bills_generated, 24);

        let mut conn = db.acquire().await.unwrap();
        let member = members::find_by_id(&mut conn, created.member_id).await.unwrap().unwrap();
        assert_eq!(member.name, "Pool Person");
        assert_eq!(member.distributor_id, a.id);
        assert!(member_pool::find_by_id(&mut conn, pool.id).await.unwrap().unwrap().is_active);
        drop(conn);

        // 같은 풀 인원으로 두 번째 계약 불가
        let again = service
            .create_from_pool(
                &a,
                CreateTaskInput {
                    member_pool_id: pool.id,
                    contract_sign_date: date(2025, 1, 15),
                    contract_years: 1,
                    monthly_amount: 3000.0,
                },
            )
            .await;
        assert!(matches!(again, Err(ApiError::BadRequest(_))));
        assert_eq!(audit.actions(), vec!["add_to_pool", "create_labor_task"]);
    }

    #[tokio::test]
    async fn test_create_from_pool_rejects_other_distributor() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        let service = LaborService::new(db.clone(), audit);
        let pool = pool_member(&service, &a, "Owned by A").await;

        let result = service
            .create_from_pool(
                &b,
                CreateTaskInput {
                    member_pool_id: pool.id,
                    contract_sign_date: date(2025, 1, 1),
                    contract_years: 1,
                    monthly_amount: 1000.0,
                },
            )
            .await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        // 롤백: 회원이 생기지 않음
        let mut conn = db.acquire().await.unwrap();
        let filter = members::MemberFilter::default();
        assert!(members::list(&mut conn, &filter).await.unwrap().is_empty());
    }

    #[test]
    fn test_contract_validation() {
        assert!(matches!(build_contract(date(2025, 1, 1), 0), Err(ApiError::ValidationError(_))));
        assert_eq!(build_contract(date(2024, 2, 29), 1).unwrap().expire_date, date(2025, 2, 28));
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(1.0).is_ok());
    }

    #[tokio::test]
    async fn test_exit_removes_only_future_bills() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let member_id = testing::member(&db, a.id, "Leaver").await;
        let service = LaborService::new(db.clone(), audit);

        let created = service
            .start_for_member(
                &a,
                StartTaskInput {
                    member_id,
                    contract_sign_date: date(2025, 1, 10),
                    contract_years: 1,
                    monthly_amount: 2000.0,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.bills_generated, 12);

        let exited = service
            .exit_on(&a, created.task_id, Some("moved away"), date(2025, 6, 20))
            .await
            .unwrap();
        assert_eq!(exited.removed_bills, 6);

        let mut conn = db.acquire().await.unwrap();
        let remaining: Vec<String> = bills::list_for_task(&mut conn, created.task_id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.bill_month)
            .collect();
        assert_eq!(remaining.len(), 6);
        assert_eq!(remaining.last().map(String::as_str), Some("2025-06"));

        let task = labor::find_by_id(&mut conn, created.task_id).await.unwrap().unwrap();
        assert_eq!(task.task_status, TaskStatus::Exited);
        assert_eq!(task.exit_date, Some(date(2025, 6, 20)));
        assert_eq!(task.exit_reason.as_deref(), Some("moved away"));
        let member = members::find_by_id(&mut conn, member_id).await.unwrap().unwrap();
        assert_eq!(member.status, Status::Inactive);
        drop(conn);

        assert!(matches!(
            service.exit_on(&a, created.task_id, None, date(2025, 7, 1)).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_start_refused_with_active_task() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let member_id = testing::member(&db, a.id, "Busy").await;
        let service = LaborService::new(db, audit);
        let input = StartTaskInput {
            member_id,
            contract_sign_date: date(2025, 1, 1),
            contract_years: 1,
            monthly_amount: 1000.0,
        };

        service.start_for_member(&a, input.clone()).await.unwrap();
        assert!(matches!(
            service.start_for_member(&a, input).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_amount_then_contract_completes_partial_task() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        let mine = testing::member(&db, a.id, "Mine").await;
        let theirs = testing::member(&db, b.id, "Theirs").await;
        let service = LaborService::new(db.clone(), audit.clone());

        let outcome = service
            .bulk_set_amount(&a, &[mine, theirs, 9999], 1800.0)
            .await
            .unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 1, failed: 2 });

        let month = BillMonth::current();
        let task_id = {
            let mut conn = db.acquire().await.unwrap();
            let task = labor::find_active_for_member(&mut conn, mine).await.unwrap().unwrap();
            assert_eq!(task.monthly_amount, 1800.0);
            assert!(task.contract_sign_date.is_none());
            let bill = bills::find_for_member_month(&mut conn, mine, month).await.unwrap().unwrap();
            assert_eq!(bill.monthly_amount, 1800.0);
            assert_eq!(bill.labor_task_id, Some(task.id));
            task.id
        };

        // 이번 달 1일부터 1년 → 이번 달 청구서는 이미 있으므로 11건 추가
        let sign = NaiveDate::from_ymd_opt(month.year(), month.month(), 1).unwrap();
        let outcome = service.bulk_set_contract(&a, &[mine], sign, 1).await.unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 1, failed: 0 });

        let mut conn = db.acquire().await.unwrap();
        assert_eq!(bills::list_for_task(&mut conn, task_id).await.unwrap().len(), 12);
        assert_eq!(audit.actions(), vec!["bulk_set_amount", "bulk_set_contract"]);
    }

    fn bill_months(bills: &[crate::db::MonthlyBill]) -> Vec<String> {
        bills.iter().map(|b| b.bill_month.clone()).collect()
    }

    #[tokio::test]
    async fn test_bulk_contract_refuses_existing_contract() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let member_id = testing::member(&db, a.id, "Signed").await;
        let service = LaborService::new(db.clone(), audit);
        let started = service
            .start_for_member(
                &a,
                StartTaskInput {
                    member_id,
                    contract_sign_date: date(2025, 1, 1),
                    contract_years: 1,
                    monthly_amount: 1000.0,
                },
            )
            .await
            .unwrap();

        let outcome = service.bulk_set_contract(&a, &[member_id], date(2030, 1, 1), 1).await.unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 0, failed: 1 });

        let mut conn = db.acquire().await.unwrap();
        let task = labor::find_by_id(&mut conn, started.task_id).await.unwrap().unwrap();
        assert_eq!(task.contract_sign_date, Some(date(2025, 1, 1)));
        let expected: Vec<String> = BillMonth::span(date(2025, 1, 1), date(2026, 1, 1))
            .iter()
            .map(|m| m.to_string())
            .collect();
        let bills = bills::list_for_task(&mut conn, started.task_id).await.unwrap();
        assert_eq!(bill_months(&bills), expected);
    }

    #[tokio::test]
    async fn test_bulk_contract_drops_partial_bill_outside_new_period() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let member_id = testing::member(&db, a.id, "Later").await;
        let service = LaborService::new(db.clone(), audit);

        service.bulk_set_amount(&a, &[member_id], 1500.0).await.unwrap();
        let outcome = service.bulk_set_contract(&a, &[member_id], date(2030, 1, 1), 1).await.unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 1, failed: 0 });

        let mut conn = db.acquire().await.unwrap();
        let task = labor::find_active_for_member(&mut conn, member_id).await.unwrap().unwrap();
        let bills = bills::list_for_task(&mut conn, task.id).await.unwrap();
        let months = bill_months(&bills);
        assert_eq!(months.len(), 12);
        assert!(months.iter().all(|m| m.as_str() >= "2030-01" && m.as_str() <= "2030-12"));
        assert!(bills.iter().all(|b| b.monthly_amount == 1500.0));
    }

    #[tokio::test]
    async fn test_bulk_amount_leaves_uncovered_month_alone() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let member_id = testing::member(&db, a.id, "Future").await;
        let service = LaborService::new(db.clone(), audit);
        let started = service
            .start_for_member(
                &a,
                StartTaskInput {
                    member_id,
                    contract_sign_date: date(2030, 1, 1),
                    contract_years: 1,
                    monthly_amount: 1000.0,
                },
            )
            .await
            .unwrap();

        let outcome = service.bulk_set_amount(&a, &[member_id], 2000.0).await.unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 1, failed: 0 });

        let mut conn = db.acquire().await.unwrap();
        let task = labor::find_by_id(&mut conn, started.task_id).await.unwrap().unwrap();
        assert_eq!(task.monthly_amount, 2000.0);
        assert!(bills::find_for_member_month(&mut conn, member_id, BillMonth::current())
            .await
            .unwrap()
            .is_none());
        let bills = bills::list_for_task(&mut conn, started.task_id).await.unwrap();
        assert_eq!(bills.len(), 12);
        assert!(bill_months(&bills).iter().all(|m| m.starts_with("2030-")));
    }

    #[tokio::test]
    async fn test_bulk_amount_skips_inactive_member() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let member_id = testing::member(&db, a.id, "Inactive").await;
        {
            let mut conn = db.acquire().await.unwrap();
            members::set_status(&mut conn, member_id, Status::Inactive).await.unwrap();
        }
        let service = LaborService::new(db, audit);

        let outcome = service.bulk_set_amount(&a, &[member_id], 1000.0).await.unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 0, failed: 1 });
        assert!(matches!(
            service.bulk_set_amount(&a, &[member_id], 0.0).await,
            Err(ApiError::ValidationError(_))
        ));
    }
}
