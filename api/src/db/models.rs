//! Database Models
//!
//! Row types for the accounting schema. Money columns are `REAL`, dates are
//! `YYYY-MM-DD` text and timestamps are UTC `YYYY-MM-DD HH:MM:SS` text.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::types::{CommissionType, InviteStatus, Role, Status, TaskStatus};

/// 사용자 (관리자 / 대리점)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// 응답에 절대 포함하지 않음
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// 수수료 비율 (%)
    pub commission_rate: f64,
    /// 고정 수수료 금액
    pub commission_amount: f64,
    pub deposit_amount: f64,
    pub insurance_amount: f64,
    pub settings_locked: bool,
    /// 이 사용자가 배포할 수 있는 본인 코드
    pub invite_code: Option<String>,
    pub invited_by: Option<i64>,
    pub status: Status,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 초대 코드 (unused → used, 1회성)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InviteCode {
    pub id: i64,
    pub code: String,
    pub created_by: i64,
    pub used_by: Option<i64>,
    pub role: Role,
    pub status: InviteStatus,
    pub created_at: NaiveDateTime,
    pub used_at: Option<NaiveDateTime>,
}

/// 초대 코드 + 생성자/사용자 이름
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InviteCodeView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub code: InviteCode,
    pub creator_name: Option<String>,
    pub used_by_name: Option<String>,
}

/// 계약 대상 회원
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub id_card_1: Option<String>,
    pub id_card_1_register_date: Option<NaiveDate>,
    pub id_card_1_expire_date: Option<NaiveDate>,
    pub id_card_2: Option<String>,
    pub id_card_2_register_date: Option<NaiveDate>,
    pub id_card_2_expire_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub distributor_id: i64,
    /// 증명서 슬롯 → 파일 경로
    pub documents: Json<serde_json::Map<String, serde_json::Value>>,
    /// 자유 형식 추가 항목
    pub additional_info: Json<serde_json::Map<String, serde_json::Value>>,
    pub status: Status,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 회원 + 소속 대리점 정보
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub member: Member,
    pub distributor_name: Option<String>,
    pub distributor_role: Option<Role>,
}

/// 인원 풀 (계약 전 대기 인원)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PoolMember {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub id_card_1: Option<String>,
    pub id_card_2: Option<String>,
    pub city: Option<String>,
    pub distributor_id: i64,
    /// 계약으로 전환되었는지
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// 노동 계약
///
/// 금액만 먼저 설정된 경우 계약 필드가 비어 있는 "부분" 상태가 존재
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LaborTask {
    pub id: i64,
    pub member_pool_id: Option<i64>,
    pub member_id: i64,
    pub contract_sign_date: Option<NaiveDate>,
    pub contract_years: Option<i64>,
    pub contract_expire_date: Option<NaiveDate>,
    pub monthly_amount: f64,
    pub task_status: TaskStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl LaborTask {
    /// 계약 기간과 금액이 모두 있어야 청구서 생성 가능
    pub fn contract_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.contract_sign_date, self.contract_expire_date) {
            (Some(sign), Some(expire)) if self.monthly_amount > 0.0 => Some((sign, expire)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LaborTaskView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: LaborTask,
    pub member_name: Option<String>,
    pub distributor_name: Option<String>,
}

/// 월별 청구서
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyBill {
    pub id: i64,
    pub labor_task_id: Option<i64>,
    pub member_id: i64,
    pub distributor_id: i64,
    /// `YYYY-MM`
    pub bill_month: String,
    pub monthly_amount: f64,
    pub deposit_confirmed: bool,
    pub confirmed_by: Option<i64>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyBillView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub bill: MonthlyBill,
    pub member_name: Option<String>,
    pub distributor_name: Option<String>,
    pub contract_sign_date: Option<NaiveDate>,
    pub contract_expire_date: Option<NaiveDate>,
}

/// 장부 기록
///
/// `net_revenue = received_amount - deposit - insurance - commission`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountingRecord {
    pub id: i64,
    pub member_id: i64,
    pub distributor_id: i64,
    pub received_amount: f64,
    pub deposit: f64,
    pub insurance: f64,
    pub commission: f64,
    pub commission_type: CommissionType,
    pub net_revenue: f64,
    pub record_date: NaiveDate,
    pub city: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountingRecordView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: AccountingRecord,
    pub member_name: Option<String>,
    pub distributor_name: Option<String>,
    pub distributor_role: Option<Role>,
}

/// 대리점별 월간 스냅샷
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyReminder {
    pub id: i64,
    pub distributor_id: i64,
    pub reminder_month: String,
    pub total_members: i64,
    pub confirmed_count: i64,
    pub pending_count: i64,
    pub total_amount: f64,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// 감사 로그 (append-only)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperationLog {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub details: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperationLogView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub log: OperationLog,
    pub user_name: Option<String>,
    pub user_role: Option<Role>,
}

// ============ Aggregates ============

/// 청구서 집계 (건수 / 확인 / 대기 / 금액)
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct BillStats {
    pub total_bills: i64,
    pub confirmed_count: i64,
    pub pending_count: i64,
    pub total_amount: f64,
    pub confirmed_amount: f64,
}

/// 수금 현황 (월 × 대리점)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RentCollectionRow {
    pub bill_month: String,
    pub distributor_id: i64,
    pub distributor_name: Option<String>,
    pub total_members: i64,
    pub confirmed_count: i64,
    pub pending_count: i64,
    pub total_amount: f64,
    pub confirmed_amount: f64,
}

/// 장부 합계
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct LedgerTotals {
    pub record_count: i64,
    pub total_received: f64,
    pub total_deposit: f64,
    pub total_insurance: f64,
    pub total_commission: f64,
    pub total_net_revenue: f64,
}

/// 대리점 목록 행 (관리자 화면)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DistributorSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub member_count: i64,
    pub total_received: f64,
    pub total_commission: f64,
    pub total_net_revenue: f64,
}
