//! Accounting record queries

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;

use super::models::{AccountingRecord, AccountingRecordView, LedgerTotals};
use crate::types::CommissionType;

/// 저장할 금액 항목 (commission / net_revenue 는 계산 완료 상태)
#[derive(Debug, Clone)]
pub struct RecordValues {
    pub received_amount: f64,
    pub deposit: f64,
    pub insurance: f64,
    pub commission: f64,
    pub commission_type: CommissionType,
    pub net_revenue: f64,
    pub record_date: NaiveDate,
    pub city: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub distributor_id: Option<i64>,
    pub member_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    member_id: i64,
    distributor_id: i64,
    values: &RecordValues,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO accounting_records (
            member_id, distributor_id, received_amount, deposit, insurance,
            commission, commission_type, net_revenue, record_date, city, notes,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#
    )
    .bind(member_id)
    .bind(distributor_id)
    .bind(values.received_amount)
    .bind(values.deposit)
    .bind(values.insurance)
    .bind(values.commission)
    .bind(values.commission_type)
    .bind(values.net_revenue)
    .bind(values.record_date)
    .bind(&values.city)
    .bind(&values.notes)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<AccountingRecord>, sqlx::Error> {
    sqlx::query_as::<_, AccountingRecord>("SELECT * FROM accounting_records WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    values: &RecordValues,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE accounting_records SET
            received_amount = ?, deposit = ?, insurance = ?,
            commission = ?, commission_type = ?, net_revenue = ?,
            record_date = ?, city = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#
    )
    .bind(values.received_amount)
    .bind(values.deposit)
    .bind(values.insurance)
    .bind(values.commission)
    .bind(values.commission_type)
    .bind(values.net_revenue)
    .bind(values.record_date)
    .bind(&values.city)
    .bind(&values.notes)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM accounting_records WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &RecordFilter,
) -> Result<Vec<AccountingRecordView>, sqlx::Error> {
    sqlx::query_as::<_, AccountingRecordView>(
        r#"
        SELECT
            ar.*,
            m.name AS member_name,
            u.name AS distributor_name,
            u.role AS distributor_role
        FROM accounting_records ar
        LEFT JOIN members m ON ar.member_id = m.id
        LEFT JOIN users u ON ar.distributor_id = u.id
        WHERE (?1 IS NULL OR ar.distributor_id = ?1)
          AND (?2 IS NULL OR ar.member_id = ?2)
          AND (?3 IS NULL OR ar.record_date >= ?3)
          AND (?4 IS NULL OR ar.record_date <= ?4)
        ORDER BY ar.record_date DESC, ar.created_at DESC, ar.id DESC
        "#
    )
    .bind(filter.distributor_id)
    .bind(filter.member_id)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .fetch_all(&mut *conn)
    .await
}

/// 범위 내 장부 합계
pub async fn totals(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
    member_id: Option<i64>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<LedgerTotals, sqlx::Error> {
    sqlx::query_as::<_, LedgerTotals>(
        r#"
        SELECT
            COUNT(*) AS record_count,
            COALESCE(SUM(received_amount), 0.0) AS total_received,
            COALESCE(SUM(deposit), 0.0) AS total_deposit,
            COALESCE(SUM(insurance), 0.0) AS total_insurance,
            COALESCE(SUM(commission), 0.0) AS total_commission,
            COALESCE(SUM(net_revenue), 0.0) AS total_net_revenue
        FROM accounting_records
        WHERE (?1 IS NULL OR distributor_id = ?1)
          AND (?2 IS NULL OR member_id = ?2)
          AND (?3 IS NULL OR record_date >= ?3)
          AND (?4 IS NULL OR record_date <= ?4)
        "#
    )
    .bind(distributor_id)
    .bind(member_id)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(&mut *conn)
    .await
}
