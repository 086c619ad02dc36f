//! Monthly bill queries

use chrono::Utc;
use sqlx::SqliteConnection;

use super::models::{BillStats, MonthlyBill, MonthlyBillView, RentCollectionRow};
use crate::types::BillMonth;

/// 집계 컬럼 (BillStats 와 동일한 이름)
const STATS_COLUMNS: &str = r#"
    COUNT(*) AS total_bills,
    COALESCE(SUM(CASE WHEN deposit_confirmed = 1 THEN 1 ELSE 0 END), 0) AS confirmed_count,
    COALESCE(SUM(CASE WHEN deposit_confirmed = 0 THEN 1 ELSE 0 END), 0) AS pending_count,
    COALESCE(SUM(monthly_amount), 0.0) AS total_amount,
    COALESCE(SUM(CASE WHEN deposit_confirmed = 1 THEN monthly_amount ELSE 0.0 END), 0.0) AS confirmed_amount
"#;

pub struct NewBill {
    pub labor_task_id: Option<i64>,
    pub member_id: i64,
    pub distributor_id: i64,
    pub bill_month: BillMonth,
    pub monthly_amount: f64,
}

pub async fn insert(conn: &mut SqliteConnection, bill: &NewBill) -> Result<i64, sqlx::Error> {
    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO monthly_bills (
            labor_task_id, member_id, distributor_id, bill_month, monthly_amount,
            deposit_confirmed, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, 0, ?, ?)
        "#
    )
    .bind(bill.labor_task_id)
    .bind(bill.member_id)
    .bind(bill.distributor_id)
    .bind(bill.bill_month.to_string())
    .bind(bill.monthly_amount)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<MonthlyBill>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyBill>("SELECT * FROM monthly_bills WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_for_member_month(
    conn: &mut SqliteConnection,
    member_id: i64,
    month: BillMonth,
) -> Result<Option<MonthlyBill>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyBill>(
        "SELECT * FROM monthly_bills WHERE member_id = ? AND bill_month = ?",
    )
    .bind(member_id)
    .bind(month.to_string())
    .fetch_optional(&mut *conn)
    .await
}

pub async fn list(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
    month: Option<BillMonth>,
) -> Result<Vec<MonthlyBillView>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyBillView>(
        r#"
        SELECT
            mb.*,
            m.name AS member_name,
            u.name AS distributor_name,
            lt.contract_sign_date,
            lt.contract_expire_date
        FROM monthly_bills mb
        LEFT JOIN members m ON mb.member_id = m.id
        LEFT JOIN users u ON mb.distributor_id = u.id
        LEFT JOIN labor_tasks lt ON mb.labor_task_id = lt.id
        WHERE (?1 IS NULL OR mb.distributor_id = ?1)
          AND (?2 IS NULL OR mb.bill_month = ?2)
        ORDER BY mb.bill_month DESC, mb.created_at DESC, mb.id DESC
        "#
    )
    .bind(distributor_id)
    .bind(month.map(|m| m.to_string()))
    .fetch_all(&mut *conn)
    .await
}

pub async fn list_for_task(
    conn: &mut SqliteConnection,
    labor_task_id: i64,
) -> Result<Vec<MonthlyBill>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyBill>(
        "SELECT * FROM monthly_bills WHERE labor_task_id = ? ORDER BY bill_month",
    )
    .bind(labor_task_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn confirm(
    conn: &mut SqliteConnection,
    id: i64,
    confirmed_by: i64,
    notes: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        r#"
        UPDATE monthly_bills SET
            deposit_confirmed = 1,
            confirmed_by = ?,
            confirmed_at = ?,
            notes = ?,
            updated_at = ?
        WHERE id = ?
        "#
    )
    .bind(confirmed_by)
    .bind(now)
    .bind(notes)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_amount(
    conn: &mut SqliteConnection,
    id: i64,
    labor_task_id: i64,
    monthly_amount: f64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE monthly_bills SET monthly_amount = ?, labor_task_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(monthly_amount)
    .bind(labor_task_id)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// 계약의 `after` 이후(초과) 월 청구서 삭제
pub async fn delete_after(
    conn: &mut SqliteConnection,
    labor_task_id: i64,
    after: BillMonth,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM monthly_bills WHERE labor_task_id = ? AND bill_month > ?")
        .bind(labor_task_id)
        .bind(after.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// `[first, last]` 밖의 미확인 청구서 삭제
pub async fn delete_unconfirmed_outside(
    conn: &mut SqliteConnection,
    labor_task_id: i64,
    first: BillMonth,
    last: BillMonth,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM monthly_bills
         WHERE labor_task_id = ? AND deposit_confirmed = 0
           AND (bill_month < ? OR bill_month > ?)",
    )
    .bind(labor_task_id)
    .bind(first.to_string())
    .bind(last.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// 특정 월 집계
pub async fn stats_for_month(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
    month: BillMonth,
) -> Result<BillStats, sqlx::Error> {
    let sql = format!(
        "SELECT {STATS_COLUMNS} FROM monthly_bills WHERE bill_month = ?1 AND (?2 IS NULL OR distributor_id = ?2)"
    );
    sqlx::query_as::<_, BillStats>(&sql)
        .bind(month.to_string())
        .bind(distributor_id)
        .fetch_one(&mut *conn)
        .await
}

/// 월 × 대리점 수금 현황 (양 끝 포함 범위)
pub async fn rent_collection(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
    start: Option<BillMonth>,
    end: Option<BillMonth>,
) -> Result<Vec<RentCollectionRow>, sqlx::Error> {
    sqlx::query_as::<_, RentCollectionRow>(
        r#"
        SELECT
            mb.bill_month,
            mb.distributor_id,
            u.name AS distributor_name,
            COUNT(*) AS total_members,
            COALESCE(SUM(CASE WHEN mb.deposit_confirmed = 1 THEN 1 ELSE 0 END), 0) AS confirmed_count,
            COALESCE(SUM(CASE WHEN mb.deposit_confirmed = 0 THEN 1 ELSE 0 END), 0) AS pending_count,
            COALESCE(SUM(mb.monthly_amount), 0.0) AS total_amount,
            COALESCE(SUM(CASE WHEN mb.deposit_confirmed = 1 THEN mb.monthly_amount ELSE 0.0 END), 0.0) AS confirmed_amount
        FROM monthly_bills mb
        LEFT JOIN users u ON mb.distributor_id = u.id
        WHERE (?1 IS NULL OR mb.distributor_id = ?1)
          AND (?2 IS NULL OR mb.bill_month >= ?2)
          AND (?3 IS NULL OR mb.bill_month <= ?3)
        GROUP BY mb.bill_month, mb.distributor_id
        ORDER BY mb.bill_month DESC, mb.distributor_id
        "#
    )
    .bind(distributor_id)
    .bind(start.map(|m| m.to_string()))
    .bind(end.map(|m| m.to_string()))
    .fetch_all(&mut *conn)
    .await
}
