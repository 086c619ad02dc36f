//! Labor task (contract) queries

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;

use super::models::{LaborTask, LaborTaskView};
use crate::types::TaskStatus;

/// 계약 필드 (sign + years → expire)
#[derive(Debug, Clone, Copy)]
pub struct Contract {
    pub sign_date: NaiveDate,
    pub years: u32,
    pub expire_date: NaiveDate,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    member_id: i64,
    member_pool_id: Option<i64>,
    contract: Option<Contract>,
    monthly_amount: f64,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO labor_tasks (
            member_pool_id, member_id, contract_sign_date, contract_years,
            contract_expire_date, monthly_amount, task_status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 'active', ?, ?)
        "#
    )
    .bind(member_pool_id)
    .bind(member_id)
    .bind(contract.map(|c| c.sign_date))
    .bind(contract.map(|c| c.years as i64))
    .bind(contract.map(|c| c.expire_date))
    .bind(monthly_amount)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<LaborTask>, sqlx::Error> {
    sqlx::query_as::<_, LaborTask>("SELECT * FROM labor_tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// 회원의 활성 계약 (여러 개면 최신 것)
pub async fn find_active_for_member(
    conn: &mut SqliteConnection,
    member_id: i64,
) -> Result<Option<LaborTask>, sqlx::Error> {
    sqlx::query_as::<_, LaborTask>(
        r#"
        SELECT * FROM labor_tasks
        WHERE member_id = ? AND task_status = 'active'
        ORDER BY id DESC
        LIMIT 1
        "#
    )
    .bind(member_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn list(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
    status: Option<TaskStatus>,
) -> Result<Vec<LaborTaskView>, sqlx::Error> {
    sqlx::query_as::<_, LaborTaskView>(
        r#"
        SELECT lt.*, m.name AS member_name, u.name AS distributor_name
        FROM labor_tasks lt
        LEFT JOIN members m ON lt.member_id = m.id
        LEFT JOIN users u ON m.distributor_id = u.id
        WHERE (?1 IS NULL OR m.distributor_id = ?1)
          AND (?2 IS NULL OR lt.task_status = ?2)
        ORDER BY lt.created_at DESC, lt.id DESC
        "#
    )
    .bind(distributor_id)
    .bind(status)
    .fetch_all(&mut *conn)
    .await
}

pub async fn set_monthly_amount(
    conn: &mut SqliteConnection,
    id: i64,
    monthly_amount: f64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE labor_tasks SET monthly_amount = ?, updated_at = ? WHERE id = ?")
        .bind(monthly_amount)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn set_contract(
    conn: &mut SqliteConnection,
    id: i64,
    contract: Contract,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE labor_tasks SET
            contract_sign_date = ?,
            contract_years = ?,
            contract_expire_date = ?,
            updated_at = ?
        WHERE id = ?
        "#
    )
    .bind(contract.sign_date)
    .bind(contract.years as i64)
    .bind(contract.expire_date)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn mark_exited(
    conn: &mut SqliteConnection,
    id: i64,
    exit_date: NaiveDate,
    exit_reason: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE labor_tasks SET
            task_status = 'exited',
            exit_date = ?,
            exit_reason = ?,
            updated_at = ?
        WHERE id = ?
        "#
    )
    .bind(exit_date)
    .bind(exit_reason)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
