//! Monthly reminder queries

use chrono::Utc;
use sqlx::SqliteConnection;

use super::models::{BillStats, MonthlyReminder};
use crate::types::BillMonth;

pub async fn exists(
    conn: &mut SqliteConnection,
    distributor_id: i64,
    month: BillMonth,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM monthly_reminders WHERE distributor_id = ? AND reminder_month = ?",
    )
    .bind(distributor_id)
    .bind(month.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}

pub async fn insert(
    conn: &mut SqliteConnection,
    distributor_id: i64,
    month: BillMonth,
    stats: &BillStats,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO monthly_reminders (
            distributor_id, reminder_month, total_members, confirmed_count,
            pending_count, total_amount, is_read, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 0, ?)
        "#
    )
    .bind(distributor_id)
    .bind(month.to_string())
    .bind(stats.total_bills)
    .bind(stats.confirmed_count)
    .bind(stats.pending_count)
    .bind(stats.total_amount)
    .bind(Utc::now().naive_utc())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<MonthlyReminder>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyReminder>("SELECT * FROM monthly_reminders WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn list(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
) -> Result<Vec<MonthlyReminder>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyReminder>(
        r#"
        SELECT * FROM monthly_reminders
        WHERE (?1 IS NULL OR distributor_id = ?1)
        ORDER BY reminder_month DESC, created_at DESC, id DESC
        "#
    )
    .bind(distributor_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn mark_read(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE monthly_reminders SET is_read = 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
