//! User queries

use chrono::Utc;
use sqlx::SqliteConnection;

use super::models::{DistributorSummary, LedgerTotals, User};
use crate::types::{Role, Status};

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub role: Role,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub commission_rate: f64,
    pub invite_code: &'a str,
    pub invited_by: Option<i64>,
}

pub async fn insert(conn: &mut SqliteConnection, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO users (
            username, password_hash, name, role, phone, email,
            commission_rate, invite_code, invited_by, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)
        "#
    )
    .bind(user.username)
    .bind(user.password_hash)
    .bind(user.name)
    .bind(user.role)
    .bind(user.phone)
    .bind(user.email)
    .bind(user.commission_rate)
    .bind(user.invite_code)
    .bind(user.invited_by)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_admin(conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = 'admin' LIMIT 1")
        .fetch_optional(&mut *conn)
        .await
}

/// 대리점만 조회 (admin 제외)
pub async fn find_distributor(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id = ? AND role IN ('distributor_a', 'distributor_b')",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn active_distributor_ids(conn: &mut SqliteConnection) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM users WHERE role IN ('distributor_a', 'distributor_b') AND status = 'active' ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await
}

pub async fn count_distributors(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE role IN ('distributor_a', 'distributor_b') AND status = 'active'",
    )
    .fetch_one(&mut *conn)
    .await
}

/// 대리점 목록 + 활성 회원 수 + 장부 합계
///
/// 회원/장부를 각각 서브쿼리로 집계 (JOIN 곱셈으로 합계가 부풀지 않도록)
pub async fn list_distributors(
    conn: &mut SqliteConnection,
) -> Result<Vec<DistributorSummary>, sqlx::Error> {
    sqlx::query_as::<_, DistributorSummary>(
        r#"
        SELECT
            u.*,
            (SELECT COUNT(*) FROM members m
              WHERE m.distributor_id = u.id AND m.status = 'active') AS member_count,
            (SELECT COALESCE(SUM(ar.received_amount), 0.0) FROM accounting_records ar
              WHERE ar.distributor_id = u.id) AS total_received,
            (SELECT COALESCE(SUM(ar.commission), 0.0) FROM accounting_records ar
              WHERE ar.distributor_id = u.id) AS total_commission,
            (SELECT COALESCE(SUM(ar.net_revenue), 0.0) FROM accounting_records ar
              WHERE ar.distributor_id = u.id) AS total_net_revenue
        FROM users u
        WHERE u.role IN ('distributor_a', 'distributor_b')
        ORDER BY u.created_at DESC, u.id DESC
        "#
    )
    .fetch_all(&mut *conn)
    .await
}

/// 특정 대리점의 활성 회원 수 + 장부 합계
pub async fn distributor_totals(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<(i64, LedgerTotals), sqlx::Error> {
    let member_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM members WHERE distributor_id = ? AND status = 'active'",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    let totals = super::records::totals(&mut *conn, Some(id), None, None, None).await?;
    Ok((member_count, totals))
}

pub struct DistributorUpdate<'a> {
    pub name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub commission_rate: Option<f64>,
    pub status: Option<Status>,
}

/// 관리자에 의한 대리점 수정 (None 필드는 유지)
pub async fn update_distributor(
    conn: &mut SqliteConnection,
    id: i64,
    update: &DistributorUpdate<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            name = COALESCE(?1, name),
            phone = COALESCE(?2, phone),
            email = COALESCE(?3, email),
            commission_rate = COALESCE(?4, commission_rate),
            status = COALESCE(?5, status),
            updated_at = ?6
        WHERE id = ?7 AND role IN ('distributor_a', 'distributor_b')
        "#
    )
    .bind(update.name)
    .bind(update.phone)
    .bind(update.email)
    .bind(update.commission_rate)
    .bind(update.status)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn update_profile(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    password_hash: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            name = ?1,
            password_hash = COALESCE(?2, password_hash),
            updated_at = ?3
        WHERE id = ?4
        "#
    )
    .bind(name)
    .bind(password_hash)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// 대리점 금액 설정 저장 (lock 값은 정책에 따라 호출자가 결정)
pub async fn update_settings(
    conn: &mut SqliteConnection,
    id: i64,
    commission_amount: f64,
    deposit_amount: f64,
    insurance_amount: f64,
    lock: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            commission_amount = ?,
            deposit_amount = ?,
            insurance_amount = ?,
            settings_locked = ?,
            updated_at = ?
        WHERE id = ?
        "#
    )
    .bind(commission_amount)
    .bind(deposit_amount)
    .bind(insurance_amount)
    .bind(lock)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn unlock_settings(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET settings_locked = 0, updated_at = ? WHERE id = ?")
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
