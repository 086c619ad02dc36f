//! Invite code queries

use chrono::Utc;
use sqlx::SqliteConnection;

use super::models::{InviteCode, InviteCodeView};
use crate::types::Role;

pub async fn insert(
    conn: &mut SqliteConnection,
    code: &str,
    created_by: i64,
    role: Role,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO invite_codes (code, created_by, role, status, created_at) VALUES (?, ?, ?, 'unused', ?)",
    )
    .bind(code)
    .bind(created_by)
    .bind(role)
    .bind(Utc::now().naive_utc())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_unused(
    conn: &mut SqliteConnection,
    code: &str,
) -> Result<Option<InviteCode>, sqlx::Error> {
    sqlx::query_as::<_, InviteCode>(
        "SELECT * FROM invite_codes WHERE code = ? AND status = 'unused'",
    )
    .bind(code)
    .fetch_optional(&mut *conn)
    .await
}

/// unused → used 전이 (한 번만 성공)
///
/// 이미 사용된 코드면 0 반환
pub async fn mark_used(
    conn: &mut SqliteConnection,
    id: i64,
    used_by: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invite_codes SET status = 'used', used_by = ?, used_at = ?
        WHERE id = ? AND status = 'unused'
        "#
    )
    .bind(used_by)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// 초대 코드 목록 (created_by 지정 시 본인 생성분만)
pub async fn list(
    conn: &mut SqliteConnection,
    created_by: Option<i64>,
) -> Result<Vec<InviteCodeView>, sqlx::Error> {
    sqlx::query_as::<_, InviteCodeView>(
        r#"
        SELECT ic.*, creator.name AS creator_name, used.name AS used_by_name
        FROM invite_codes ic
        LEFT JOIN users creator ON ic.created_by = creator.id
        LEFT JOIN users used ON ic.used_by = used.id
        WHERE (?1 IS NULL OR ic.created_by = ?1)
        ORDER BY ic.created_at DESC, ic.id DESC
        "#
    )
    .bind(created_by)
    .fetch_all(&mut *conn)
    .await
}
