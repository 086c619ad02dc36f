//! Member queries

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::SqliteConnection;

use super::models::{Member, MemberView};
use crate::types::Status;

/// 회원 기본 항목 (생성/수정 공용)
#[derive(Debug, Clone, Default)]
pub struct MemberFields {
    pub name: Option<String>,
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
    pub documents: Option<Map<String, Value>>,
    pub additional_info: Option<Map<String, Value>>,
    pub status: Option<Status>,
}

/// 목록 필터
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub distributor_id: Option<i64>,
    pub status: Option<Status>,
    pub city: Option<String>,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    distributor_id: i64,
    fields: &MemberFields,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO members (
            name, age, gender, phone, address,
            emergency_contact_name, emergency_contact_phone,
            id_card_1, id_card_1_register_date, id_card_1_expire_date,
            id_card_2, id_card_2_register_date, id_card_2_expire_date,
            city, distributor_id, documents, additional_info, status,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#
    )
    .bind(fields.name.as_deref().unwrap_or_default())
    .bind(fields.age)
    .bind(&fields.gender)
    .bind(&fields.phone)
    .bind(&fields.address)
    .bind(&fields.emergency_contact_name)
    .bind(&fields.emergency_contact_phone)
    .bind(&fields.id_card_1)
    .bind(fields.id_card_1_register_date)
    .bind(fields.id_card_1_expire_date)
    .bind(&fields.id_card_2)
    .bind(fields.id_card_2_register_date)
    .bind(fields.id_card_2_expire_date)
    .bind(&fields.city)
    .bind(distributor_id)
    .bind(Json(fields.documents.clone().unwrap_or_default()))
    .bind(Json(fields.additional_info.clone().unwrap_or_default()))
    .bind(fields.status.unwrap_or(Status::Active))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_view(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<MemberView>, sqlx::Error> {
    sqlx::query_as::<_, MemberView>(
        r#"
        SELECT m.*, u.name AS distributor_name, u.role AS distributor_role
        FROM members m
        LEFT JOIN users u ON m.distributor_id = u.id
        WHERE m.id = ?
        "#
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &MemberFilter,
) -> Result<Vec<MemberView>, sqlx::Error> {
    sqlx::query_as::<_, MemberView>(
        r#"
        SELECT m.*, u.name AS distributor_name, u.role AS distributor_role
        FROM members m
        LEFT JOIN users u ON m.distributor_id = u.id
        WHERE (?1 IS NULL OR m.distributor_id = ?1)
          AND (?2 IS NULL OR m.status = ?2)
          AND (?3 IS NULL OR m.city = ?3)
        ORDER BY m.created_at DESC, m.id DESC
        "#
    )
    .bind(filter.distributor_id)
    .bind(filter.status)
    .bind(&filter.city)
    .fetch_all(&mut *conn)
    .await
}

/// 부분 수정 (None 필드는 유지)
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    fields: &MemberFields,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE members SET
            name = COALESCE(?1, name),
            age = COALESCE(?2, age),
            gender = COALESCE(?3, gender),
            phone = COALESCE(?4, phone),
            address = COALESCE(?5, address),
            emergency_contact_name = COALESCE(?6, emergency_contact_name),
            emergency_contact_phone = COALESCE(?7, emergency_contact_phone),
            id_card_1 = COALESCE(?8, id_card_1),
            id_card_1_register_date = COALESCE(?9, id_card_1_register_date),
            id_card_1_expire_date = COALESCE(?10, id_card_1_expire_date),
            id_card_2 = COALESCE(?11, id_card_2),
            id_card_2_register_date = COALESCE(?12, id_card_2_register_date),
            id_card_2_expire_date = COALESCE(?13, id_card_2_expire_date),
            city = COALESCE(?14, city),
            documents = COALESCE(?15, documents),
            additional_info = COALESCE(?16, additional_info),
            status = COALESCE(?17, status),
            updated_at = ?18
        WHERE id = ?19
        "#
    )
    .bind(&fields.name)
    .bind(fields.age)
    .bind(&fields.gender)
    .bind(&fields.phone)
    .bind(&fields.address)
    .bind(&fields.emergency_contact_name)
    .bind(&fields.emergency_contact_phone)
    .bind(&fields.id_card_1)
    .bind(fields.id_card_1_register_date)
    .bind(fields.id_card_1_expire_date)
    .bind(&fields.id_card_2)
    .bind(fields.id_card_2_register_date)
    .bind(fields.id_card_2_expire_date)
    .bind(&fields.city)
    .bind(fields.documents.clone().map(Json))
    .bind(fields.additional_info.clone().map(Json))
    .bind(fields.status)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: Status,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE members SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// 회원과 종속 데이터 일괄 삭제 (청구서 → 계약 → 장부 → 회원)
///
/// 트랜잭션 안에서 호출해야 함
pub async fn delete_cascade(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    sqlx::query("DELETE FROM monthly_bills WHERE member_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM labor_tasks WHERE member_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM accounting_records WHERE member_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM members WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn count_active(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM members WHERE status = 'active' AND (?1 IS NULL OR distributor_id = ?1)",
    )
    .bind(distributor_id)
    .fetch_one(&mut *conn)
    .await
}

/// 증명서가 `until` 이전에 만료되는(이미 만료 포함) 활성 회원
pub async fn expiring_documents(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
    until: NaiveDate,
) -> Result<Vec<MemberView>, sqlx::Error> {
    sqlx::query_as::<_, MemberView>(
        r#"
        SELECT m.*, u.name AS distributor_name, u.role AS distributor_role
        FROM members m
        LEFT JOIN users u ON m.distributor_id = u.id
        WHERE m.status = 'active'
          AND (?1 IS NULL OR m.distributor_id = ?1)
          AND (
               (m.id_card_1_expire_date IS NOT NULL AND m.id_card_1_expire_date <= ?2)
            OR (m.id_card_2_expire_date IS NOT NULL AND m.id_card_2_expire_date <= ?2)
          )
        ORDER BY MIN(
            COALESCE(m.id_card_1_expire_date, '9999-12-31'),
            COALESCE(m.id_card_2_expire_date, '9999-12-31')
        ) ASC
        "#
    )
    .bind(distributor_id)
    .bind(until)
    .fetch_all(&mut *conn)
    .await
}
