//! Member pool (staging) queries

use chrono::Utc;
use sqlx::SqliteConnection;

use super::members::MemberFields;
use super::models::PoolMember;

pub async fn insert(
    conn: &mut SqliteConnection,
    distributor_id: i64,
    fields: &MemberFields,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO member_pool (
            name, age, gender, phone, address,
            emergency_contact_name, emergency_contact_phone,
            id_card_1, id_card_2, city, distributor_id, is_active, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
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
    .bind(&fields.id_card_2)
    .bind(&fields.city)
    .bind(distributor_id)
    .bind(Utc::now().naive_utc())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<PoolMember>, sqlx::Error> {
    sqlx::query_as::<_, PoolMember>("SELECT * FROM member_pool WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn list(
    conn: &mut SqliteConnection,
    distributor_id: Option<i64>,
    is_active: Option<bool>,
) -> Result<Vec<PoolMember>, sqlx::Error> {
    sqlx::query_as::<_, PoolMember>(
        r#"
        SELECT * FROM member_pool
        WHERE (?1 IS NULL OR distributor_id = ?1)
          AND (?2 IS NULL OR is_active = ?2)
        ORDER BY created_at DESC, id DESC
        "#
    )
    .bind(distributor_id)
    .bind(is_active)
    .fetch_all(&mut *conn)
    .await
}

pub async fn mark_active(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE member_pool SET is_active = 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// 풀 인원 → 회원 항목 변환
pub fn to_member_fields(pool: &PoolMember) -> MemberFields {
    MemberFields {
        name: Some(pool.name.clone()),
        age: pool.age,
        gender: pool.gender.clone(),
        phone: pool.phone.clone(),
        address: pool.address.clone(),
        emergency_contact_name: pool.emergency_contact_name.clone(),
        emergency_contact_phone: pool.emergency_contact_phone.clone(),
        id_card_1: pool.id_card_1.clone(),
        id_card_2: pool.id_card_2.clone(),
        city: pool.city.clone(),
        ..MemberFields::default()
    }
}
