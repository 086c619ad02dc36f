//! Member Service
//!
//! 회원 CRUD. 모든 조회/수정은 소유 대리점 또는 admin 만 가능

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::SqliteConnection;

use super::access::{self, Capability};
use crate::db::{
    members, records, users, AccountingRecordView, Database, LedgerTotals, MemberView,
    NewOperationLog, OperationLogRepository,
};
use crate::db::members::{MemberFields, MemberFilter};
use crate::db::records::RecordFilter;
use crate::error::ApiError;
use crate::types::{today, Caller, Status};

/// 회원 생성/수정 요청 본문
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
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
    /// admin 전용 (대리점은 본인 id로 고정)
    pub distributor_id: Option<i64>,
}

impl MemberInput {
    pub fn into_fields(self) -> (Option<i64>, MemberFields) {
        let fields = MemberFields {
            name: self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            age: self.age,
            gender: self.gender,
            phone: self.phone,
            address: self.address,
            emergency_contact_name: self.emergency_contact_name,
            emergency_contact_phone: self.emergency_contact_phone,
            id_card_1: self.id_card_1,
            id_card_1_register_date: self.id_card_1_register_date,
            id_card_1_expire_date: self.id_card_1_expire_date,
            id_card_2: self.id_card_2,
            id_card_2_register_date: self.id_card_2_register_date,
            id_card_2_expire_date: self.id_card_2_expire_date,
            city: self.city,
            documents: self.documents,
            additional_info: self.additional_info,
            status: self.status,
        };
        (self.distributor_id, fields)
    }
}

/// 목록 쿼리
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberQuery {
    pub status: Option<Status>,
    pub city: Option<String>,
    pub distributor_id: Option<i64>,
}

/// 회원 상세 (장부 기록 + 합계 포함)
#[derive(Debug, Serialize)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub member: MemberView,
    pub records: Vec<AccountingRecordView>,
    pub stats: LedgerTotals,
}

/// 생성 대상 대리점 결정
///
/// - admin: `distributorId` 필수, 실제 대리점이어야 함
/// - 대리점: 생략 시 본인, 다른 id 지정 시 Forbidden
pub(crate) async fn resolve_owner(
    conn: &mut SqliteConnection,
    caller: &Caller,
    requested: Option<i64>,
) -> Result<i64, ApiError> {
    let owner = if caller.is_admin() {
        requested.ok_or_else(|| ApiError::BadRequest("distributorId is required".to_string()))?
    } else {
        requested.unwrap_or(caller.id)
    };
    access::require(caller, Capability::CreateMember, Some(owner))?;

    if users::find_distributor(&mut *conn, owner).await?.is_none() {
        return Err(ApiError::NotFound("Distributor".to_string()));
    }
    Ok(owner)
}

pub struct MemberService {
    db: Database,
    audit: Arc<dyn OperationLogRepository>,
}

impl MemberService {
    pub fn new(db: Database, audit: Arc<dyn OperationLogRepository>) -> Self {
        Self { db, audit }
    }

    /// 대리점은 `distributorId` 필터를 무시하고 본인 회원만 조회
    pub async fn list(&self, caller: &Caller, query: MemberQuery) -> Result<Vec<MemberView>, ApiError> {
        let filter = MemberFilter {
            distributor_id: if caller.is_admin() { query.distributor_id } else { Some(caller.id) },
            status: query.status,
            city: query.city,
        };

        let mut conn = self.db.acquire().await?;
        Ok(members::list(&mut conn, &filter).await?)
    }

    pub async fn get(&self, caller: &Caller, id: i64) -> Result<MemberDetail, ApiError> {
        let mut conn = self.db.acquire().await?;
        let member = members::find_view(&mut conn, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Member".to_string()))?;
        access::require(caller, Capability::ReadMember, Some(member.member.distributor_id))?;

        let filter = RecordFilter { member_id: Some(id), ..Default::default() };
        let records = records::list(&mut conn, &filter).await?;
        let stats = records::totals(&mut conn, None, Some(id), None, None).await?;

        Ok(MemberDetail { member, records, stats })
    }

    pub async fn create(&self, caller: &Caller, input: MemberInput) -> Result<MemberView, ApiError> {
        let (requested, fields) = input.into_fields();
        let name = fields
            .name
            .clone()
            .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;

        let mut conn = self.db.acquire().await?;
        let distributor_id = resolve_owner(&mut conn, caller, requested).await?;
        let id = members::insert(&mut conn, distributor_id, &fields).await?;
        let member = members::find_view(&mut conn, id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        tracing::info!(member_id = id, distributor_id, "Member created");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "create_member")
                    .target("member", id)
                    .details(format!("Created member {name}")),
            )
            .await;

        Ok(member)
    }

    /// 부분 수정 (생략된 필드는 유지, 소속 대리점은 변경 불가)
    pub async fn update(&self, caller: &Caller, id: i64, input: MemberInput) -> Result<MemberView, ApiError> {
        let (_, fields) = input.into_fields();

        let mut conn = self.db.acquire().await?;
        let existing = members::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Member".to_string()))?;
        access::require(caller, Capability::UpdateMember, Some(existing.distributor_id))?;

        members::update(&mut conn, id, &fields).await?;
        let member = members::find_view(&mut conn, id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        self.audit
            .record(
                NewOperationLog::new(caller.id, "update_member")
                    .target("member", id)
                    .details(format!("Updated member {}", member.member.name)),
            )
            .await;

        Ok(member)
    }

    /// 회원 삭제 (청구서, 계약, 장부 기록까지 한 트랜잭션에서 삭제)
    pub async fn delete(&self, caller: &Caller, id: i64) -> Result<(), ApiError> {
        let mut tx = self.db.begin().await?;
        let existing = members::find_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Member".to_string()))?;
        access::require(caller, Capability::DeleteMember, Some(existing.distributor_id))?;

        members::delete_cascade(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(member_id = id, "Member deleted with dependent rows");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "delete_member")
                    .target("member", id)
                    .details(format!("Deleted member {}", existing.name)),
            )
            .await;

        Ok(())
    }

    /// 증명서가 `days`일 안에 만료되거나 이미 만료된 활성 회원
    pub async fn expiring_documents(&self, caller: &Caller, days: i64) -> Result<Vec<MemberView>, ApiError> {
        if !(1..=3650).contains(&days) {
            return Err(ApiError::ValidationError("days must be between 1 and 3650".to_string()));
        }
        let until = today() + Duration::days(days);

        let mut conn = self.db.acquire().await?;
        Ok(members::expiring_documents(&mut conn, caller.scope(), until).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::records::RecordValues;
    use crate::services::testing;
    use crate::types::{CommissionType, Role};

    fn named(name: &str) -> MemberInput {
        MemberInput { name: Some(name.to_string()), ..Default::default() }
    }

    #[tokio::test]
    async fn test_distributor_sees_only_own_members() {
        let (db, audit) = testing::setup().await;
        let admin = testing::admin(&db).await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        testing::member(&db, a.id, "of-a").await;
        testing::member(&db, b.id, "of-b-1").await;
        testing::member(&db, b.id, "of-b-2").await;

        let service = MemberService::new(db, audit);

        // distributorId 필터로 남의 회원을 요청해도 본인 것만
        let query = MemberQuery { distributor_id: Some(a.id), ..Default::default() };
        let visible = service.list(&b, query).await.unwrap();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|m| m.member.distributor_id == b.id));

        let all = service.list(&admin, MemberQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_create_member_owner_resolution() {
        let (db, audit) = testing::setup().await;
        let admin = testing::admin(&db).await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        let service = MemberService::new(db, audit.clone());

        let own = service.create(&a, named("Self Owned")).await.unwrap();
        assert_eq!(own.member.distributor_id, a.id);

        let foreign = MemberInput { distributor_id: Some(b.id), ..named("Foreign") };
        assert!(matches!(service.create(&a, foreign).await, Err(ApiError::Forbidden(_))));

        assert!(matches!(
            service.create(&admin, named("No Owner")).await,
            Err(ApiError::BadRequest(_))
        ));
        let missing = MemberInput { distributor_id: Some(admin.id), ..named("Admin Owned") };
        assert!(matches!(service.create(&admin, missing).await, Err(ApiError::NotFound(_))));

        let assigned = MemberInput { distributor_id: Some(b.id), ..named("Assigned") };
        let member = service.create(&admin, assigned).await.unwrap();
        assert_eq!(member.member.distributor_id, b.id);

        assert!(matches!(service.create(&a, named("  ")).await, Err(ApiError::BadRequest(_))));
        assert_eq!(audit.actions(), vec!["create_member", "create_member"]);
    }

    #[tokio::test]
    async fn test_update_keeps_omitted_fields() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        let id = testing::member(&db, a.id, "Before").await;
        let service = MemberService::new(db, audit);

        let patch = MemberInput { phone: Some("13800000000".to_string()), ..Default::default() };
        let updated = service.update(&a, id, patch).await.unwrap();
        assert_eq!(updated.member.name, "Before");
        assert_eq!(updated.member.phone.as_deref(), Some("13800000000"));
        assert_eq!(updated.member.city.as_deref(), Some("Shenzhen"));

        assert!(matches!(
            service.update(&b, id, named("Hijack")).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_dependent_rows() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let id = testing::member(&db, a.id, "Gone").await;
        {
            let mut conn = db.acquire().await.unwrap();
            crate::db::labor::insert(&mut conn, id, None, None, 1000.0).await.unwrap();
            records::insert(
                &mut conn,
                id,
                a.id,
                &RecordValues {
                    received_amount: 100.0,
                    deposit: 0.0,
                    insurance: 0.0,
                    commission: 6.0,
                    commission_type: CommissionType::Rate,
                    net_revenue: 94.0,
                    record_date: today(),
                    city: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        }

        let service = MemberService::new(db.clone(), audit);
        service.delete(&a, id).await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        assert!(members::find_by_id(&mut conn, id).await.unwrap().is_none());
        let filter = RecordFilter { member_id: Some(id), ..Default::default() };
        assert!(records::list(&mut conn, &filter).await.unwrap().is_empty());
        assert!(crate::db::labor::find_active_for_member(&mut conn, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_member_includes_ledger_totals() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let b = testing::user(&db, "b", Role::DistributorB, 8.0).await;
        let id = testing::member(&db, a.id, "Detail").await;
        let service = MemberService::new(db, audit);

        let detail = service.get(&a, id).await.unwrap();
        assert_eq!(detail.member.distributor_name.as_deref(), Some("a"));
        assert!(detail.records.is_empty());
        assert_eq!(detail.stats, LedgerTotals::default());

        assert!(matches!(service.get(&b, id).await, Err(ApiError::Forbidden(_))));
        assert!(matches!(service.get(&a, 777).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_expiring_documents_window() {
        let (db, audit) = testing::setup().await;
        let a = testing::user(&db, "a", Role::DistributorA, 6.0).await;
        let service = MemberService::new(db, audit);

        let soon = MemberInput { id_card_1_expire_date: Some(today() + Duration::days(10)), ..named("Soon") };
        let expired = MemberInput { id_card_2_expire_date: Some(today() - Duration::days(3)), ..named("Expired") };
        let later = MemberInput { id_card_1_expire_date: Some(today() + Duration::days(200)), ..named("Later") };
        for input in [soon, expired, later] {
            service.create(&a, input).await.unwrap();
        }

        let names: Vec<String> = service
            .expiring_documents(&a, 30)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.member.name)
            .collect();
        assert_eq!(names, vec!["Expired", "Soon"]);

        assert!(matches!(service.expiring_documents(&a, 0).await, Err(ApiError::ValidationError(_))));
    }
}
