//! Account Service
//!
//! # Interview Q&A
//!
//! Q: 초대 코드가 정확히 한 번만 사용되도록 어떻게 보장하는가?
//! A: 가입과 코드 소모를 한 트랜잭션으로 묶고, 소모 UPDATE에 조건을 둠
//!
//!    ```sql
//!    UPDATE invite_codes SET status = 'used', ...
//!    WHERE id = ? AND status = 'unused'
//!    ```
//!
//!    - 영향받은 행이 0이면 다른 요청이 먼저 사용한 것 → 롤백, 사용자 행도 남지 않음
//!
//! Q: 대리점 금액 설정 잠금은?
//! A: `SETTINGS_POLICY` 로 선택
//!    - editable: 잠금 플래그를 절대 세우지 않음
//!    - lockable: 첫 저장 시 잠금, 이후 admin 이 해제할 때까지 Forbidden

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::access::{self, Capability};
use crate::auth::create_token;
use crate::auth::password::{hash_password, verify_password};
use crate::config::{Config, SettingsPolicy};
use crate::db::{
    invites, members, users, Database, DistributorSummary, InviteCodeView, LedgerTotals,
    MemberView, NewOperationLog, OperationLogRepository, OperationLogView, User,
};
use crate::db::members::MemberFilter;
use crate::error::ApiError;
use crate::types::{Caller, Role, Status};

/// 한 번에 발급 가능한 초대 코드 수
const MAX_CODES_PER_REQUEST: u32 = 50;

/// 조회 가능한 최근 감사 로그 수
const LOG_LIMIT: u32 = 100;

const MIN_PASSWORD_LEN: usize = 6;

/// 초대 코드 / 사용자 공유 코드 생성 (UUID v4 앞 8자리, 대문자)
pub fn generate_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

// ============ Request/Response Types ============

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub invite_code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    pub commission_amount: Option<f64>,
    pub deposit_amount: Option<f64>,
    pub insurance_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributorPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub commission_rate: Option<f64>,
    pub status: Option<Status>,
}

/// 대리점 상세 (관리자 화면)
#[derive(Debug, Serialize)]
pub struct DistributorDetail {
    pub distributor: User,
    pub members: Vec<MemberView>,
    pub member_count: i64,
    pub stats: LedgerTotals,
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::BadRequest(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        tracing::error!("Password hashing failed: {e}");
        ApiError::InternalError
    })
}

pub struct AccountService {
    db: Database,
    audit: Arc<dyn OperationLogRepository>,
    config: Arc<Config>,
}

impl AccountService {
    pub fn new(db: Database, audit: Arc<dyn OperationLogRepository>, config: Arc<Config>) -> Self {
        Self { db, audit, config }
    }

    // ============ Registration & Login ============

    /// 초대 코드로 가입
    ///
    /// 역할과 수수료 비율은 코드의 역할로 결정
    pub async fn register(&self, input: RegisterInput) -> Result<User, ApiError> {
        require_text("username", &input.username)?;
        require_text("password", &input.password)?;
        require_text("name", &input.name)?;
        require_text("inviteCode", &input.invite_code)?;
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::ValidationError(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash(&input.password)?;
        let username = input.username.trim();
        let code_text = input.invite_code.trim().to_uppercase();

        let mut tx = self.db.begin().await?;
        if users::find_by_username(&mut tx, username).await?.is_some() {
            return Err(ApiError::ValidationError("Username already exists".to_string()));
        }
        let code = invites::find_unused(&mut tx, &code_text)
            .await?
            .ok_or_else(|| ApiError::ValidationError("Invite code is invalid or already used".to_string()))?;

        let user_id = users::insert(
            &mut tx,
            &users::NewUser {
                username,
                password_hash: &password_hash,
                name: input.name.trim(),
                role: code.role,
                phone: input.phone.as_deref(),
                email: input.email.as_deref(),
                commission_rate: self.config.commission_rate_for(code.role),
                invite_code: &generate_code(),
                invited_by: Some(code.created_by),
            },
        )
        .await?;

        if invites::mark_used(&mut tx, code.id, user_id).await? == 0 {
            return Err(ApiError::ValidationError("Invite code is invalid or already used".to_string()));
        }
        let user = users::find_by_id(&mut tx, user_id)
            .await?
            .ok_or(ApiError::InternalError)?;
        tx.commit().await?;

        tracing::info!(user_id, role = %user.role, invited_by = code.created_by, "User registered");
        self.audit
            .record(
                NewOperationLog::new(user_id, "register")
                    .target("user", user_id)
                    .details(format!("Registered with invite code {}", code.code)),
            )
            .await;

        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        require_text("username", username)?;
        require_text("password", password)?;

        let mut conn = self.db.acquire().await?;
        let user = users::find_by_username(&mut conn, username.trim())
            .await?
            .ok_or(ApiError::Unauthorized)?;
        drop(conn);

        if !verify_password(password, &user.password_hash) {
            tracing::debug!(username, "Login rejected: wrong password");
            return Err(ApiError::Unauthorized);
        }
        if user.status != Status::Active {
            return Err(ApiError::Forbidden("Account is disabled".to_string()));
        }

        let token = create_token(
            user.id,
            &user.username,
            user.role,
            &user.name,
            &self.config.jwt_secret,
            self.config.jwt_expiry_hours,
        )
        .map_err(|e| {
            tracing::error!("Token signing failed: {e}");
            ApiError::InternalError
        })?;

        self.audit
            .record(NewOperationLog::new(user.id, "login").target("user", user.id))
            .await;

        Ok(LoginOutcome { token, user })
    }

    pub async fn me(&self, caller: &Caller) -> Result<User, ApiError> {
        let mut conn = self.db.acquire().await?;
        users::find_by_id(&mut conn, caller.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User".to_string()))
    }

    /// 표시 이름 변경 (비밀번호는 선택)
    pub async fn update_profile(
        &self,
        caller: &Caller,
        name: &str,
        password: Option<&str>,
    ) -> Result<User, ApiError> {
        require_text("name", name)?;
        let password_hash = match password.filter(|p| !p.is_empty()) {
            Some(p) if p.len() < MIN_PASSWORD_LEN => {
                return Err(ApiError::ValidationError(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            Some(p) => Some(hash(p)?),
            None => None,
        };

        let mut conn = self.db.acquire().await?;
        if users::update_profile(&mut conn, caller.id, name.trim(), password_hash.as_deref()).await? == 0 {
            return Err(ApiError::NotFound("User".to_string()));
        }
        let user = users::find_by_id(&mut conn, caller.id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        self.audit
            .record(
                NewOperationLog::new(caller.id, "update_profile")
                    .target("user", caller.id)
                    .details(if password_hash.is_some() { "Name and password changed" } else { "Name changed" }),
            )
            .await;

        Ok(user)
    }

    // ============ Invite Codes ============

    pub async fn issue_invite_codes(&self, caller: &Caller, role: Role, count: u32) -> Result<Vec<String>, ApiError> {
        if !(1..=MAX_CODES_PER_REQUEST).contains(&count) {
            return Err(ApiError::ValidationError(format!(
                "count must be between 1 and {MAX_CODES_PER_REQUEST}"
            )));
        }
        access::require(caller, Capability::IssueInviteCode(role), None)?;

        let mut tx = self.db.begin().await?;
        let mut codes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let code = generate_code();
            invites::insert(&mut tx, &code, caller.id, role).await?;
            codes.push(code);
        }
        tx.commit().await?;

        tracing::info!(created_by = caller.id, %role, count, "Invite codes issued");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "generate_invite_codes")
                    .details(format!("Issued {count} {role} invite codes")),
            )
            .await;

        Ok(codes)
    }

    /// admin: 전체, A등급: 본인 발급분
    pub async fn list_invite_codes(&self, caller: &Caller) -> Result<Vec<InviteCodeView>, ApiError> {
        access::require(caller, Capability::ListInviteCodes, None)?;
        let mut conn = self.db.acquire().await?;
        Ok(invites::list(&mut conn, caller.scope()).await?)
    }

    // ============ Distributor Settings ============

    pub async fn update_settings(&self, caller: &Caller, input: SettingsInput) -> Result<User, ApiError> {
        let (Some(commission), Some(deposit), Some(insurance)) =
            (input.commission_amount, input.deposit_amount, input.insurance_amount)
        else {
            return Err(ApiError::BadRequest(
                "commissionAmount, depositAmount and insuranceAmount are required".to_string(),
            ));
        };
        for (field, value) in [
            ("commissionAmount", commission),
            ("depositAmount", deposit),
            ("insuranceAmount", insurance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ApiError::ValidationError(format!("{field} must be a non-negative number")));
            }
        }

        let mut conn = self.db.acquire().await?;
        let user = users::find_by_id(&mut conn, caller.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

        let lock = match self.config.settings_policy {
            SettingsPolicy::Editable => false,
            SettingsPolicy::Lockable if user.settings_locked => {
                return Err(ApiError::Forbidden(
                    "Settings are locked; ask an administrator to unlock them".to_string(),
                ));
            }
            SettingsPolicy::Lockable => true,
        };

        users::update_settings(&mut conn, caller.id, commission, deposit, insurance, lock).await?;
        let updated = users::find_by_id(&mut conn, caller.id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        self.audit
            .record(
                NewOperationLog::new(caller.id, "update_settings")
                    .target("user", caller.id)
                    .details(format!(
                        "commission {commission}, deposit {deposit}, insurance {insurance}"
                    )),
            )
            .await;

        Ok(updated)
    }

    pub async fn unlock_settings(&self, caller: &Caller, distributor_id: i64) -> Result<(), ApiError> {
        access::require(caller, Capability::ManageDistributors, None)?;

        let mut conn = self.db.acquire().await?;
        if users::find_distributor(&mut conn, distributor_id).await?.is_none() {
            return Err(ApiError::NotFound("Distributor".to_string()));
        }
        users::unlock_settings(&mut conn, distributor_id).await?;
        drop(conn);

        self.audit
            .record(NewOperationLog::new(caller.id, "unlock_settings").target("user", distributor_id))
            .await;

        Ok(())
    }

    // ============ Distributor Administration ============

    pub async fn list_distributors(&self, caller: &Caller) -> Result<Vec<DistributorSummary>, ApiError> {
        access::require(caller, Capability::ManageDistributors, None)?;
        let mut conn = self.db.acquire().await?;
        Ok(users::list_distributors(&mut conn).await?)
    }

    pub async fn distributor_detail(&self, caller: &Caller, id: i64) -> Result<DistributorDetail, ApiError> {
        access::require(caller, Capability::ManageDistributors, None)?;

        let mut conn = self.db.acquire().await?;
        let distributor = users::find_distributor(&mut conn, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Distributor".to_string()))?;
        let filter = MemberFilter { distributor_id: Some(id), ..Default::default() };
        let members = members::list(&mut conn, &filter).await?;
        let (member_count, stats) = users::distributor_totals(&mut conn, id).await?;

        Ok(DistributorDetail { distributor, members, member_count, stats })
    }

    pub async fn update_distributor(
        &self,
        caller: &Caller,
        id: i64,
        patch: DistributorPatch,
    ) -> Result<User, ApiError> {
        access::require(caller, Capability::ManageDistributors, None)?;
        if let Some(rate) = patch.commission_rate {
            if !(0.0..=100.0).contains(&rate) {
                return Err(ApiError::ValidationError(
                    "commissionRate must be between 0 and 100".to_string(),
                ));
            }
        }

        let update = users::DistributorUpdate {
            name: patch.name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            phone: patch.phone.as_deref(),
            email: patch.email.as_deref(),
            commission_rate: patch.commission_rate,
            status: patch.status,
        };

        let mut conn = self.db.acquire().await?;
        if users::update_distributor(&mut conn, id, &update).await? == 0 {
            return Err(ApiError::NotFound("Distributor".to_string()));
        }
        let user = users::find_by_id(&mut conn, id)
            .await?
            .ok_or(ApiError::InternalError)?;
        drop(conn);

        tracing::info!(distributor_id = id, "Distributor updated");
        self.audit
            .record(
                NewOperationLog::new(caller.id, "update_distributor")
                    .target("user", id)
                    .details(format!("Updated distributor {}", user.name)),
            )
            .await;

        Ok(user)
    }

    /// 최근 감사 로그 (admin: 전체, 대리점: 본인)
    pub async fn operation_logs(
        &self,
        caller: &Caller,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<OperationLogView>, ApiError> {
        Ok(self.audit.recent(caller.scope(), start, end, LOG_LIMIT).await?)
    }
}
