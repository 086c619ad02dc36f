//! Access Control
//!
//! # Interview Q&A
//!
//! Q: 권한 검사를 핸들러마다 흩어두지 않고 한 곳에 모은 이유는?
//! A: 역할 문자열 비교가 핸들러마다 반복되면 규칙이 서로 어긋나기 쉬움
//!
//!    - (호출자, 능력, 리소스 소유자) → 허용/거부 를 순수 함수로 계산
//!    - HTTP 없이 단위 테스트 가능
//!    - 규칙 표가 코드 한 곳에 그대로 드러남
//!
//! | Capability            | admin | 소유 대리점 | 비소유 대리점 |
//! |-----------------------|-------|-------------|---------------|
//! | Read/Update/Delete 회원 | ✓     | ✓           | ✗             |
//! | CreateMember          | ✓     | 본인 소유만 | ✗             |
//! | Read/Write 장부        | ✓     | ✓           | ✗             |
//! | DeleteRecord          | ✓     | ✗           | ✗             |
//! | ConfirmBill           | ✓     | ✓           | ✗             |
//! | IssueInviteCode(B)    | ✓     | A등급만       | ✗             |

use crate::error::ApiError;
use crate::types::{Caller, Role};

/// 보호 대상 작업
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadMember,
    CreateMember,
    UpdateMember,
    DeleteMember,
    ReadRecord,
    WriteRecord,
    DeleteRecord,
    ConfirmBill,
    /// 계약 생성/종료, 금액·계약 일괄 설정
    ManageTask,
    ReadReminder,
    /// 지정 역할의 초대 코드 발급
    IssueInviteCode(Role),
    ListInviteCodes,
    ManageDistributors,
    GenerateReminders,
    ViewAdminSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

/// 권한 판정
///
/// `owner_id`는 리소스를 소유한 대리점 id (소유 개념이 없는 작업은 None)
pub fn check(caller: &Caller, capability: Capability, owner_id: Option<i64>) -> Decision {
    use Capability::*;

    match capability {
        IssueInviteCode(role) => match (caller.role, role) {
            (_, Role::Admin) => Decision::Deny("Admin invite codes cannot be issued"),
            (Role::Admin, _) => Decision::Allow,
            (Role::DistributorA, Role::DistributorB) => Decision::Allow,
            (Role::DistributorA, _) => {
                Decision::Deny("A-level distributors may only issue B-level invite codes")
            }
            (Role::DistributorB, _) => Decision::Deny("B-level distributors cannot issue invite codes"),
        },

        ListInviteCodes => match caller.role {
            Role::Admin | Role::DistributorA => Decision::Allow,
            Role::DistributorB => Decision::Deny("B-level distributors cannot view invite codes"),
        },

        DeleteRecord | ManageDistributors | GenerateReminders | ViewAdminSummary => {
            if caller.is_admin() {
                Decision::Allow
            } else {
                Decision::Deny("Administrator permission required")
            }
        }

        ReadMember | CreateMember | UpdateMember | DeleteMember | ReadRecord | WriteRecord
        | ConfirmBill | ManageTask | ReadReminder => {
            if caller.is_admin() || owner_id == Some(caller.id) {
                Decision::Allow
            } else {
                Decision::Deny("Resource belongs to another distributor")
            }
        }
    }
}

/// `check` 결과를 ApiError::Forbidden 으로 변환
pub fn require(caller: &Caller, capability: Capability, owner_id: Option<i64>) -> Result<(), ApiError> {
    match check(caller, capability, owner_id) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::debug!(
                caller_id = caller.id,
                role = %caller.role,
                ?capability,
                ?owner_id,
                "Access denied: {reason}"
            );
            Err(ApiError::Forbidden(reason.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: i64, role: Role) -> Caller {
        Caller { id, role, username: format!("user{id}") }
    }

    #[test]
    fn test_admin_allowed_everywhere_owned() {
        let admin = caller(1, Role::Admin);
        for cap in [
            Capability::ReadMember,
            Capability::UpdateMember,
            Capability::DeleteMember,
            Capability::DeleteRecord,
            Capability::ConfirmBill,
            Capability::ManageDistributors,
        ] {
            assert_eq!(check(&admin, cap, Some(99)), Decision::Allow, "{cap:?}");
        }
    }

    #[test]
    fn test_owner_vs_non_owner() {
        let owner = caller(5, Role::DistributorB);
        let other = caller(6, Role::DistributorB);
        for cap in [
            Capability::ReadMember,
            Capability::UpdateMember,
            Capability::DeleteMember,
            Capability::WriteRecord,
            Capability::ConfirmBill,
            Capability::ManageTask,
        ] {
            assert_eq!(check(&owner, cap, Some(5)), Decision::Allow, "{cap:?}");
            assert!(matches!(check(&other, cap, Some(5)), Decision::Deny(_)), "{cap:?}");
        }
    }

    #[test]
    fn test_missing_owner_denies_distributor() {
        let dist = caller(5, Role::DistributorA);
        assert!(matches!(check(&dist, Capability::ReadMember, None), Decision::Deny(_)));
    }

    #[test]
    fn test_delete_record_admin_only() {
        let owner = caller(5, Role::DistributorA);
        assert!(matches!(check(&owner, Capability::DeleteRecord, Some(5)), Decision::Deny(_)));
        assert!(require(&owner, Capability::DeleteRecord, Some(5)).is_err());
    }

    #[test]
    fn test_invite_code_rules() {
        let admin = caller(1, Role::Admin);
        let a = caller(2, Role::DistributorA);
        let b = caller(3, Role::DistributorB);

        assert_eq!(check(&admin, Capability::IssueInviteCode(Role::DistributorA), None), Decision::Allow);
        assert_eq!(check(&admin, Capability::IssueInviteCode(Role::DistributorB), None), Decision::Allow);
        assert!(matches!(check(&admin, Capability::IssueInviteCode(Role::Admin), None), Decision::Deny(_)));

        assert_eq!(check(&a, Capability::IssueInviteCode(Role::DistributorB), None), Decision::Allow);
        assert!(matches!(check(&a, Capability::IssueInviteCode(Role::DistributorA), None), Decision::Deny(_)));

        assert!(matches!(check(&b, Capability::IssueInviteCode(Role::DistributorB), None), Decision::Deny(_)));
        assert!(matches!(check(&b, Capability::ListInviteCodes, None), Decision::Deny(_)));
    }

    #[test]
    fn test_require_maps_to_forbidden() {
        let b = caller(3, Role::DistributorB);
        match require(&b, Capability::ViewAdminSummary, None) {
            Err(ApiError::Forbidden(_)) => {}
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }
}
