//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// API 응답 래퍼
///
/// 모든 응답은 `{success, message?, data?}` 형태
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

// ============ Roles & Statuses ============

/// 사용자 역할
///
/// - `Admin`: 전체 접근
/// - `DistributorA`: A등급 대리점 (B등급 초대 가능)
/// - `DistributorB`: B등급 대리점
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Admin,
    DistributorA,
    DistributorB,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::DistributorA => "distributor_a",
            Role::DistributorB => "distributor_b",
        }
    }

    pub fn is_distributor(&self) -> bool {
        matches!(self, Role::DistributorA | Role::DistributorB)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "distributor_a" => Ok(Role::DistributorA),
            "distributor_b" => Ok(Role::DistributorB),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// users / members 공통 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Status {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InviteStatus {
    Unused,
    Used,
}

/// 수수료 계산 방식
/// - `Rate`: 받은 금액 × 대리점 비율(%)
/// - `Amount`: 입력한 고정 금액
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CommissionType {
    #[default]
    Rate,
    Amount,
}

// ============ Caller Identity ============

/// 인증된 호출자 (JWT에서 추출)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
    pub username: String,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 목록 조회 범위: admin은 전체(None), 대리점은 본인 id
    pub fn scope(&self) -> Option<i64> {
        if self.is_admin() {
            None
        } else {
            Some(self.id)
        }
    }
}

// ============ Calendar ============

/// 청구 월 (`YYYY-MM`)
///
/// 문자열 비교와 달력 순서가 일치하도록 항상 0-padding 형식으로 출력
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillMonth {
    year: i32,
    month: u32,
}

impl BillMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (1000..=9999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::of(today())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// 계약 기간 [sign, expire) 에 걸친 청구 월 목록
    ///
    /// sign 일자에서 k개월씩 더한 날짜가 expire 보다 앞서는 동안 반복
    /// (2025-01-15 ~ 2027-01-15 → 2025-01 … 2026-12, 24개)
    pub fn span(sign: NaiveDate, expire: NaiveDate) -> Vec<BillMonth> {
        let mut months = Vec::new();
        let mut k = 0u32;
        while let Some(date) = sign.checked_add_months(Months::new(k)) {
            if date >= expire {
                break;
            }
            months.push(Self::of(date));
            k += 1;
        }
        months
    }
}

impl fmt::Display for BillMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid month '{}', expected YYYY-MM", s);
        let (y, m) = s.split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(invalid());
        }
        let year = y.parse::<i32>().map_err(|_| invalid())?;
        let month = m.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for BillMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 달력 기준 연 단위 덧셈 (365일 아님)
///
/// 윤년 2월 29일은 평년이면 2월 28일로 맞춤
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(years.checked_mul(12)?))
}

/// 서버 로컬 기준 오늘 날짜
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bill_month_format_is_zero_padded() {
        assert_eq!(BillMonth::new(2025, 3).unwrap().to_string(), "2025-03");
        assert_eq!(BillMonth::of(date(2026, 11, 30)).to_string(), "2026-11");
    }

    #[test]
    fn test_bill_month_parse() {
        assert_eq!("2025-01".parse::<BillMonth>().unwrap(), BillMonth::new(2025, 1).unwrap());
        assert!("2025-1".parse::<BillMonth>().is_err());
        assert!("2025-13".parse::<BillMonth>().is_err());
        assert!("202501".parse::<BillMonth>().is_err());
        assert!("abcd-01".parse::<BillMonth>().is_err());
    }

    #[test]
    fn test_bill_month_ordering_matches_text() {
        let a = BillMonth::new(2025, 9).unwrap();
        let b = BillMonth::new(2025, 10).unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn test_add_years_calendar() {
        assert_eq!(add_years(date(2025, 1, 15), 2), Some(date(2027, 1, 15)));
        assert_eq!(add_years(date(2024, 2, 29), 1), Some(date(2025, 2, 28)));
        assert_eq!(add_years(date(2024, 2, 29), 4), Some(date(2028, 2, 29)));
    }

    #[test]
    fn test_span_two_year_contract() {
        let months = BillMonth::span(date(2025, 1, 15), date(2027, 1, 15));
        assert_eq!(months.len(), 24);
        assert_eq!(months.first().unwrap().to_string(), "2025-01");
        assert_eq!(months.last().unwrap().to_string(), "2026-12");
        assert!(!months.iter().any(|m| m.to_string() == "2027-01"));
    }

    #[test]
    fn test_span_month_end_does_not_skip_february() {
        let months = BillMonth::span(date(2025, 1, 31), date(2025, 4, 30));
        let keys: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(keys, vec!["2025-01", "2025-02", "2025-03"]);
    }

    #[test]
    fn test_span_empty_when_expire_not_after_sign() {
        assert!(BillMonth::span(date(2025, 5, 1), date(2025, 5, 1)).is_empty());
    }

    #[test]
    fn test_role_round_trip_str() {
        for role in [Role::Admin, Role::DistributorA, Role::DistributorB] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_caller_scope() {
        let admin = Caller { id: 1, role: Role::Admin, username: "admin".into() };
        let dist = Caller { id: 7, role: Role::DistributorB, username: "b".into() };
        assert_eq!(admin.scope(), None);
        assert_eq!(dist.scope(), Some(7));
    }
}
