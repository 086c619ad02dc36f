//! Configuration Module
//!
//! # Interview Q&A
//!
//! Q: 환경변수 vs 설정 파일, 어떤 방식을 선택했고 왜인가?
//! A: 환경변수를 선택
//!    - 12-Factor App 원칙 준수
//!    - 민감 정보(JWT 시크릿, 관리자 비밀번호)를 코드에 포함하지 않음
//!    - `.env` 파일은 dotenvy로 개발 환경에서만 로드
//!
//! Q: 대리점 금액 설정의 "잠금" 정책은 왜 설정값인가?
//! A: 운영 중 두 가지 정책이 모두 쓰였음
//!    - `editable`: 대리점이 언제든 다시 수정 가능
//!    - `lockable`: 첫 저장 후 잠김, 관리자가 해제해야 재수정 가능
//!    코드 분기 대신 배포 설정으로 선택

use std::env;
use anyhow::{bail, Context, Result};

use crate::types::Role;

/// 개발 환경 기본 JWT 시크릿 (프로덕션에서는 사용 불가)
const DEV_JWT_SECRET: &str = "dev-only-accounting-secret";

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 포트 (기본값: 3001)
    pub port: u16,

    /// SQLite 연결 문자열
    /// 형식: sqlite://path/to/accounting.db
    pub database_url: String,

    /// JWT 서명 키 (HS256)
    pub jwt_secret: String,

    /// 토큰 유효 시간 (시간)
    pub jwt_expiry_hours: i64,

    /// 초대 코드 역할별 수수료 비율 (%)
    pub commission_rate_a: f64,
    pub commission_rate_b: f64,

    /// 대리점 금액 설정 정책
    pub settings_policy: SettingsPolicy,

    /// 최초 기동 시 생성되는 admin 계정 비밀번호
    pub admin_password: String,

    /// 환경 (development, staging, production)
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsPolicy {
    /// 대리점이 자유롭게 재수정
    Editable,
    /// 첫 저장 후 잠김, admin 해제 필요
    Lockable,
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// # Optional Environment Variables
    ///
    /// - `PORT`: 서버 포트 (기본값: 3001)
    /// - `DATABASE_URL`: SQLite 파일 경로
    /// - `JWT_SECRET`: 프로덕션에서는 필수
    /// - `JWT_EXPIRY_HOURS`: 기본 24
    /// - `COMMISSION_RATE_A` / `COMMISSION_RATE_B`: 기본 6 / 8
    /// - `SETTINGS_POLICY`: editable | lockable
    /// - `ADMIN_PASSWORD`: 기본 admin
    /// - `ENVIRONMENT`: development | staging | production
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == Environment::Production => {
                bail!("JWT_SECRET must be set in production")
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let settings_policy = match env::var("SETTINGS_POLICY")
            .unwrap_or_else(|_| "editable".to_string())
            .to_lowercase()
            .as_str()
        {
            "editable" => SettingsPolicy::Editable,
            "lockable" => SettingsPolicy::Lockable,
            other => bail!("SETTINGS_POLICY must be 'editable' or 'lockable', got '{}'", other),
        };

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("PORT must be a valid number")?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/accounting.db".to_string()),

            jwt_secret,

            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .context("JWT_EXPIRY_HOURS must be a valid number")?,

            commission_rate_a: env::var("COMMISSION_RATE_A")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .context("COMMISSION_RATE_A must be a number")?,

            commission_rate_b: env::var("COMMISSION_RATE_B")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .context("COMMISSION_RATE_B must be a number")?,

            settings_policy,

            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string()),

            environment,
        })
    }

    /// 테스트/개발용 기본 설정 (환경변수 무시)
    pub fn development() -> Self {
        Config {
            port: 3001,
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
            commission_rate_a: 6.0,
            commission_rate_b: 8.0,
            settings_policy: SettingsPolicy::Editable,
            admin_password: "admin".to_string(),
            environment: Environment::Development,
        }
    }

    /// 프로덕션 환경인지 확인
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// 초대 코드 역할에 따른 기본 수수료 비율
    pub fn commission_rate_for(&self, role: Role) -> f64 {
        match role {
            Role::DistributorA => self.commission_rate_a,
            Role::DistributorB => self.commission_rate_b,
            Role::Admin => 0.0,
        }
    }
}
