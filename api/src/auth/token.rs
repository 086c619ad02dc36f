//! JWT issuing and validation (HS256)

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::{Caller, Role};

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub name: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

impl Claims {
    pub fn caller(&self) -> Caller {
        Caller {
            id: self.sub,
            role: self.role,
            username: self.username.clone(),
        }
    }
}

/// 사용자 토큰 생성
pub fn create_token(
    user_id: i64,
    username: &str,
    role: Role,
    name: &str,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        name: name.to_string(),
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// 서명과 만료 검증 후 claims 반환
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let token = create_token(42, "alice", Role::DistributorA, "Alice", "secret", 1).unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::DistributorA);
        assert_eq!(claims.caller().username, "alice");
    }

    #[test]
    fn test_token_wrong_secret_rejected() {
        let token = create_token(1, "a", Role::Admin, "A", "secret", 1).unwrap();
        assert!(decode_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_token(1, "a", Role::Admin, "A", "secret", -2).unwrap();
        assert!(decode_token(&token, "secret").is_err());
    }
}
