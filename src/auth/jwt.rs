use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::Error};

/// Decodes and checks an HS256 token. Expiry is enforced by `Validation::default()`.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// Only access tokens may call the API; refresh tokens are for the auth service.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = verify_token(token, secret).map_err(|e| e.to_string())?;
    if claims.token_type != TokenType::Access {
        return Err("Refresh tokens cannot be used for API calls".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    pub const SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

    pub fn mint(role: u8, employee_id: Option<u64>, token_type: TokenType, ttl: i64) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            user_id: 1,
            sub: "tester".to_string(),
            role,
            exp: (now + ttl) as usize,
            jti: Uuid::new_v4().to_string(),
            token_type,
            employee_id,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    pub fn access(role: u8, employee_id: Option<u64>) -> String {
        mint(role, employee_id, TokenType::Access, 900)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn access_token_round_trips_claims() {
        let token = access(3, Some(42));
        let claims = verify_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.role, 3);
        assert_eq!(claims.employee_id, Some(42));
    }

    #[test]
    fn refresh_tokens_are_refused() {
        let token = mint(3, Some(42), TokenType::Refresh, 900);
        assert!(verify_token(&token, SECRET).is_ok());
        assert!(verify_access_token(&token, SECRET).is_err());
    }

    #[test]
    fn expired_and_foreign_tokens_fail() {
        // well past the default 60s leeway
        let expired = mint(3, Some(42), TokenType::Access, -300);
        assert!(verify_access_token(&expired, SECRET).is_err());

        let token = access(1, None);
        assert!(verify_access_token(&token, "some-other-secret").is_err());
    }
}
