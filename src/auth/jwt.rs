use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Encode a signed HS256 token valid for `ttl_days`.
pub fn encode_jwt(
    secret: &str,
    ttl_days: i64,
    user_id: i64,
    email: &str,
    role: Role,
) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::days(ttl_days);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("encode_jwt: {}", e))
}

/// Decode and validate a token's signature and expiry.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("decode_jwt: {}", e))?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_identity() {
        let token = encode_jwt("secret", 7, 42, "admin@pulseboard.io", Role::Admin).unwrap();
        let claims = decode_jwt(&token, "secret").unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode_jwt("secret", 7, 1, "a@b.c", Role::Viewer).unwrap();
        assert!(decode_jwt(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = encode_jwt("secret", -2, 1, "a@b.c", Role::Viewer).unwrap();
        assert!(decode_jwt(&token, "secret").is_err());
    }
}
