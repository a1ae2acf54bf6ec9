//! HS256 access tokens.

use artisan_core::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issues and validates access tokens for every account role.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: i64,
}

impl JwtService {
    #[must_use]
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }

    /// Seconds until a freshly issued token expires.
    #[must_use]
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_minutes * 60
    }

    /// # Errors
    ///
    /// Returns a `jsonwebtoken` error if signing fails.
    pub fn issue(&self, subject: Uuid, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Decode and validate a token, returning the caller's id and role.
    ///
    /// # Errors
    ///
    /// Returns a `jsonwebtoken` error for bad signatures, expired tokens, or
    /// a subject that is not a UUID.
    pub fn verify(&self, token: &str) -> Result<(Uuid, Role), jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        let id = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSubject)
        })?;
        Ok((id, data.claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_32_bytes_long!!";

    #[test]
    fn issued_token_round_trips_subject_and_role() {
        let service = JwtService::new(SECRET, 15);
        let id = Uuid::new_v4();
        let token = service.issue(id, Role::Admin).expect("issue");

        let (sub, role) = service.verify(&token).expect("verify");
        assert_eq!(sub, id);
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = JwtService::new("different_secret_key_32_bytes!!", 15);
        let token = issuer.issue(Uuid::new_v4(), Role::Client).expect("issue");

        assert!(JwtService::new(SECRET, 15).verify(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = JwtService::new(SECRET, 15);
        let genuine = service.issue(Uuid::new_v4(), Role::Client).expect("issue");
        let forged = JwtService::new("attacker_secret_key_32_bytes!!!", 15)
            .issue(Uuid::new_v4(), Role::Admin)
            .expect("issue");

        // Splice the forged payload onto the genuine signature.
        let genuine_parts: Vec<&str> = genuine.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let tampered = format!(
            "{}.{}.{}",
            genuine_parts[0], forged_parts[1], genuine_parts[2]
        );

        assert!(service.verify(&tampered).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = JwtService::new(SECRET, 15);
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: Role::Client,
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("encode");

        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(JwtService::new(SECRET, 15).verify("not.a.token").is_err());
    }
}
