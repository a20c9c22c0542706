//! Credential hashing (bcrypt) and bearer token issuance/verification (JWT, HS256).

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

use crate::models::{Claims, Role, User};

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

/// Identity embedded in a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Bad signature, malformed structure and expiry all surface as this one error.
#[derive(Error, Debug)]
#[error("invalid or expired token")]
pub struct InvalidToken(#[source] jsonwebtoken::errors::Error);

/// Stateless issuer/verifier. There is no revocation: a token stays valid
/// until `exp` whatever happens to the user afterwards.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(identity, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            id: identity.id.clone(),
            username: identity.username.clone(),
            role: identity.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        debug!(username = %claims.username, exp = claims.exp, "issuing token");
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, InvalidToken> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Identity {
        Identity {
            id: "1".to_string(),
            username: "admin".to_string(),
            role: Role::Admin,
        }
    }

    fn service(secret: &[u8]) -> TokenService {
        TokenService::new(secret, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let tokens = service(b"test-secret");
        let token = tokens.issue(&admin()).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.id, "1");
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service(b"test-secret");
        let issued = Utc::now() - Duration::hours(25);
        let token = tokens.issue_at(&admin(), issued).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn test_token_still_valid_just_before_expiry() {
        let tokens = service(b"test-secret");
        let issued = Utc::now() - Duration::hours(23);
        let token = tokens.issue_at(&admin(), issued).unwrap();
        assert!(tokens.verify(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret_and_garbage_rejected() {
        let token = service(b"secret-one").issue(&admin()).unwrap();
        assert!(service(b"secret-two").verify(&token).is_err());
        assert!(service(b"secret-one").verify("invalid-token").is_err());
        assert!(service(b"secret-one").verify("a.b.c").is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = service(b"test-secret");
        let token = tokens.issue(&admin()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let other = service(b"test-secret")
            .issue(&Identity {
                id: "2".to_string(),
                username: "manager".to_string(),
                role: Role::Manager,
            })
            .unwrap();
        let other_payload = other.split('.').nth(1).unwrap().to_string();
        parts[1] = &other_payload;
        assert!(tokens.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hashed = hash_password("password123", 4).unwrap();
        assert_ne!(hashed, "password123");
        assert!(verify_password("password123", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }
}
