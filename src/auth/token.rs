use std::fmt;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use tracing::debug;

use crate::auth::models::{Claims, Principal};

/// Cheap structural check: a compact JWS has exactly three dot-separated segments.
pub fn has_token_shape(token: &str) -> bool {
    token.split('.').count() == 3
}

/// Why a credential failed cryptographic verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed payload or bad signature.
    Invalid,
    Expired,
    Other(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Invalid => write!(f, "invalid token"),
            TokenError::Expired => write!(f, "token expired"),
            TokenError::Other(reason) => write!(f, "token rejected: {reason}"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingAlgorithm
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Invalid,
            _ => TokenError::Other(err.to_string()),
        }
    }
}

/// Signs and verifies access tokens with a shared HMAC secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, principal: &Principal) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            id: principal.id,
            role: principal.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .context("failed to sign access token")
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        debug!(user_id = %data.claims.id, "verified access token");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use uuid::Uuid;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_verifies_and_carries_identity() {
        let keys = TokenKeys::new("test-secret", 1);
        let user = principal(Role::Seller);

        let token = keys.issue(&user).expect("issue");
        assert!(has_token_shape(&token));

        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.role, Role::Seller);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_classified_as_expired() {
        let keys = TokenKeys::new("test-secret", 1);
        let now = Utc::now().timestamp();
        let token = keys
            .sign(&Claims {
                id: Uuid::new_v4(),
                role: Role::Buyer,
                iat: now - 7200,
                exp: now - 3600,
            })
            .expect("sign");

        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let issuer = TokenKeys::new("secret-one", 1);
        let verifier = TokenKeys::new("secret-two", 1);
        let token = issuer.issue(&principal(Role::Admin)).expect("issue");

        assert_eq!(verifier.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_segments_are_invalid() {
        let keys = TokenKeys::new("test-secret", 1);
        assert_eq!(keys.verify("abc.def.ghi"), Err(TokenError::Invalid));
    }

    #[test]
    fn shape_check_counts_segments() {
        assert!(has_token_shape("a.b.c"));
        assert!(!has_token_shape("a.b"));
        assert!(!has_token_shape("a.b.c.d"));
        assert!(!has_token_shape("offline-token"));
    }
}
