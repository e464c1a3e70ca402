//! Session tokens and the per-request authentication context
//!
//! Logged-in users carry an HS256 JWT issued by `POST /api/users/login`.
//! Machine clients (collectors, scripts) use a static API key instead. The
//! auth middleware resolves either into an [`AuthContext`] and attaches it
//! to the request, so handlers never look at headers themselves.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use gdash_core::models::{User, UserRole};

use crate::AppError;

/// Identifier recorded for requests authenticated with an API key
pub const API_KEY_SUBJECT: &str = "api-key";

/// Identifier recorded when authentication is disabled
pub const LOCAL_DEV_SUBJECT: &str = "local-dev";

/// How a request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Session,
    ApiKey,
    /// Authentication disabled (`--no-auth`)
    None,
}

/// Who is making the request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    /// Email for users, a fixed marker otherwise; used in the audit log
    pub subject: String,
    pub user_id: Option<i64>,
    pub role: UserRole,
    pub method: AuthMethod,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            subject: user.email.clone(),
            user_id: Some(user.id),
            role: user.role,
            method: AuthMethod::Session,
        }
    }

    /// API keys can read and record weather data but not administer users
    pub fn api_key() -> Self {
        Self {
            subject: API_KEY_SUBJECT.to_string(),
            user_id: None,
            role: UserRole::User,
            method: AuthMethod::ApiKey,
        }
    }

    pub fn local_dev() -> Self {
        Self {
            subject: LOCAL_DEV_SUBJECT.to_string(),
            user_id: None,
            role: UserRole::Admin,
            method: AuthMethod::None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Reject non-admins with 403
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin access required"))
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for a user; returns the token and its expiry
    pub fn issue(&self, user: &User) -> Result<(String, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::internal("Session lifetime out of range"))?;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, expires_at))
    }

    /// Verify signature and expiry
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                None
            }
        }
    }
}

/// Generate a random secret for deployments that did not configure one
pub fn random_secret() -> Vec<u8> {
    use rand::RngCore;

    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

/// Validate an API key against the configured keys in constant time
pub fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    let mut matched = false;

    for key in valid_keys {
        let key_bytes = key.as_bytes();
        // ct_eq on slices is only constant-time for equal lengths
        if provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes)) {
            matched = true;
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 42,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(1));
        let (token, expires_at) = keys.issue(&user(UserRole::Admin)).unwrap();
        assert!(expires_at > Utc::now());

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let keys = SessionKeys::new(b"secret-a", Duration::hours(1));
        let other = SessionKeys::new(b"secret-b", Duration::hours(1));
        let (token, _) = keys.issue(&user(UserRole::User)).unwrap();

        assert!(other.verify(&token).is_none());
        assert!(keys.verify("not.a.token").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(-1));
        let (token, _) = keys.issue(&user(UserRole::User)).unwrap();
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let keys = SessionKeys::new(b"test-secret", Duration::max_value());
        let err = keys.issue(&user(UserRole::User)).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validate_api_key() {
        let keys = vec!["alpha-key".to_string(), "beta-key-2".to_string()];
        assert!(validate_api_key("alpha-key", &keys));
        assert!(validate_api_key("beta-key-2", &keys));
        assert!(!validate_api_key("alpha-kez", &keys));
        assert!(!validate_api_key("alpha", &keys));
        assert!(!validate_api_key("", &[]));
    }

    #[test]
    fn test_context_roles() {
        assert!(AuthContext::local_dev().is_admin());
        assert!(!AuthContext::api_key().is_admin());
        assert!(AuthContext::api_key().require_admin().is_err());

        let ctx = AuthContext::from_user(&user(UserRole::User));
        assert_eq!(ctx.user_id, Some(42));
        assert_eq!(ctx.method, AuthMethod::Session);
        assert!(!ctx.is_admin());
    }

    #[test]
    fn test_random_secret() {
        let a = random_secret();
        let b = random_secret();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
