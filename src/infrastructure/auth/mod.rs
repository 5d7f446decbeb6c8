//! Auth verifier: the one place a bearer token becomes a `user_id`.
//!
//! Generalized out of `presentation::middleware::auth`'s inline
//! `jsonwebtoken::decode` call so the gateway's `IDENTIFY` handler and the
//! REST `auth_middleware` share one implementation instead of two
//! independently-maintained copies of the same claim parsing.

use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::settings::JwtSettings;
use crate::shared::error::AppError;

/// JWT claims structure, shared by REST and gateway auth paths.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

/// Outcome of a successful verification: just enough to identify who is
/// connecting, never the raw claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: i64,
}

#[async_trait]
pub trait AuthVerifier: Send + Sync {
    /// Validate a bearer token (without the `Bearer ` prefix) and return
    /// the identity it carries.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AppError>;
}

/// `jsonwebtoken`-backed verifier over the app's shared HMAC secret.
pub struct JwtAuthVerifier {
    secret: String,
}

impl JwtAuthVerifier {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            secret: settings.secret.clone(),
        }
    }
}

#[async_trait]
impl AuthVerifier for JwtAuthVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Token expired".into())
            }
            _ => AppError::Unauthorized("Invalid token".into()),
        })?;

        let user_id: i64 = token_data
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid token claims".into()))?;

        Ok(VerifiedIdentity { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret".into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn token_for(user_id: i64, secret: &str, exp_offset_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + exp_offset_secs,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn verifies_well_formed_token() {
        let verifier = JwtAuthVerifier::new(&settings());
        let token = token_for(42, "test-secret", 3600);

        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.user_id, 42);
    }

    #[tokio::test]
    async fn rejects_wrong_secret() {
        let verifier = JwtAuthVerifier::new(&settings());
        let token = token_for(42, "wrong-secret", 3600);

        assert!(verifier.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn rejects_malformed_token() {
        let verifier = JwtAuthVerifier::new(&settings());
        assert!(verifier.verify("not-a-jwt").await.is_err());
    }
}
