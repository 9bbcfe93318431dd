//! Access gate: bearer token verification.
//!
//! Tokens are ID tokens in the Firebase shape (`sub`, `email`, `name`,
//! `picture`, plus an optional custom `role` claim).

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{AuthConfig, TokenAlgorithm},
    error::AppError,
};

/// Verified caller identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub role: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// Email carried by the token; required for anything tied to a user
    pub fn require_email(&self) -> Result<&str, AppError> {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Authorization("Token does not carry an email".to_string()))
    }

    /// Whether the caller may act on resources owned by `email`
    pub fn can_act_for(&self, email: &str) -> bool {
        self.is_admin()
            || self
                .email
                .as_deref()
                .map(|own| own.eq_ignore_ascii_case(email))
                .unwrap_or(false)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid or expired token: {0}")]
    Invalid(String),

    #[error("Token verifier misconfigured: {0}")]
    Misconfigured(String),
}

/// Verify a bearer token and return the identity it carries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, TokenError>;
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    role: Option<String>,
}

impl From<IdTokenClaims> for Identity {
    fn from(claims: IdTokenClaims) -> Self {
        Identity {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
            role: claims.role,
        }
    }
}

/// Local JWT verification with a shared secret (HS256) or a public key (RS256)
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let (key, algorithm) = match config.algorithm {
            TokenAlgorithm::HS256 => {
                let secret = config
                    .secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| TokenError::Misconfigured("auth.secret is required for HS256".to_string()))?;
                (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
            }
            TokenAlgorithm::RS256 => {
                let pem = config
                    .public_key_pem
                    .as_deref()
                    .ok_or_else(|| TokenError::Misconfigured("auth.public_key_pem is required for RS256".to_string()))?;
                let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| TokenError::Misconfigured(e.to_string()))?;
                (key, Algorithm::RS256)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = config.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match config.audience {
            Some(ref audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<IdTokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        Ok(data.claims.into())
    }
}
