use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

/// Subject resolved by the external credential provider for one request.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub identity_id: String,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    MissingSecret,
}

/// Claims of the externally issued bearer token. This service only decodes
/// tokens; issuance and password handling live with the auth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Result<VerifiedIdentity, VerifyError>;
}

pub struct JwtVerifier {
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Result<Self, VerifyError> {
        if secret.is_empty() {
            return Err(VerifyError::MissingSecret);
        }
        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn from_config() -> Result<Self, VerifyError> {
        Self::new(&config::config().security.jwt_secret)
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(bearer_token, &self.decoding_key, &validation)
            .map_err(|e| VerifyError::InvalidToken(e.to_string()))?;
        Ok(VerifiedIdentity {
            identity_id: token_data.claims.sub,
        })
    }
}
