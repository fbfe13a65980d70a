use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    config::Config,
    models::{
        auth::{TokenClaims, TokenPayload},
        identity::AccountId,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Token is invalid or expired")]
    Invalid,
    #[error("Token kind not accepted here")]
    WrongKind,
}

pub type TokenResult<T> = Result<T, TokenError>;

/// Verified challenge token contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeGrant {
    pub random_hex: String,
    pub account_id: Option<AccountId>,
}

/// Issues and checks the HS256 tokens used for challenges and sessions.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    auth_ttl: Duration,
    payload_ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("auth_ttl", &self.auth_ttl)
            .field("payload_ttl", &self.payload_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<String>, auth_ttl: Duration, payload_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            auth_ttl,
            payload_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt.secret.clone(),
            config.get_auth_token_expiration(),
            config.get_payload_token_expiration(),
        )
    }

    pub fn sign(&self, payload: TokenPayload, ttl: Duration) -> TokenResult<String> {
        self.sign_at(payload, ttl, Utc::now())
    }

    pub fn sign_at(&self, payload: TokenPayload, ttl: Duration, now: DateTime<Utc>) -> TokenResult<String> {
        let claims = TokenClaims {
            payload,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Signs a long-lived session token.
    pub fn sign_auth(&self, payload: TokenPayload) -> TokenResult<String> {
        if !payload.is_auth() {
            return Err(TokenError::WrongKind);
        }

        self.sign(payload, self.auth_ttl)
    }

    pub fn sign_challenge(&self, random_hex: String, account_id: Option<AccountId>) -> TokenResult<String> {
        self.sign(
            TokenPayload::Challenge { random_hex, account_id },
            self.payload_ttl,
        )
    }

    /// Never fails: tampered, malformed or expired tokens all yield `None`.
    pub fn verify(&self, token: &str) -> Option<TokenPayload> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<TokenPayload> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against `now`, without leeway
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = match decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected token");
                return None;
            }
        };

        if now.timestamp() >= claims.exp {
            tracing::debug!(exp = claims.exp, "Rejected expired token");
            return None;
        }

        Some(claims.payload)
    }

    pub fn verify_auth(&self, token: &str) -> TokenResult<TokenPayload> {
        let payload = self.verify(token).ok_or(TokenError::Invalid)?;
        if !payload.is_auth() {
            return Err(TokenError::WrongKind);
        }

        Ok(payload)
    }

    pub fn verify_challenge(&self, token: &str) -> TokenResult<ChallengeGrant> {
        match self.verify(token).ok_or(TokenError::Invalid)? {
            TokenPayload::Challenge { random_hex, account_id } => Ok(ChallengeGrant { random_hex, account_id }),
            _ => Err(TokenError::WrongKind),
        }
    }
}
