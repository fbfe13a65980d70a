use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::{
    models::identity::AccountId,
    services::token_service::{TokenResult, TokenService},
};

/// A freshly issued challenge. The wallet signs `payload_token_hash`, the client echoes
/// `payload_token` back with the proof.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub payload_token: String,
    pub payload_token_hash: String,
}

#[derive(Debug, Clone)]
pub struct ChallengeService {
    tokens: Arc<TokenService>,
}

impl ChallengeService {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    pub fn issue_challenge(&self) -> TokenResult<Challenge> {
        self.issue(None)
    }

    /// Same as `issue_challenge`, but only the given account may redeem the proof.
    pub fn issue_challenge_for(&self, account_id: AccountId) -> TokenResult<Challenge> {
        self.issue(Some(account_id))
    }

    fn issue(&self, account_id: Option<AccountId>) -> TokenResult<Challenge> {
        let random_bytes: [u8; 32] = rand::random();
        let payload_token = self.tokens.sign_challenge(hex::encode(random_bytes), account_id)?;
        let payload_token_hash = payload_token_hash(&payload_token);

        Ok(Challenge {
            payload_token,
            payload_token_hash,
        })
    }
}

/// Hex SHA-256 of a payload token; the value a wallet is expected to put in `proof.payload`.
pub fn payload_token_hash(payload_token: &str) -> String {
    hex::encode(Sha256::digest(payload_token.as_bytes()))
}
