use std::sync::Arc;

use crate::{
    db_persistence::{DbError, DbPersistence},
    metrics::track_identity_link,
    models::{
        auth::TokenPayload,
        identity::{AccountId, Identity, LinkCode, WalletAddress},
        ton_proof::CheckProofRequest,
    },
    services::{
        challenge_service::payload_token_hash,
        ton_proof_service::TonProofService,
        token_service::{TokenError, TokenService},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid proof")]
    InvalidProof,
    #[error("Invalid payload")]
    PayloadMismatch,
    #[error("Payload token rejected: {0}")]
    Token(#[from] TokenError),
    #[error("Identity not found: {0}")]
    NotFound(AccountId),
    #[error("Wallet link conflicted with a concurrent update")]
    Conflict,
    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for IdentityError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::IdentityNotFound(account_id) => IdentityError::NotFound(account_id),
            DbError::Conflict(_) => IdentityError::Conflict,
            other => IdentityError::Database(other),
        }
    }
}

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub code: LinkCode,
    pub identity: Identity,
    /// Wallet session token for the freshly proven address.
    pub token: String,
}

/// Binds proven wallets to platform accounts.
#[derive(Debug, Clone)]
pub struct IdentityService {
    db: Arc<DbPersistence>,
    proofs: Arc<TonProofService>,
    tokens: Arc<TokenService>,
}

impl IdentityService {
    pub fn new(db: Arc<DbPersistence>, proofs: Arc<TonProofService>, tokens: Arc<TokenService>) -> Self {
        Self { db, proofs, tokens }
    }

    pub async fn get_or_create(&self, account_id: AccountId) -> IdentityResult<Identity> {
        Ok(self.db.identities.ensure(account_id).await?)
    }

    /// Verifies a TON Connect proof issued for `account_id` and links the proven wallet to it.
    /// `body` may be the proof object itself or a JSON string holding it.
    pub async fn connect(&self, account_id: AccountId, body: serde_json::Value) -> IdentityResult<ConnectOutcome> {
        let request = CheckProofRequest::from_value(body).map_err(|_| IdentityError::InvalidProof)?;

        if !self.proofs.verify(&request).await {
            return Err(IdentityError::InvalidProof);
        }

        let grant = self.tokens.verify_challenge(&request.payload_token)?;

        if request.proof.payload != payload_token_hash(&request.payload_token) {
            tracing::debug!(account_id = %account_id, "Proof was signed for another challenge");
            return Err(IdentityError::PayloadMismatch);
        }

        if grant.account_id != Some(account_id) {
            tracing::debug!(
                account_id = %account_id,
                bound_to = ?grant.account_id,
                "Challenge was not issued for this account"
            );
            return Err(IdentityError::PayloadMismatch);
        }

        let wallet = WalletAddress::parse(&request.address).map_err(|_| IdentityError::InvalidProof)?;

        let (code, identity) = match self.db.identities.link_wallet(account_id, &wallet).await {
            Err(err) if err.is_conflict() => {
                tracing::warn!(account_id = %account_id, wallet = %wallet, "Wallet link conflicted, retrying once");
                self.db.identities.link_wallet(account_id, &wallet).await?
            }
            result => result?,
        };

        track_identity_link(code.as_str());
        tracing::info!(account_id = %account_id, wallet = %wallet, code = code.as_str(), "Wallet linked");

        let token = self.tokens.sign_auth(TokenPayload::Wallet {
            address: wallet.0.clone(),
            network: request.network,
        })?;

        Ok(ConnectOutcome { code, identity, token })
    }

    pub async fn disconnect(&self, account_id: AccountId) -> IdentityResult<(LinkCode, Identity)> {
        let (code, identity) = self.db.identities.clear_wallet(account_id).await?;

        track_identity_link(code.as_str());
        tracing::info!(account_id = %account_id, code = code.as_str(), "Wallet unlinked");

        Ok((code, identity))
    }
}
