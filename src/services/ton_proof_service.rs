use std::{fmt, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::{
    config::TonProofConfig,
    metrics::track_proof_check,
    models::ton_proof::{CheckProofRequest, TonProof},
    services::public_key::PublicKeySource,
    ton::{StateInit, TonAddress},
};

/// Why a proof was turned down. Only ever logged and counted; callers see a plain `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    MalformedStateInit,
    MalformedAddress,
    PublicKeyUnavailable,
    MalformedPublicKey,
    PublicKeyMismatch,
    AddressMismatch,
    DomainNotAllowed,
    Expired,
    MalformedSignature,
    BadSignature,
}

impl Rejection {
    fn as_str(&self) -> &'static str {
        match self {
            Rejection::MalformedStateInit => "malformed_state_init",
            Rejection::MalformedAddress => "malformed_address",
            Rejection::PublicKeyUnavailable => "public_key_unavailable",
            Rejection::MalformedPublicKey => "malformed_public_key",
            Rejection::PublicKeyMismatch => "public_key_mismatch",
            Rejection::AddressMismatch => "address_mismatch",
            Rejection::DomainNotAllowed => "domain_not_allowed",
            Rejection::Expired => "expired",
            Rejection::MalformedSignature => "malformed_signature",
            Rejection::BadSignature => "bad_signature",
        }
    }
}

/// Checks TON Connect `ton_proof` replies.
#[derive(Clone)]
pub struct TonProofService {
    config: TonProofConfig,
    keys: Arc<dyn PublicKeySource>,
}

impl fmt::Debug for TonProofService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TonProofService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TonProofService {
    pub fn new(config: TonProofConfig, keys: Arc<dyn PublicKeySource>) -> Self {
        Self { config, keys }
    }

    pub async fn verify(&self, request: &CheckProofRequest) -> bool {
        self.verify_at(request, chrono::Utc::now().timestamp()).await
    }

    /// Like `verify`, with the current unix time supplied by the caller.
    pub async fn verify_at(&self, request: &CheckProofRequest, now: i64) -> bool {
        match self.check(request, now).await {
            Ok(()) => {
                track_proof_check("valid");
                true
            }
            Err(rejection) => {
                tracing::debug!(
                    address = %request.address,
                    domain = %request.proof.domain.value,
                    reason = rejection.as_str(),
                    "Rejected ton_proof"
                );
                track_proof_check(rejection.as_str());
                false
            }
        }
    }

    async fn check(&self, request: &CheckProofRequest, now: i64) -> Result<(), Rejection> {
        let proof = &request.proof;

        let state_init = StateInit::from_base64(&proof.state_init).map_err(|_| Rejection::MalformedStateInit)?;
        let address = TonAddress::parse(&request.address).map_err(|_| Rejection::MalformedAddress)?;

        let public_key = self
            .keys
            .resolve_public_key(&address, &state_init)
            .await
            .ok_or(Rejection::PublicKeyUnavailable)?;

        let claimed_key = hex::decode(&request.public_key).map_err(|_| Rejection::MalformedPublicKey)?;
        if claimed_key.as_slice() != public_key.as_slice() {
            return Err(Rejection::PublicKeyMismatch);
        }

        let derived = state_init
            .address(address.workchain)
            .map_err(|_| Rejection::MalformedStateInit)?;
        if derived != address {
            return Err(Rejection::AddressMismatch);
        }

        if !self.config.allowed_domains.iter().any(|d| *d == proof.domain.value) {
            return Err(Rejection::DomainNotAllowed);
        }

        let earliest = now - self.config.valid_auth_time_sec;
        if i128::from(proof.timestamp) < i128::from(earliest) {
            return Err(Rejection::Expired);
        }

        let digest = self.signed_digest(&address, proof);

        let signature = STANDARD
            .decode(&proof.signature)
            .ok()
            .and_then(|bytes| Signature::from_slice(&bytes).ok())
            .ok_or(Rejection::MalformedSignature)?;
        let verifying_key = VerifyingKey::from_bytes(&public_key).map_err(|_| Rejection::MalformedPublicKey)?;

        verifying_key
            .verify(&digest, &signature)
            .map_err(|_| Rejection::BadSignature)
    }

    /// `sha256(ff ff ‖ connect prefix ‖ sha256(message))`, where message is
    /// `proof prefix ‖ wc (i32 BE) ‖ hash ‖ domain len (u32 LE) ‖ domain ‖ timestamp (u64 LE) ‖ payload`.
    fn signed_digest(&self, address: &TonAddress, proof: &TonProof) -> [u8; 32] {
        let mut message = Vec::with_capacity(
            self.config.ton_proof_prefix.len() + 4 + 32 + 4 + proof.domain.value.len() + 8 + proof.payload.len(),
        );
        message.extend_from_slice(self.config.ton_proof_prefix.as_bytes());
        message.extend_from_slice(&address.workchain.to_be_bytes());
        message.extend_from_slice(&address.hash);
        message.extend_from_slice(&proof.domain.length_bytes.to_le_bytes());
        message.extend_from_slice(proof.domain.value.as_bytes());
        message.extend_from_slice(&proof.timestamp.to_le_bytes());
        message.extend_from_slice(proof.payload.as_bytes());

        let message_hash = Sha256::digest(&message);

        let mut envelope = Vec::with_capacity(2 + self.config.ton_connect_prefix.len() + 32);
        envelope.extend_from_slice(&[0xff, 0xff]);
        envelope.extend_from_slice(self.config.ton_connect_prefix.as_bytes());
        envelope.extend_from_slice(&message_hash);

        Sha256::digest(&envelope).into()
    }
}
