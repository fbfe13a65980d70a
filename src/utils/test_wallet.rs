use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use crate::{
    models::ton_proof::{CheckProofRequest, TonDomain, TonNetwork, TonProof},
    ton::{Boc, CellBuilder, KnownWallet, KnownWallets, StateInit, TonAddress, WalletDataLayout},
};

/// A v4-style wallet whose code is registered only in its own `KnownWallets`, able to
/// produce TON Connect proofs the same way a real wallet app does.
pub struct TestWallet {
    signing_key: SigningKey,
    state_init: StateInit,
    address: TonAddress,
}

impl TestWallet {
    pub fn new(seed: u8) -> Self {
        let signing_key = SigningKey::from_bytes(&[seed; 32]);

        let mut data = CellBuilder::new();
        data.store_uint(0, 32)
            .unwrap()
            .store_uint(698983191, 32)
            .unwrap()
            .store_bytes(signing_key.verifying_key().as_bytes())
            .unwrap()
            .store_bit(false)
            .unwrap();

        let state_init = StateInit::new(Arc::new(Self::code()), Arc::new(data.build().unwrap()));
        let address = state_init.address(0).unwrap();

        Self {
            signing_key,
            state_init,
            address,
        }
    }

    fn code() -> crate::ton::Cell {
        let mut code = CellBuilder::new();
        code.store_bytes(b"ton-link test wallet").unwrap();
        code.build().unwrap()
    }

    pub fn known_wallets() -> KnownWallets {
        KnownWallets::default().with(KnownWallet {
            name: "test-v4",
            code_hash: Self::code().hash(),
            layout: WalletDataLayout::SeqnoSubwalletKey,
        })
    }

    pub fn address(&self) -> TonAddress {
        self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn state_init_base64(&self) -> String {
        let root = Arc::new(self.state_init.to_cell().unwrap());
        STANDARD.encode(Boc::serialize(&root, true))
    }

    /// Signs `payload` for `domain` at `timestamp` following ton-proof-item-v2.
    pub fn sign_proof(&self, domain: &str, timestamp: u64, payload: &str, payload_token: &str) -> CheckProofRequest {
        let mut message = Vec::new();
        message.extend_from_slice(b"ton-proof-item-v2/");
        message.extend_from_slice(&self.address.workchain.to_be_bytes());
        message.extend_from_slice(&self.address.hash);
        message.extend_from_slice(&(domain.len() as u32).to_le_bytes());
        message.extend_from_slice(domain.as_bytes());
        message.extend_from_slice(&timestamp.to_le_bytes());
        message.extend_from_slice(payload.as_bytes());

        let mut envelope = vec![0xff, 0xff];
        envelope.extend_from_slice(b"ton-connect");
        envelope.extend_from_slice(&Sha256::digest(&message));

        let signature = self.signing_key.sign(&Sha256::digest(&envelope));

        CheckProofRequest {
            address: self.address.to_raw(),
            network: TonNetwork::Mainnet,
            public_key: hex::encode(self.public_key()),
            proof: TonProof {
                timestamp,
                domain: TonDomain {
                    length_bytes: domain.len() as u32,
                    value: domain.to_string(),
                },
                signature: STANDARD.encode(signature.to_bytes()),
                payload: payload.to_string(),
                state_init: self.state_init_base64(),
            },
            payload_token: payload_token.to_string(),
        }
    }
}

/// A v3r2 wallet deployed with the stock wallet code, owned by the RFC 8032 test key 1,
/// and one `ton_proof` it signed for `example.com`.
pub mod v3r2_wallet {
    /// Stock wallet v3r2 code as distributed by wallet apps (single cell, with CRC).
    pub const CODE_BOC: &str = "te6cckEBAQEAcQAA3v8AIN0gggFMl7ohggEznLqxn3Gw7UTQ0x/THzHXC//jBOCk8mCDCNcYINMf0x/TH/gjE7vyY+1E0NMf0x/T/9FRMrryoVFEuvKiBPkBVBBV+RDyo/gAkyDXSpbTB9QC+wDo0QGkyMsfyx/L/8ntVBC9ba0=";
    /// Stock wallet v3r1 code.
    pub const V3R1_CODE_BOC: &str = "te6cckEBAQEAYgAAwP8AIN0gggFMl7qXMO1E0NcLH+Ck8mCDCNcYINMf0x/TH/gjE7vyY+1E0NMf0x/T/9FRMrryoVFEuvKiBPkBVBBV+RDyo/gAkyDXSpbTB9QC+wDo0QGkyMsfyx/L/8ntVD++buA=";

    pub const PUBLIC_KEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
    /// seqno 0, subwallet 698983191.
    pub const STATE_INIT: &str = "te6cckEBAwEAoAACATQBAgDe/wAg3SCCAUyXuiGCATOcurGfcbDtRNDTH9MfMdcL/+ME4KTyYIMI1xgg0x/TH9Mf+CMTu/Jj7UTQ0x/TH9P/0VEyuvKhUUS68qIE+QFUEFX5EPKj+ACTINdKltMH1AL7AOjRAaTIyx/LH8v/ye1UAFAAAAAAKamjF9damAGCsQq31Uv+08lkBzoO4XLz2qYjJa8CGmj3B1EaNIIqxg==";
    pub const ADDRESS: &str = "0:7757577dde60fabf8a96a113e7966d14ad8a5c1d9cf69420ffd74bbce0d1d6b9";
    pub const ADDRESS_BOUNCEABLE: &str = "EQB3V1d93mD6v4qWoRPnlm0UrYpcHZz2lCD_10u84NHWuX1P";
    pub const ADDRESS_NON_BOUNCEABLE: &str = "UQB3V1d93mD6v4qWoRPnlm0UrYpcHZz2lCD_10u84NHWuSCK";

    pub const PROOF_DOMAIN: &str = "example.com";
    pub const PROOF_TIMESTAMP: u64 = 1_699_999_940;
    pub const PROOF_PAYLOAD: &str = "c3f5e148643f6faaa6b1c365806175b048caad0c2c772dee68922e1ac99d187d";
    pub const PROOF_SIGNATURE: &str =
        "iuh6EkBh93SMfwdvfQZ1s6FEMFP3H3MLmkud3XvqLJnLrFiaUqwpoCe1U/wv7XqdHqxkOBxErdXpd0rbvCnJCg==";
    /// Verification time for the proof, one minute after signing.
    pub const PROOF_CHECKED_AT: i64 = 1_700_000_000;

    pub fn proof_request() -> super::CheckProofRequest {
        super::CheckProofRequest {
            address: ADDRESS.to_string(),
            network: super::TonNetwork::Mainnet,
            public_key: PUBLIC_KEY.to_string(),
            proof: super::TonProof {
                timestamp: PROOF_TIMESTAMP,
                domain: super::TonDomain {
                    length_bytes: PROOF_DOMAIN.len() as u32,
                    value: PROOF_DOMAIN.to_string(),
                },
                signature: PROOF_SIGNATURE.to_string(),
                payload: PROOF_PAYLOAD.to_string(),
                state_init: STATE_INIT.to_string(),
            },
            payload_token: "payload-token".to_string(),
        }
    }
}
