use serde::{Deserialize, Serialize};

use crate::models::{ModelError, ModelResult};

/// ```text
/// {
///   "address": "0:f63660ff947e5fe6ed4a8f729f1b24ef859497d0483aaa9d9ae48414297c4e1b",
///   "network": "-239",
///   "public_key": "b3d9…",
///   "proof": {
///     "timestamp": 1668094767,
///     "domain": { "lengthBytes": 21, "value": "ton-connect.github.io" },
///     "signature": "28tWSg8RDB3P/iIYupySINq1o3F5xLodndzNFHOtdi16Z+MuII8LAPnHLT3E6WTB27//qY4psU5Rf5/aJaIIAA==",
///     "payload": "E5B4ARS6CdOI2b5e1jz0jnS-x-a3DgfNXprrg_3pec0=",
///     "state_init": "te6cckECFgEAAwQAAgE0AQ…"
///   },
///   "payloadToken": "eyJhbGciOi…"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckProofRequest {
    pub address: String,
    pub network: TonNetwork,
    pub public_key: String,
    pub proof: TonProof,
    #[serde(rename = "payloadToken")]
    pub payload_token: String,
}

impl CheckProofRequest {
    /// Accepts the body either as a JSON object or as a JSON string holding the object,
    /// which is how some mini-app clients forward the TON Connect reply.
    pub fn from_value(value: serde_json::Value) -> ModelResult<Self> {
        let parsed = match value {
            serde_json::Value::String(text) => serde_json::from_str(&text),
            other => serde_json::from_value(other),
        };

        parsed.map_err(|e| {
            tracing::debug!(error = %e, "Malformed proof body");
            ModelError::InvalidInput
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TonNetwork {
    #[serde(rename = "-239")]
    Mainnet,
    #[serde(rename = "-3")]
    Testnet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TonProof {
    pub timestamp: u64,
    pub domain: TonDomain,
    pub signature: String,
    pub payload: String,
    pub state_init: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TonDomain {
    #[serde(rename = "lengthBytes")]
    pub length_bytes: u32,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratePayloadResponse {
    pub payload: String,
    #[serde(rename = "payloadToken")]
    pub payload_token: String,
}

#[derive(Debug, Serialize)]
pub struct CheckProofResponse {
    pub token: String,
}
