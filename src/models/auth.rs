use serde::{Deserialize, Serialize};

use crate::models::{identity::AccountId, ton_proof::TonNetwork};

/// What a signed token asserts. The `kind` tag keeps one kind of token from being
/// accepted where another is expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenPayload {
    /// Long-lived: caller owns `address` on `network`.
    Wallet { address: String, network: TonNetwork },
    /// Long-lived: caller is platform account `account_id`.
    Account { account_id: AccountId },
    /// Short-lived challenge nonce, optionally bound to the account it was issued for.
    Challenge {
        random_hex: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        account_id: Option<AccountId>,
    },
}

impl TokenPayload {
    pub fn is_auth(&self) -> bool {
        matches!(self, TokenPayload::Wallet { .. } | TokenPayload::Account { .. })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub payload: TokenPayload,
    pub iat: i64,
    pub exp: i64,
}

/// Verified caller attached to the request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Wallet { address: String, network: TonNetwork },
    Account(AccountId),
}

impl Caller {
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Caller::Account(id) => Some(*id),
            Caller::Wallet { .. } => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletMeResponse {
    pub address: String,
    pub network: TonNetwork,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
}
