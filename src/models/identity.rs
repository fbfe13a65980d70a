use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

use crate::ton::TonAddress;

/// Platform account id (Telegram user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wallet address in canonical raw form (`<workchain>:<hex>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    pub fn parse(input: &str) -> Result<Self, String> {
        if input.is_empty() {
            return Err(String::from("Wallet address shouldn't be empty."));
        }

        match TonAddress::parse(input) {
            Ok(address) => Ok(WalletAddress(address.to_raw())),
            Err(err) => Err(err.to_string()),
        }
    }
}

impl From<TonAddress> for WalletAddress {
    fn from(address: TonAddress) -> Self {
        WalletAddress(address.to_raw())
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: AccountId,
    pub wallet: Option<WalletAddress>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(account_id: AccountId, wallet: Option<WalletAddress>) -> Self {
        Identity {
            account_id,
            wallet,
            created_at: None,
            updated_at: None,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Identity {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let account_id = row.try_get("account_id")?;
        let wallet = row.try_get("wallet")?;
        let created_at = row.try_get("created_at")?;
        let updated_at = row.try_get("updated_at")?;

        Ok(Identity {
            account_id,
            wallet,
            created_at,
            updated_at,
        })
    }
}

/// Outcome codes reported to the caller of connect/disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkCode {
    AlreadyConnected,
    Connected,
    WalletUpdated,
    AlreadyDisconnected,
    Disconnected,
}

impl LinkCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkCode::AlreadyConnected => "ALREADY_CONNECTED",
            LinkCode::Connected => "CONNECTED",
            LinkCode::WalletUpdated => "WALLET_UPDATED",
            LinkCode::AlreadyDisconnected => "ALREADY_DISCONNECTED",
            LinkCode::Disconnected => "DISCONNECTED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LinkCode::AlreadyConnected => "Wallet is already linked to this user.",
            LinkCode::Connected => "Wallet linked successfully.",
            LinkCode::WalletUpdated => "Wallet updated successfully.",
            LinkCode::AlreadyDisconnected => "Wallet is already detached.",
            LinkCode::Disconnected => "Wallet detached successfully.",
        }
    }
}

/// How a verified (account, wallet) pair is folded into stored identities, decided from the
/// identity currently holding the wallet and the identity of the calling account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePlan {
    /// Neither exists: insert a new identity.
    Create,
    /// Only the wallet holder exists: hand its row over to the caller.
    Repoint { from: AccountId },
    /// Only the caller exists: attach the wallet to it.
    Attach { previous: Option<WalletAddress> },
    /// Both exist and differ: detach the wallet from its holder, attach it to the caller.
    Move {
        from: AccountId,
        previous: Option<WalletAddress>,
    },
    Unchanged,
}

impl MergePlan {
    pub fn plan(by_wallet: Option<&Identity>, by_account: Option<&Identity>) -> Self {
        match (by_wallet, by_account) {
            (None, None) => MergePlan::Create,
            (Some(holder), None) => MergePlan::Repoint {
                from: holder.account_id,
            },
            (None, Some(caller)) => MergePlan::Attach {
                previous: caller.wallet.clone(),
            },
            (Some(holder), Some(caller)) if holder.account_id == caller.account_id => MergePlan::Unchanged,
            (Some(holder), Some(caller)) => MergePlan::Move {
                from: holder.account_id,
                previous: caller.wallet.clone(),
            },
        }
    }

    pub fn code(&self) -> LinkCode {
        match self {
            MergePlan::Create | MergePlan::Repoint { .. } => LinkCode::Connected,
            MergePlan::Attach { previous } | MergePlan::Move { previous, .. } => match previous {
                None => LinkCode::Connected,
                Some(_) => LinkCode::WalletUpdated,
            },
            MergePlan::Unchanged => LinkCode::AlreadyConnected,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub account_id: String,
    pub wallet: Option<String>,
}

impl From<&Identity> for IdentityView {
    fn from(identity: &Identity) -> Self {
        IdentityView {
            account_id: identity.account_id.to_string(),
            wallet: identity.wallet.as_ref().map(|w| w.0.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkResponse<D> {
    pub status: &'static str,
    pub code: LinkCode,
    pub message: &'static str,
    pub data: D,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl<D> LinkResponse<D> {
    pub fn ok(code: LinkCode, data: D) -> Self {
        LinkResponse {
            status: "ok",
            code,
            message: code.message(),
            data,
            token: None,
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}
