use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::models::identity::AccountId;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("init data has no hash")]
    MissingHash,
    #[error("init data hash does not match")]
    HashMismatch,
    #[error("init data has no valid auth_date")]
    MissingAuthDate,
    #[error("init data has expired")]
    Expired,
    #[error("User data is missing from initData")]
    MissingUser,
}

#[derive(Debug, Deserialize)]
struct WebAppUser {
    id: i64,
}

/// Validated Telegram Mini App launch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    pub account_id: AccountId,
    pub auth_date: i64,
}

/// Checks `initData` the way Telegram documents it: the `hash` field must equal
/// `HMAC_SHA256(HMAC_SHA256("WebAppData", bot_token), data_check_string)` and `auth_date` must be
/// no older than `max_age`.
pub fn validate_init_data(
    init_data: &str,
    bot_token: &str,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<InitData, InitDataError> {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(init_data.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let hash_index = pairs
        .iter()
        .position(|(k, _)| k == "hash")
        .ok_or(InitDataError::MissingHash)?;
    let (_, hash) = pairs.remove(hash_index);
    let expected = hex::decode(hash).map_err(|_| InitDataError::HashMismatch)?;

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let data_check_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut mac = HmacSha256::new_from_slice(&secret_key(bot_token)?).map_err(|_| InitDataError::HashMismatch)?;
    mac.update(data_check_string.as_bytes());
    mac.verify_slice(&expected).map_err(|_| InitDataError::HashMismatch)?;

    let auth_date = pairs
        .iter()
        .find(|(k, _)| k == "auth_date")
        .and_then(|(_, v)| v.parse::<i64>().ok())
        .ok_or(InitDataError::MissingAuthDate)?;

    if auth_date + max_age.num_seconds() < now.timestamp() {
        return Err(InitDataError::Expired);
    }

    let user = pairs
        .iter()
        .find(|(k, _)| k == "user")
        .and_then(|(_, v)| serde_json::from_str::<WebAppUser>(v).ok())
        .ok_or(InitDataError::MissingUser)?;

    Ok(InitData {
        account_id: AccountId(user.id),
        auth_date,
    })
}

fn secret_key(bot_token: &str) -> Result<Vec<u8>, InitDataError> {
    let mut mac = HmacSha256::new_from_slice(b"WebAppData").map_err(|_| InitDataError::HashMismatch)?;
    mac.update(bot_token.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
    let mut sorted: Vec<_> = fields.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let data_check_string = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut mac = HmacSha256::new_from_slice(&secret_key(bot_token).unwrap()).unwrap();
    mac.update(data_check_string.as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in fields {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}
