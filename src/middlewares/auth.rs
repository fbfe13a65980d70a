use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    Json,
};

use crate::{
    handlers::ErrorResponse,
    http_server::AppState,
    models::auth::{Caller, TokenPayload},
    utils::{
        authorization::{extract_credentials_from_request, Credentials},
        telegram_init_data::{validate_init_data, InitDataError},
    },
};

fn reject(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    let json_error = ErrorResponse {
        status: "fail",
        message: message.to_string(),
    };
    (status, Json(json_error))
}

/// Resolves the `Authorization` header into a [`Caller`] extension.
///
/// `Bearer` carries one of our auth tokens, `initData` carries Telegram Mini App launch
/// parameters which identify a platform account.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let caller = match extract_credentials_from_request(&req)? {
        Credentials::Bearer(token) => match state.tokens.verify_auth(&token) {
            Ok(TokenPayload::Wallet { address, network }) => Caller::Wallet { address, network },
            Ok(TokenPayload::Account { account_id }) => Caller::Account(account_id),
            Ok(TokenPayload::Challenge { .. }) | Err(_) => {
                return Err(reject(StatusCode::UNAUTHORIZED, "Invalid token"));
            }
        },
        Credentials::InitData(init_data) => {
            let validated = validate_init_data(
                &init_data,
                &state.config.telegram.bot_token,
                state.config.get_init_data_expiration(),
                chrono::Utc::now(),
            )
            .map_err(|err| {
                tracing::debug!(error = %err, "Rejected init data");
                match err {
                    InitDataError::MissingUser => reject(StatusCode::BAD_REQUEST, "User data is missing from initData"),
                    _ => reject(StatusCode::BAD_REQUEST, "Invalid init data"),
                }
            })?;

            Caller::Account(validated.account_id)
        }
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}
