use axum::{extract::State, response::Json, Extension};

use crate::{
    handlers::auth::AuthHandlerError,
    http_server::AppState,
    models::{
        auth::{Caller, SessionResponse, TokenPayload},
        identity::{AccountId, IdentityView, LinkResponse},
        ton_proof::GeneratePayloadResponse,
    },
    AppError,
};

fn require_account(caller: &Caller) -> Result<AccountId, AppError> {
    caller
        .account_id()
        .ok_or_else(|| AuthHandlerError::Unauthorized("A platform account is required".to_string()).into())
}

/// Trades validated `initData` for a long-lived account token.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<SessionResponse>, AppError> {
    let account_id = require_account(&caller)?;
    state.identities.get_or_create(account_id).await?;

    let token = state.tokens.sign_auth(TokenPayload::Account { account_id })?;

    Ok(Json(SessionResponse { token }))
}

pub async fn identity_me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<IdentityView>, AppError> {
    let account_id = require_account(&caller)?;
    let identity = state.identities.get_or_create(account_id).await?;

    Ok(Json(IdentityView::from(&identity)))
}

pub async fn request_challenge(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<GeneratePayloadResponse>, AppError> {
    let account_id = require_account(&caller)?;
    let challenge = state.challenges.issue_challenge_for(account_id)?;

    Ok(Json(GeneratePayloadResponse {
        payload: challenge.payload_token_hash,
        payload_token: challenge.payload_token,
    }))
}

pub async fn connect(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<LinkResponse<IdentityView>>, AppError> {
    let account_id = require_account(&caller)?;
    let outcome = state.identities.connect(account_id, body).await?;

    Ok(Json(
        LinkResponse::ok(outcome.code, IdentityView::from(&outcome.identity)).with_token(outcome.token),
    ))
}

pub async fn disconnect(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<LinkResponse<IdentityView>>, AppError> {
    let account_id = require_account(&caller)?;
    let (code, identity) = state.identities.disconnect(account_id).await?;

    Ok(Json(LinkResponse::ok(code, IdentityView::from(&identity))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        routes::identity::identity_routes,
        utils::{
            test_app_state::{create_lazy_test_app_state, create_test_app_state, test_domain, test_init_data},
            test_wallet::TestWallet,
        },
    };
    use axum::{body::Body, http, Router};
    use tower::ServiceExt;

    fn test_app(state: AppState) -> Router {
        identity_routes(state.clone()).with_state(state)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn unique_account() -> AccountId {
        AccountId(rand::random::<u32>() as i64 + 2_000_000)
    }

    fn request(method: http::Method, uri: &str, authorization: &str, body: Option<serde_json::Value>) -> http::Request<Body> {
        let builder = http::Request::builder()
            .method(method)
            .uri(uri)
            .header(http::header::AUTHORIZATION, authorization)
            .header(http::header::CONTENT_TYPE, "application/json");

        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_challenge_is_bound_to_the_caller() {
        let state = create_lazy_test_app_state();
        let app = test_app(state.clone());
        let account = AccountId(42);

        let response = app
            .oneshot(request(
                http::Method::POST,
                "/identity/challenge",
                &format!("initData {}", test_init_data(&state, account)),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);

        let body = json_body(response).await;
        let grant = state
            .tokens
            .verify_challenge(body["payloadToken"].as_str().unwrap())
            .unwrap();
        assert_eq!(grant.account_id, Some(account));
    }

    #[tokio::test]
    async fn test_wallet_token_cannot_use_identity_routes() {
        let state = create_lazy_test_app_state();
        let app = test_app(state.clone());
        let token = state
            .tokens
            .sign_auth(TokenPayload::Wallet {
                address: TestWallet::new(41).address().to_raw(),
                network: crate::models::ton_proof::TonNetwork::Mainnet,
            })
            .unwrap();

        let response = app
            .oneshot(request(
                http::Method::POST,
                "/identity/challenge",
                &format!("Bearer {}", token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_me_connect_disconnect_flow() {
        let state = create_test_app_state().await;
        let app = test_app(state.clone());
        let wallet = TestWallet::new(42);
        let account = unique_account();

        if let Some(holder) = state
            .db
            .identities
            .find_by_wallet(&wallet.address().into())
            .await
            .unwrap()
        {
            state.identities.disconnect(holder.account_id).await.unwrap();
        }

        let response = app
            .clone()
            .oneshot(request(
                http::Method::POST,
                "/identity/session",
                &format!("initData {}", test_init_data(&state, account)),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        let bearer = format!("Bearer {}", json_body(response).await["token"].as_str().unwrap());

        let response = app
            .clone()
            .oneshot(request(http::Method::GET, "/identity/me", &bearer, None))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        let me = json_body(response).await;
        assert_eq!(me["accountId"], account.to_string());
        assert!(me["wallet"].is_null());

        let response = app
            .clone()
            .oneshot(request(http::Method::POST, "/identity/challenge", &bearer, None))
            .await
            .unwrap();
        let challenge = json_body(response).await;
        let proof = wallet.sign_proof(
            &test_domain(&state),
            chrono::Utc::now().timestamp() as u64,
            challenge["payload"].as_str().unwrap(),
            challenge["payloadToken"].as_str().unwrap(),
        );

        let response = app
            .clone()
            .oneshot(request(
                http::Method::POST,
                "/identity/connect",
                &bearer,
                Some(serde_json::to_value(proof).unwrap()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        let linked = json_body(response).await;
        assert_eq!(linked["code"], "CONNECTED");
        assert_eq!(linked["data"]["wallet"], wallet.address().to_raw());
        assert!(linked["token"].is_string());

        let response = app
            .clone()
            .oneshot(request(http::Method::POST, "/identity/disconnect", &bearer, None))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        let unlinked = json_body(response).await;
        assert_eq!(unlinked["code"], "DISCONNECTED");
        assert!(unlinked["data"]["wallet"].is_null());
        assert!(unlinked.get("token").is_none());
    }

    #[tokio::test]
    async fn test_disconnect_without_identity_is_not_found() {
        let state = create_test_app_state().await;
        let app = test_app(state.clone());
        let token = state
            .tokens
            .sign_auth(TokenPayload::Account {
                account_id: unique_account(),
            })
            .unwrap();

        let response = app
            .oneshot(request(
                http::Method::POST,
                "/identity/disconnect",
                &format!("Bearer {}", token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["message"], "User not found");
    }
}
