use axum::{extract::State, response::Json, Extension};

use crate::{
    handlers::HandlerError,
    http_server::AppState,
    models::{
        auth::{Caller, TokenPayload, WalletMeResponse},
        identity::WalletAddress,
        ton_proof::{CheckProofRequest, CheckProofResponse, GeneratePayloadResponse},
    },
    services::challenge_service::payload_token_hash,
    AppError,
};

#[derive(Debug, thiserror::Error)]
pub enum AuthHandlerError {
    #[error("Invalid proof")]
    InvalidProof,
    #[error("Invalid payload")]
    PayloadMismatch,
    #[error("Not authorized: {0}")]
    Unauthorized(String),
}

impl From<AuthHandlerError> for AppError {
    fn from(err: AuthHandlerError) -> Self {
        AppError::Handler(HandlerError::Auth(err))
    }
}

pub async fn generate_payload(State(state): State<AppState>) -> Result<Json<GeneratePayloadResponse>, AppError> {
    let challenge = state.challenges.issue_challenge()?;

    Ok(Json(GeneratePayloadResponse {
        payload: challenge.payload_token_hash,
        payload_token: challenge.payload_token,
    }))
}

pub async fn check_proof(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<CheckProofResponse>, AppError> {
    let request = CheckProofRequest::from_value(body).map_err(|_| AuthHandlerError::InvalidProof)?;

    if !state.proofs.verify(&request).await {
        return Err(AuthHandlerError::InvalidProof.into());
    }

    state.tokens.verify_challenge(&request.payload_token)?;

    if request.proof.payload != payload_token_hash(&request.payload_token) {
        return Err(AuthHandlerError::PayloadMismatch.into());
    }

    let wallet = WalletAddress::parse(&request.address).map_err(|_| AuthHandlerError::InvalidProof)?;
    tracing::info!(wallet = %wallet, "Wallet ownership proven");

    let token = state.tokens.sign_auth(TokenPayload::Wallet {
        address: wallet.0,
        network: request.network,
    })?;

    Ok(Json(CheckProofResponse { token }))
}

pub async fn auth_me(Extension(caller): Extension<Caller>) -> Result<Json<WalletMeResponse>, AppError> {
    match caller {
        Caller::Wallet { address, network } => Ok(Json(WalletMeResponse { address, network })),
        Caller::Account(_) => Err(AuthHandlerError::Unauthorized("A wallet token is required".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        routes::auth::auth_routes,
        utils::{
            test_app_state::{create_lazy_test_app_state, generate_test_token, test_domain},
            test_wallet::TestWallet,
        },
    };
    use axum::{body::Body, http, Router};
    use tower::ServiceExt;

    fn test_app(state: AppState) -> Router {
        auth_routes(state.clone()).with_state(state)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn issue_payload(app: &Router) -> (String, String) {
        let response = app
            .clone()
            .oneshot(
                http::Request::builder()
                    .method(http::Method::POST)
                    .uri("/auth/generate_payload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);

        let body = json_body(response).await;
        (
            body["payload"].as_str().unwrap().to_string(),
            body["payloadToken"].as_str().unwrap().to_string(),
        )
    }

    fn post_proof(body: &serde_json::Value) -> http::Request<Body> {
        http::Request::builder()
            .method(http::Method::POST)
            .uri("/auth/check_proof")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_payload_then_check_proof() {
        let state = create_lazy_test_app_state();
        let app = test_app(state.clone());
        let wallet = TestWallet::new(31);

        let (payload, payload_token) = issue_payload(&app).await;
        assert_eq!(payload, payload_token_hash(&payload_token));

        let request = wallet.sign_proof(
            &test_domain(&state),
            chrono::Utc::now().timestamp() as u64,
            &payload,
            &payload_token,
        );
        let response = app
            .clone()
            .oneshot(post_proof(&serde_json::to_value(request).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);

        let token = json_body(response).await["token"].as_str().unwrap().to_string();
        match state.tokens.verify_auth(&token).unwrap() {
            TokenPayload::Wallet { address, .. } => assert_eq!(address, wallet.address().to_raw()),
            other => panic!("unexpected token payload: {other:?}"),
        }

        let response = app
            .oneshot(
                http::Request::builder()
                    .uri("/auth/me")
                    .header(http::header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(json_body(response).await["address"], wallet.address().to_raw());
    }

    #[tokio::test]
    async fn test_check_proof_rejects_tampered_proof() {
        let state = create_lazy_test_app_state();
        let app = test_app(state.clone());
        let wallet = TestWallet::new(32);

        let (payload, payload_token) = issue_payload(&app).await;
        let request = wallet.sign_proof(
            &test_domain(&state),
            chrono::Utc::now().timestamp() as u64,
            &payload,
            &payload_token,
        );
        let mut body = serde_json::to_value(request).unwrap();
        body["proof"]["payload"] = serde_json::json!("something else");

        let response = app.oneshot(post_proof(&body)).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Invalid proof");
    }

    #[tokio::test]
    async fn test_check_proof_rejects_payload_from_another_token() {
        let state = create_lazy_test_app_state();
        let app = test_app(state.clone());
        let wallet = TestWallet::new(33);

        let (_, issued_token) = issue_payload(&app).await;
        let (other_payload, _) = issue_payload(&app).await;
        let request = wallet.sign_proof(
            &test_domain(&state),
            chrono::Utc::now().timestamp() as u64,
            &other_payload,
            &issued_token,
        );

        let response = app
            .oneshot(post_proof(&serde_json::to_value(request).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Invalid payload");
    }

    #[tokio::test]
    async fn test_check_proof_rejects_garbage_body() {
        let app = test_app(create_lazy_test_app_state());

        let response = app
            .oneshot(post_proof(&serde_json::json!({ "address": 42 })))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auth_me_requires_wallet_token() {
        let state = create_lazy_test_app_state();
        let app = test_app(state.clone());

        let response = app
            .clone()
            .oneshot(http::Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);

        let account_token = generate_test_token(&state, TokenPayload::Account {
            account_id: crate::models::identity::AccountId(7),
        });
        let response = app
            .oneshot(
                http::Request::builder()
                    .uri("/auth/me")
                    .header(http::header::AUTHORIZATION, format!("Bearer {}", account_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
    }
}
