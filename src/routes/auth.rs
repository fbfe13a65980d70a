use crate::{
    handlers::auth::{auth_me, check_proof, generate_payload},
    http_server::AppState,
    middlewares::auth::authenticate,
};
use axum::{
    handler::Handler,
    middleware,
    routing::{get, post},
    Router,
};

pub fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/generate_payload", post(generate_payload))
        .route("/auth/check_proof", post(check_proof))
        .route(
            "/auth/me",
            get(auth_me.layer(middleware::from_fn_with_state(state, authenticate))),
        )
}
