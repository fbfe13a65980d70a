use crate::{
    handlers::identity::{connect, create_session, disconnect, identity_me, request_challenge},
    http_server::AppState,
    middlewares::auth::authenticate,
};
use axum::{
    handler::Handler,
    middleware,
    routing::{get, post},
    Router,
};

pub fn identity_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/identity/session",
            post(create_session.layer(middleware::from_fn_with_state(state.clone(), authenticate))),
        )
        .route(
            "/identity/me",
            get(identity_me.layer(middleware::from_fn_with_state(state.clone(), authenticate))),
        )
        .route(
            "/identity/challenge",
            post(request_challenge.layer(middleware::from_fn_with_state(state.clone(), authenticate))),
        )
        .route(
            "/identity/connect",
            post(connect.layer(middleware::from_fn_with_state(state.clone(), authenticate))),
        )
        .route(
            "/identity/disconnect",
            post(disconnect.layer(middleware::from_fn_with_state(state, authenticate))),
        )
}
