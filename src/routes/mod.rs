use auth::auth_routes;
use axum::Router;
use identity::identity_routes;

use crate::http_server::AppState;

pub mod auth;
pub mod identity;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes(state.clone()))
        .merge(identity_routes(state))
}
