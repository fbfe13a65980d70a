use axum::{middleware, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    db_persistence::DbPersistence,
    errors::AppResult,
    metrics::{metrics_handler, track_metrics, Metrics},
    routes::api_routes,
    services::{
        challenge_service::ChallengeService,
        identity_service::IdentityService,
        public_key::{EmbeddedKeySource, FirstMatch, PublicKeySource},
        ton_proof_service::TonProofService,
        token_service::TokenService,
        tonapi_client::TonApiClient,
    },
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Arc<DbPersistence>,
    pub config: Arc<Config>,
    pub metrics: Arc<Metrics>,
    pub tokens: Arc<TokenService>,
    pub challenges: Arc<ChallengeService>,
    pub proofs: Arc<TonProofService>,
    pub identities: Arc<IdentityService>,
}

impl AppState {
    /// Production wiring: embedded wallet keys first, TonAPI as the fallback.
    pub fn new(db: Arc<DbPersistence>, config: Arc<Config>) -> AppResult<Self> {
        let tonapi = TonApiClient::from_config(&config)?;
        let keys = FirstMatch::default()
            .then(Arc::new(EmbeddedKeySource::default()))
            .then(Arc::new(tonapi));

        Ok(Self::with_key_source(db, config, Arc::new(keys)))
    }

    pub fn with_key_source(db: Arc<DbPersistence>, config: Arc<Config>, keys: Arc<dyn PublicKeySource>) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config));
        let challenges = Arc::new(ChallengeService::new(tokens.clone()));
        let proofs = Arc::new(TonProofService::new(config.ton_proof.clone(), keys));
        let identities = Arc::new(IdentityService::new(db.clone(), proofs.clone(), tokens.clone()));

        Self {
            db,
            config,
            metrics: Arc::new(Metrics::new()),
            tokens,
            challenges,
            proofs,
            identities,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

/// Create the HTTP server router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api_routes(state.clone()))
        .layer(middleware::from_fn(track_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        service: "TonLink".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Start the HTTP server
pub async fn start_server(
    db: Arc<DbPersistence>,
    bind_address: &str,
    config: Arc<Config>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = AppState::new(db, config)?;
    let app = create_router(state);

    tracing::info!("Starting HTTP server on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
