use crate::{
    db_persistence::DbPersistence,
    http_server::AppState,
    models::{auth::TokenPayload, identity::AccountId},
    services::public_key::EmbeddedKeySource,
    utils::{telegram_init_data::sign_init_data, test_wallet::TestWallet},
    Config,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

fn build_state(db: DbPersistence, config: Config) -> AppState {
    AppState::with_key_source(
        Arc::new(db),
        Arc::new(config),
        Arc::new(EmbeddedKeySource::new(TestWallet::known_wallets())),
    )
}

/// State backed by the test database from `config/test.toml`.
pub async fn create_test_app_state() -> AppState {
    let config = Config::load_test_env().expect("Failed to load test configuration");
    let db = DbPersistence::new(config.get_database_url(), config.data.max_connections)
        .await
        .unwrap();

    build_state(db, config)
}

/// State whose pool never connects unless a query runs.
pub fn create_lazy_test_app_state() -> AppState {
    let config = Config::load_test_env().expect("Failed to load test configuration");
    let pool = PgPoolOptions::new()
        .connect_lazy(config.get_database_url())
        .expect("Failed to create lazy pool");

    build_state(DbPersistence::from_pool(pool), config)
}

pub fn generate_test_token(state: &AppState, payload: TokenPayload) -> String {
    state.tokens.sign_auth(payload).expect("Failed to sign token")
}

pub fn test_domain(state: &AppState) -> String {
    state.config.ton_proof.allowed_domains[0].clone()
}

pub fn test_init_data(state: &AppState, account_id: AccountId) -> String {
    let auth_date = chrono::Utc::now().timestamp().to_string();
    let user = format!(r#"{{"id":{},"first_name":"Test"}}"#, account_id);

    sign_init_data(
        &[
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", user.as_str()),
            ("auth_date", auth_date.as_str()),
        ],
        &state.config.telegram.bot_token,
    )
}
