use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ton_link::{http_server, AppError, AppResult, Config, DbPersistence};

mod args;

use args::Args;

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    // Load configuration from --config path (defaults to config/default.toml)
    let mut config = Config::load(&args.config).map_err(AppError::Config)?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_logging(&config.logging.level)?;

    info!("🚀 Starting TonLink v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config);
    info!("Allowed proof domains: {:?}", config.ton_proof.allowed_domains);

    let db = Arc::new(DbPersistence::new(config.get_database_url(), config.data.max_connections).await?);
    info!("Database ready, migrations applied");

    if args.migrate_only {
        info!("Migrations applied, exiting");
        return Ok(());
    }

    let server_address = config.get_server_address();
    let server_config = Arc::new(config);

    let server_task = tokio::spawn({
        let db = db.clone();
        let server_address = server_address.clone();
        async move {
            http_server::start_server(db, &server_address, server_config)
                .await
                .map_err(|e| AppError::Server(e.to_string()))
        }
    });

    info!("HTTP API available at: http://{}", server_address);

    let result = server_task.await.map_err(|e| AppError::Server(e.to_string()))?;
    if let Err(e) = &result {
        error!("HTTP server exited: {}", e);
    }

    result
}

fn init_logging(level: &str) -> AppResult<()> {
    let log_level = match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => {
            eprintln!("Invalid log level: {}, defaulting to info", level);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ton_link={},tower_http={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    Ok(())
}
