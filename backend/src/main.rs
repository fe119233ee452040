use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend::{app, AppConfig, AppState, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Set up tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    if config.dev_mode {
        tracing::warn!("Running in DEV MODE - unauthenticated requests act as admin!");
    }

    let mut store = Store::open(&config.database_path)
        .with_context(|| format!("failed to open database {}", config.database_path))?;
    store
        .initialize(&config.store_options())
        .context("failed to initialize database")?;

    let addr = format!("0.0.0.0:{}", config.port);
    let app = app(AppState::new(store, config));

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
