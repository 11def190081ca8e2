//! Farm Ledger server
//!
//! Serves the ledger core over HTTP on top of PostgreSQL.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use farm_ledger_backend::{create_app, store::PgLedgerStore, AppState, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "farm_ledger_server=debug,farm_ledger_backend=debug,tower_http=debug,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Farm Ledger Server");
    tracing::info!("Environment: {}", config.environment);

    if config.ledger.sales_category_id.is_none() || config.ledger.purchases_category_id.is_none() {
        tracing::warn!("Ledger categories are not fully configured; derived financial records will fail");
    }

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(Arc::new(PgLedgerStore::new(db_pool)), config);

    // Build application
    let app = create_app(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
