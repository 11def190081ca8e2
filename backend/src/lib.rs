//! Farm Ledger backend
//!
//! Inventory and financial ledgers for a farm back office, with document
//! lifecycle bridging, alerts and a thin JSON API.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{AlertGenerator, DocumentEventBridge, FinancialLedger, InventoryLedger};
use store::LedgerStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn inventory(&self) -> InventoryLedger {
        InventoryLedger::new(self.store.clone())
    }

    pub fn financial(&self) -> FinancialLedger {
        FinancialLedger::new(self.store.clone())
    }

    pub fn documents(&self) -> DocumentEventBridge {
        DocumentEventBridge::new(self.store.clone(), &self.config.ledger)
    }

    pub fn alerts(&self) -> AlertGenerator {
        AlertGenerator::new(self.store.clone(), self.config.ledger.expiry_warning_days)
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Farm Ledger API v1"
}
