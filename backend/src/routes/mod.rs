//! Route definitions for the Farm Ledger API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes; everything below requires a bearer token
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Inventory ledger
        .nest("/inventory", inventory_routes())
        // Financial ledger
        .nest("/financial", financial_routes())
        // Document transitions
        .nest("/documents", document_routes())
        // Alerts
        .route("/alerts", get(handlers::list_alerts))
        // Assets and operations
        .nest("/operations", operations_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/items/:item_id",
            get(handlers::get_item).delete(handlers::deactivate_item),
        )
        .route(
            "/items/:item_id/movements",
            get(handlers::list_movements).post(handlers::record_movement),
        )
        .route("/items/:item_id/adjustments", post(handlers::adjust_item))
        .route("/low-stock", get(handlers::low_stock))
        .route("/valuation", get(handlers::valuation))
}

/// Financial routes
fn financial_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/records",
            get(handlers::records_by_source).post(handlers::create_record),
        )
        .route("/summary", get(handlers::summary))
}

/// Document transition routes
fn document_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/purchase-orders/:po_id/receive",
            post(handlers::receive_purchase_order),
        )
        .route("/invoices/:invoice_id/issue", post(handlers::issue_invoice))
        .route("/invoices/:invoice_id/payments", post(handlers::record_payment))
}

/// Asset depreciation and operations checks
fn operations_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/assets/depreciation-schedule",
            post(handlers::depreciation_schedule),
        )
        .route("/maintenance/check", post(handlers::check_maintenance))
        .route("/tasks/check", post(handlers::check_task))
}
