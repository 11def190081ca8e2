//! HTTP handlers for document transitions

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{FinancialRecord, Invoice, PaymentData, PurchaseOrder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::TransitionOutcome;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReceiveInput {
    /// Defaults to today
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub invoice: Invoice,
    pub record: FinancialRecord,
}

/// Mark a purchase order received
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
    input: Option<Json<ReceiveInput>>,
) -> AppResult<Json<TransitionOutcome<PurchaseOrder>>> {
    let delivery_date = input
        .and_then(|Json(input)| input.delivery_date)
        .unwrap_or_else(|| Utc::now().date_naive());

    let outcome = state
        .documents()
        .receive_purchase_order(po_id, delivery_date, &current_user.0)
        .await?;
    Ok(Json(outcome))
}

/// Issue a draft invoice
pub async fn issue_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<TransitionOutcome<Invoice>>> {
    let outcome = state
        .documents()
        .issue_invoice(invoice_id, &current_user.0)
        .await?;
    Ok(Json(outcome))
}

/// Record a payment against an invoice
pub async fn record_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Json(payment): Json<PaymentData>,
) -> AppResult<Json<PaymentResponse>> {
    let (invoice, record) = state
        .documents()
        .record_invoice_payment(invoice_id, payment, &current_user.0)
        .await?;
    Ok(Json(PaymentResponse { invoice, record }))
}
