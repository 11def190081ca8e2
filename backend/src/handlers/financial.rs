//! HTTP handlers for financial ledger endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{CreateRecordInput, DateRange, FinancialRecord, FinancialSummary, RecordSource};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::AppState;

/// `?source_type=invoice&source_id=...`
#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    pub source_type: String,
    pub source_id: Uuid,
}

impl SourceQuery {
    fn into_source(self) -> AppResult<RecordSource> {
        match self.source_type.as_str() {
            "invoice" => Ok(RecordSource::Invoice(self.source_id)),
            "purchase_order" => Ok(RecordSource::PurchaseOrder(self.source_id)),
            "customer" => Ok(RecordSource::Customer(self.source_id)),
            "supplier" => Ok(RecordSource::Supplier(self.source_id)),
            other => Err(AppError::validation(format!(
                "Unknown source type '{}'",
                other
            ))),
        }
    }
}

/// Create a manual financial record
pub async fn create_record(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRecordInput>,
) -> AppResult<(StatusCode, Json<FinancialRecord>)> {
    let record = state
        .financial()
        .create_record(input, &current_user.0)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Records linked to an invoice, purchase order, customer or supplier
pub async fn records_by_source(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SourceQuery>,
) -> AppResult<Json<Vec<FinancialRecord>>> {
    let source = query.into_source()?;
    let records = state
        .financial()
        .get_records_by_source(source, current_user.0.scope())
        .await?;
    Ok(Json(records))
}

/// Income, expense and net over `?start=YYYY-MM-DD&end=YYYY-MM-DD`
pub async fn summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(range): Query<DateRange>,
) -> AppResult<Json<FinancialSummary>> {
    let summary = state
        .financial()
        .summarize(current_user.0.scope(), range)
        .await?;
    Ok(Json(summary))
}
