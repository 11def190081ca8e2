//! HTTP handlers for alerts

use axum::{extract::State, Json};
use chrono::Utc;
use shared::Alert;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Current alerts, critical first
pub async fn list_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Alert>>> {
    let alerts = state
        .alerts()
        .generate(current_user.0.scope(), Utc::now().date_naive())
        .await?;
    Ok(Json(alerts))
}
