//! HTTP handlers for asset depreciation and operations input checks
//!
//! These are pure computations over the request body; nothing is stored.

use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    annual_depreciation, calculate_depreciation_schedule, validate_asset, validate_maintenance,
    validate_task, AssetInput, DepreciationScheduleEntry, MaintenanceInput, TaskInput,
};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;

#[derive(Debug, Serialize)]
pub struct DepreciationResponse {
    pub annual_depreciation: Decimal,
    pub schedule: Vec<DepreciationScheduleEntry>,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl From<Vec<String>> for ValidationReport {
    fn from(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Straight-line depreciation schedule for an asset
pub async fn depreciation_schedule(
    _current_user: CurrentUser,
    Json(asset): Json<AssetInput>,
) -> AppResult<Json<DepreciationResponse>> {
    AppError::check(validate_asset(&asset))?;

    // validate_asset guarantees a positive useful life
    let years = u32::try_from(asset.useful_life_years)
        .map_err(|_| AppError::validation("Useful life must be greater than zero years"))?;

    let schedule = calculate_depreciation_schedule(
        asset.purchase_cost,
        asset.salvage_value,
        years,
        asset.purchase_date,
    )
    .map_err(|e| AppError::validation(e.to_string()))?;
    let annual = annual_depreciation(asset.purchase_cost, asset.salvage_value, years)
        .map_err(|e| AppError::validation(e.to_string()))?;

    Ok(Json(DepreciationResponse {
        annual_depreciation: annual,
        schedule,
    }))
}

/// Check a maintenance record before it is submitted
pub async fn check_maintenance(
    _current_user: CurrentUser,
    Json(input): Json<MaintenanceInput>,
) -> Json<ValidationReport> {
    Json(validate_maintenance(&input).into())
}

/// Check a task before it is submitted
pub async fn check_task(
    _current_user: CurrentUser,
    Json(input): Json<TaskInput>,
) -> Json<ValidationReport> {
    Json(validate_task(&input, Utc::now().date_naive()).into())
}
