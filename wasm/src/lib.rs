//! WebAssembly module for the Farm Ledger core
//!
//! Provides client-side computation for:
//! - Totals with tax, at currency precision
//! - Asset depreciation schedules
//! - Stock movement previews
//! - Offline validation of ledger inputs
//!
//! Decimal amounts cross the boundary as strings so that nothing goes through
//! JavaScript floating point.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid {}: {}", field, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn js_error(message: String) -> JsValue {
    JsValue::from_str(&message)
}

// ============================================================================
// Money
// ============================================================================

fn total_with_tax(base: &str, tax_rate: &str) -> Result<String, String> {
    let base = parse_decimal("base amount", base)?;
    let tax_rate = parse_decimal("tax rate", tax_rate)?;
    shared::calculate_financial_amount(base, tax_rate)
        .map(|total| total.to_string())
        .ok_or_else(|| "Total is out of range".to_string())
}

/// `base * (1 + tax_rate)` rounded to cents, returned as a decimal string
#[wasm_bindgen]
pub fn calculate_total_with_tax(base: &str, tax_rate: &str) -> Result<String, JsValue> {
    total_with_tax(base, tax_rate).map_err(js_error)
}

/// Whether a document total agrees with its subtotal and tax rate
#[wasm_bindgen]
pub fn document_total_matches(subtotal: &str, tax_rate: &str, total: &str) -> Result<bool, JsValue> {
    let check = || -> Result<bool, String> {
        let expected = shared::calculate_financial_amount(
            parse_decimal("subtotal", subtotal)?,
            parse_decimal("tax rate", tax_rate)?,
        )
        .ok_or_else(|| "Total is out of range".to_string())?;
        Ok(shared::amounts_match(expected, parse_decimal("total", total)?))
    };
    check().map_err(js_error)
}

// ============================================================================
// Depreciation
// ============================================================================

#[derive(Debug, Serialize)]
struct DepreciationPreview {
    annual_depreciation: Decimal,
    schedule: Vec<shared::DepreciationScheduleEntry>,
}

fn depreciation_preview(asset_json: &str) -> Result<DepreciationPreview, String> {
    let asset: AssetInput = parse_json("asset", asset_json)?;

    let errors = validate_asset(&asset);
    if !errors.is_empty() {
        return Err(errors.join("; "));
    }

    let years = u32::try_from(asset.useful_life_years).map_err(|e| e.to_string())?;
    let schedule = shared::calculate_depreciation_schedule(
        asset.purchase_cost,
        asset.salvage_value,
        years,
        asset.purchase_date,
    )
    .map_err(|e| e.to_string())?;
    let annual = shared::annual_depreciation(asset.purchase_cost, asset.salvage_value, years)
        .map_err(|e| e.to_string())?;

    Ok(DepreciationPreview {
        annual_depreciation: annual,
        schedule,
    })
}

/// Straight-line schedule for an asset, as JSON
#[wasm_bindgen]
pub fn calculate_depreciation_schedule(asset_json: &str) -> Result<String, JsValue> {
    depreciation_preview(asset_json)
        .and_then(|preview| to_json(&preview))
        .map_err(js_error)
}

/// Book value of an asset at a given date, as a decimal string
#[wasm_bindgen]
pub fn book_value_at(asset_json: &str, as_of: &str) -> Result<String, JsValue> {
    let value = || -> Result<String, String> {
        let asset: AssetInput = parse_json("asset", asset_json)?;
        let years = u32::try_from(asset.useful_life_years).map_err(|e| e.to_string())?;
        let value = shared::book_value_at(
            asset.purchase_cost,
            asset.salvage_value,
            years,
            asset.purchase_date,
            parse_date("date", as_of)?,
        )
        .map_err(|e| e.to_string())?;
        Ok(value.to_string())
    };
    value().map_err(js_error)
}

// ============================================================================
// Inventory
// ============================================================================

fn movement_delta(movement_type: &str, quantity: &str) -> Result<String, String> {
    let movement_type = MovementType::from_str(movement_type)
        .ok_or_else(|| format!("Unknown movement type: {}", movement_type))?;
    let quantity = parse_decimal("quantity", quantity)?;

    let errors = validate_movement_quantity(movement_type, quantity);
    if !errors.is_empty() {
        return Err(errors.join("; "));
    }

    movement_type
        .signed_delta(quantity)
        .map(|delta| delta.to_string())
        .ok_or_else(|| "Invalid movement quantity".to_string())
}

/// Signed effect of a movement on the item quantity, as a decimal string
#[wasm_bindgen]
pub fn preview_movement_delta(movement_type: &str, quantity: &str) -> Result<String, JsValue> {
    movement_delta(movement_type, quantity).map_err(js_error)
}

/// Low stock means at or below the reorder level
#[wasm_bindgen]
pub fn is_low_stock(current_quantity: &str, reorder_level: &str) -> Result<bool, JsValue> {
    let check = || -> Result<bool, String> {
        Ok(parse_decimal("quantity", current_quantity)? <= parse_decimal("reorder level", reorder_level)?)
    };
    check().map_err(js_error)
}

// ============================================================================
// Offline validation
// ============================================================================

/// Errors come back as a JSON array of messages; `[]` means valid
fn validation_errors<T, F>(what: &str, json: &str, validate: F) -> Result<String, String>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(&T) -> Vec<String>,
{
    let input: T = parse_json(what, json)?;
    to_json(&validate(&input))
}

#[wasm_bindgen]
pub fn validate_inventory_item_json(json: &str) -> Result<String, JsValue> {
    validation_errors("item", json, validate_inventory_item).map_err(js_error)
}

/// Manual financial record, before it is assigned to a user
#[wasm_bindgen]
pub fn validate_financial_record_json(json: &str) -> Result<String, JsValue> {
    validation_errors("record", json, |input: &CreateRecordInput| {
        validate_financial_record(&input.clone().into_new_record(Uuid::nil()))
    })
    .map_err(js_error)
}

#[wasm_bindgen]
pub fn validate_maintenance_json(json: &str) -> Result<String, JsValue> {
    validation_errors("maintenance", json, validate_maintenance).map_err(js_error)
}

/// `today` is the client's local date, `YYYY-MM-DD`
#[wasm_bindgen]
pub fn validate_task_json(json: &str, today: &str) -> Result<String, JsValue> {
    let run = || -> Result<String, String> {
        let today = parse_date("today", today)?;
        validation_errors("task", json, |input: &TaskInput| validate_task(input, today))
    };
    run().map_err(js_error)
}
