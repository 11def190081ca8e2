//! Validation rules for the Farm Ledger core
//!
//! Every `validate_*` function returns the list of human-readable problems
//! with its input; an empty list means the input is valid. Callers surface
//! the messages verbatim and must not persist anything when the list is not
//! empty.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::depreciation::MAX_USEFUL_LIFE_YEARS;
use crate::money::CURRENCY_SCALE;
use crate::models::{
    AssetInput, CreateItemInput, MaintenanceInput, MovementType, NewFinancialRecord, TaskInput,
    TransactionType,
};

/// Maximum task title length
pub const MAX_TASK_TITLE_LEN: usize = 255;

/// Fractional digits kept on stock quantities
pub const QUANTITY_SCALE: u32 = 4;

// ============================================================================
// Field helpers
// ============================================================================

/// Custom validator: the string must contain something other than whitespace
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// "reorder_level" -> "Reorder level"
fn field_label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let label = field_label(field);
    match error.code.as_ref() {
        "blank" => format!("{} is required", label),
        "length" => match error.params.get("max") {
            Some(max) => format!("{} must be at most {} characters", label, max),
            None => format!("{} has an invalid length", label),
        },
        code => format!("{} is invalid ({})", label, code),
    }
}

/// Flatten derive-level errors into messages, ordered by field name
fn field_messages(result: Result<(), ValidationErrors>) -> Vec<String> {
    let Err(errors) = result else {
        return Vec::new();
    };

    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    fields
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| describe(field, e)))
        .collect()
}

fn require_non_negative(errors: &mut Vec<String>, label: &str, value: Decimal) {
    if value < Decimal::ZERO {
        errors.push(format!("{} cannot be negative", label));
    }
}

/// Trailing zeros do not count: 1.2500 has two decimal places
fn require_scale(errors: &mut Vec<String>, label: &str, value: Decimal, max_scale: u32) {
    if value.normalize().scale() > max_scale {
        errors.push(format!(
            "{} cannot have more than {} decimal places",
            label, max_scale
        ));
    }
}

/// Non-negative amount at currency precision
fn require_money(errors: &mut Vec<String>, label: &str, value: Decimal) {
    require_non_negative(errors, label, value);
    require_scale(errors, label, value, CURRENCY_SCALE);
}

/// Problems with a payment amount; shared by every path that settles an invoice
pub fn validate_payment_amount(amount: Decimal) -> Vec<String> {
    let mut errors = Vec::new();
    if amount <= Decimal::ZERO {
        errors.push("Payment amount must be greater than zero".to_string());
    }
    require_scale(&mut errors, "Payment amount", amount, CURRENCY_SCALE);
    errors
}

// ============================================================================
// Inventory
// ============================================================================

/// Validate a new inventory item
pub fn validate_inventory_item(input: &CreateItemInput) -> Vec<String> {
    let mut errors = field_messages(input.validate());

    require_non_negative(&mut errors, "Quantity", input.initial_quantity);
    require_scale(&mut errors, "Quantity", input.initial_quantity, QUANTITY_SCALE);
    require_non_negative(&mut errors, "Reorder level", input.reorder_level);
    require_scale(&mut errors, "Reorder level", input.reorder_level, QUANTITY_SCALE);
    require_money(&mut errors, "Unit cost", input.unit_cost);
    require_money(&mut errors, "Selling price", input.selling_price);

    errors
}

/// Validate the quantity handed to a stock movement of the given type
pub fn validate_movement_quantity(movement_type: MovementType, quantity: Decimal) -> Vec<String> {
    let mut errors = Vec::new();

    match movement_type {
        MovementType::Adjustment if quantity.is_zero() => {
            errors.push("Adjustment quantity cannot be zero".to_string());
        }
        MovementType::Adjustment => {}
        _ if quantity <= Decimal::ZERO => {
            errors.push(format!(
                "{} quantity must be greater than zero",
                movement_type
            ));
        }
        _ => {}
    }
    require_scale(&mut errors, "Quantity", quantity, QUANTITY_SCALE);

    errors
}

/// Validate a unit cost supplied with a movement
pub fn validate_unit_cost(unit_cost: Option<Decimal>) -> Vec<String> {
    let mut errors = Vec::new();
    if let Some(cost) = unit_cost {
        require_money(&mut errors, "Unit cost", cost);
    }
    errors
}

// ============================================================================
// Financial records
// ============================================================================

/// Validate a financial record before it is persisted
pub fn validate_financial_record(record: &NewFinancialRecord) -> Vec<String> {
    let mut errors = Vec::new();

    if record.amount <= Decimal::ZERO {
        errors.push("Amount must be greater than zero".to_string());
    }
    require_scale(&mut errors, "Amount", record.amount, CURRENCY_SCALE);
    if record.category_id.is_none() {
        errors.push("Category is required".to_string());
    }

    errors.extend(field_messages(record.validate()));

    if !record.has_required_reference() {
        match record.transaction_type {
            TransactionType::Income => {
                errors.push("Income records must reference a customer or an invoice".to_string())
            }
            TransactionType::Expense => errors.push(
                "Expense records must reference a supplier or a purchase order".to_string(),
            ),
            TransactionType::Transfer => {}
        }
    }

    errors
}

// ============================================================================
// Assets, maintenance and tasks
// ============================================================================

/// Validate the depreciation-relevant fields of an asset
pub fn validate_asset(input: &AssetInput) -> Vec<String> {
    let mut errors = Vec::new();

    if not_blank(&input.name).is_err() {
        errors.push("Name is required".to_string());
    }
    if input.purchase_cost <= Decimal::ZERO {
        errors.push("Purchase cost must be greater than zero".to_string());
    }
    require_scale(&mut errors, "Purchase cost", input.purchase_cost, CURRENCY_SCALE);
    require_money(&mut errors, "Salvage value", input.salvage_value);
    if input.salvage_value >= input.purchase_cost {
        errors.push("Salvage value must be less than purchase cost".to_string());
    }
    if input.useful_life_years <= 0 {
        errors.push("Useful life must be greater than zero years".to_string());
    } else if input.useful_life_years as u32 > MAX_USEFUL_LIFE_YEARS {
        errors.push(format!(
            "Useful life cannot exceed {} years",
            MAX_USEFUL_LIFE_YEARS
        ));
    }

    errors
}

/// Validate a maintenance record
pub fn validate_maintenance(input: &MaintenanceInput) -> Vec<String> {
    let mut errors = Vec::new();
    require_money(&mut errors, "Cost", input.cost);
    errors.extend(field_messages(input.validate()));
    errors
}

/// Validate a task; `today` is the reference date for the due-date check
pub fn validate_task(input: &TaskInput, today: NaiveDate) -> Vec<String> {
    let mut errors = field_messages(input.validate());

    if let Some(due) = input.due_date {
        if due < today {
            errors.push("Due date cannot be in the past".to_string());
        }
    }

    errors
}
