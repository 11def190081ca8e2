//! Inventory ledger models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::DocumentRef;
use crate::validation::not_blank;

/// A stocked item whose quantity is owned by the inventory ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub code: String,
    pub unit: String,
    pub current_quantity: Decimal,
    pub reorder_level: Decimal,
    pub unit_cost: Decimal,
    pub selling_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    /// Items referenced by movements are deactivated instead of deleted
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.current_quantity <= self.reorder_level
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.current_quantity.is_zero()
    }
}

/// Input for creating an inventory item
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateItemInput {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub code: String,
    #[validate(custom = "not_blank")]
    pub unit: String,
    #[serde(default)]
    pub initial_quantity: Decimal,
    #[serde(default)]
    pub reorder_level: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
    #[serde(default)]
    pub selling_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

/// Movement types (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Purchase,
    Sale,
    /// The only type that may move stock in either direction
    Adjustment,
    Transfer,
    Consumption,
    Loss,
}

impl MovementType {
    pub const ALL: [MovementType; 6] = [
        MovementType::Purchase,
        MovementType::Sale,
        MovementType::Adjustment,
        MovementType::Transfer,
        MovementType::Consumption,
        MovementType::Loss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Purchase => "PURCHASE",
            MovementType::Sale => "SALE",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Transfer => "TRANSFER",
            MovementType::Consumption => "CONSUMPTION",
            MovementType::Loss => "LOSS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PURCHASE" => Some(MovementType::Purchase),
            "SALE" => Some(MovementType::Sale),
            "ADJUSTMENT" => Some(MovementType::Adjustment),
            "TRANSFER" => Some(MovementType::Transfer),
            "CONSUMPTION" => Some(MovementType::Consumption),
            "LOSS" => Some(MovementType::Loss),
            _ => None,
        }
    }

    /// Fixed direction of the type, `None` for adjustments
    pub fn direction(&self) -> Option<MovementDirection> {
        match self {
            MovementType::Purchase | MovementType::Transfer => Some(MovementDirection::In),
            MovementType::Sale | MovementType::Consumption | MovementType::Loss => {
                Some(MovementDirection::Out)
            }
            MovementType::Adjustment => None,
        }
    }

    /// Signed effect on the item quantity for a caller-supplied quantity.
    ///
    /// Directional types take a positive magnitude (outbound types are
    /// negated here); adjustments take the signed delta as-is. Returns `None`
    /// when the quantity does not fit the type.
    pub fn signed_delta(&self, quantity: Decimal) -> Option<Decimal> {
        match self.direction() {
            Some(_) if quantity <= Decimal::ZERO => None,
            Some(MovementDirection::In) => Some(quantity),
            Some(MovementDirection::Out) => Some(-quantity),
            None if quantity.is_zero() => None,
            None => Some(quantity),
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementType::Purchase => write!(f, "Purchase"),
            MovementType::Sale => write!(f, "Sale"),
            MovementType::Adjustment => write!(f, "Adjustment"),
            MovementType::Transfer => write!(f, "Transfer"),
            MovementType::Consumption => write!(f, "Consumption"),
            MovementType::Loss => write!(f, "Loss"),
        }
    }
}

/// Movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "in",
            MovementDirection::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementDirection::In),
            "out" => Some(MovementDirection::Out),
            _ => None,
        }
    }

    pub fn of_delta(delta: Decimal) -> Self {
        if delta.is_sign_negative() {
            MovementDirection::Out
        } else {
            MovementDirection::In
        }
    }
}

/// Immutable record of one quantity change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub movement_type: MovementType,
    /// Always a positive magnitude; `direction` carries the sign
    pub quantity: Decimal,
    pub direction: MovementDirection,
    pub unit_cost: Decimal,
    /// Item quantity right after this movement was applied
    pub balance_after: Decimal,
    pub movement_date: NaiveDate,
    pub reference: Option<DocumentRef>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    pub fn signed_quantity(&self) -> Decimal {
        match self.direction {
            MovementDirection::In => self.quantity,
            MovementDirection::Out => -self.quantity,
        }
    }
}

/// A quantity change handed to the store, applied atomically with its movement
#[derive(Debug, Clone, PartialEq)]
pub struct StockChange {
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub movement_type: MovementType,
    pub delta: Decimal,
    pub unit_cost: Decimal,
    pub movement_date: NaiveDate,
    pub reference: Option<DocumentRef>,
    pub reason: Option<String>,
}

/// Severity of a low-stock finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    /// Zero on hand
    OutOfStock,
    Low,
}

/// An item at or below its reorder level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockItem {
    pub item: InventoryItem,
    pub level: StockLevel,
    /// `current_quantity / reorder_level`, zero when the reorder level is zero
    pub stock_ratio: Decimal,
}

/// Inventory valuation across a scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryValuation {
    pub item_count: usize,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}
