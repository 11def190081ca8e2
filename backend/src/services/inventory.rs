//! Inventory ledger: the only writer of item quantities
//!
//! Every quantity change goes through the store's atomic stock change, which
//! applies the delta and appends exactly one movement, or does nothing.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    round_currency, validate_inventory_item, validate_movement_quantity, validate_unit_cost,
    Actor, CreateItemInput, DocumentLine, DocumentRef, InventoryItem, InventoryMovement,
    InventoryValuation, LowStockItem, MovementType, Scope, StockChange, StockLevel,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, NewInventoryItem};

/// Inventory ledger service
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn LedgerStore>,
}

/// Input for a movement recorded by a document or an API caller
#[derive(Debug, Clone, Deserialize)]
pub struct MovementInput {
    pub movement_type: MovementType,
    /// Positive magnitude for directional types, signed delta for adjustments
    pub quantity: Decimal,
    /// Defaults to the item's current unit cost
    pub unit_cost: Option<Decimal>,
    pub reference: Option<DocumentRef>,
    /// Defaults to today
    pub movement_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A document line whose stock movement could not be recorded
#[derive(Debug, Clone, Serialize)]
pub struct LineFailure {
    pub line_no: i32,
    pub item_id: Uuid,
    pub code: String,
    pub error: String,
}

/// Result of applying the stock lines of one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineAdjustments {
    pub movements: Vec<InventoryMovement>,
    /// Lines already recorded by an earlier run
    pub duplicates: Vec<i32>,
    pub failures: Vec<LineFailure>,
}

impl LineAdjustments {
    /// True when the document had no line referencing an inventory item
    pub fn is_empty(&self) -> bool {
        self.movements.is_empty() && self.duplicates.is_empty() && self.failures.is_empty()
    }
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Create an item owned by the actor
    pub async fn create_item(
        &self,
        input: CreateItemInput,
        actor: &Actor,
    ) -> AppResult<InventoryItem> {
        AppError::check(validate_inventory_item(&input))?;

        let item = self
            .store
            .insert_item(NewInventoryItem {
                user_id: actor.user_id,
                name: input.name.trim().to_string(),
                code: input.code.trim().to_string(),
                unit: input.unit.trim().to_string(),
                initial_quantity: input.initial_quantity,
                reorder_level: input.reorder_level,
                unit_cost: input.unit_cost,
                selling_price: input.selling_price,
                expiry_date: input.expiry_date,
                category_id: input.category_id,
            })
            .await?;

        tracing::info!(item_id = %item.id, code = %item.code, "Inventory item created");
        Ok(item)
    }

    pub async fn get_item(&self, item_id: Uuid, scope: Scope) -> AppResult<InventoryItem> {
        let item = self.find_item(item_id).await?;
        if !scope.includes(item.user_id) {
            return Err(AppError::Forbidden(
                "Inventory item belongs to another user".to_string(),
            ));
        }
        Ok(item)
    }

    /// Active items visible in `scope`, by name
    pub async fn list_items(&self, scope: Scope) -> AppResult<Vec<InventoryItem>> {
        self.store.list_items(scope).await
    }

    /// Soft delete: the item keeps its movement history but no longer moves
    pub async fn deactivate_item(&self, item_id: Uuid, actor: &Actor) -> AppResult<InventoryItem> {
        self.owned_item(item_id, actor).await?;
        let item = self.store.deactivate_item(item_id).await?;

        tracing::info!(item_id = %item_id, "Inventory item deactivated");
        Ok(item)
    }

    // ========================================================================
    // Movements
    // ========================================================================

    /// Change an item's quantity by a caller-supplied amount.
    ///
    /// Outbound types take a positive magnitude and are negated here; inbound
    /// types apply as-is; `ADJUSTMENT` takes a signed, non-zero delta.
    pub async fn adjust_quantity(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        movement_type: MovementType,
        reason: Option<String>,
        actor: &Actor,
    ) -> AppResult<(InventoryItem, InventoryMovement)> {
        self.process_movement(
            item_id,
            MovementInput {
                movement_type,
                quantity,
                unit_cost: None,
                reference: None,
                movement_date: None,
                notes: reason,
            },
            actor,
        )
        .await
    }

    /// General entry point for movements, with optional cost and document reference
    pub async fn process_movement(
        &self,
        item_id: Uuid,
        input: MovementInput,
        actor: &Actor,
    ) -> AppResult<(InventoryItem, InventoryMovement)> {
        let mut errors = validate_movement_quantity(input.movement_type, input.quantity);
        errors.extend(validate_unit_cost(input.unit_cost));
        AppError::check(errors)?;

        let delta = input
            .movement_type
            .signed_delta(input.quantity)
            .ok_or_else(|| AppError::validation("Invalid movement quantity"))?;

        let item = self.owned_item(item_id, actor).await?;

        let change = StockChange {
            item_id,
            user_id: actor.user_id,
            movement_type: input.movement_type,
            delta,
            unit_cost: input.unit_cost.unwrap_or(item.unit_cost),
            movement_date: input.movement_date.unwrap_or_else(|| Utc::now().date_naive()),
            reference: input.reference,
            reason: input.notes.filter(|n| !n.trim().is_empty()),
        };

        match self.store.apply_stock_change(change).await {
            Ok((item, movement)) => {
                tracing::info!(
                    item_id = %item.id,
                    movement_type = movement.movement_type.as_str(),
                    delta = %delta,
                    balance = %item.current_quantity,
                    "Inventory movement recorded"
                );
                Ok((item, movement))
            }
            Err(err) => {
                if let AppError::InsufficientStock { available, requested, .. } = &err {
                    tracing::warn!(
                        item_id = %item_id,
                        available = %available,
                        requested = %requested,
                        "Stock movement rejected"
                    );
                }
                Err(err)
            }
        }
    }

    /// `PURCHASE` movements for the stock lines of a received purchase order
    pub async fn adjust_from_purchase_order_lines(
        &self,
        lines: &[DocumentLine],
        po_id: Uuid,
        received_on: NaiveDate,
        actor: &Actor,
    ) -> LineAdjustments {
        self.adjust_from_lines(
            lines,
            MovementType::Purchase,
            DocumentRef::purchase_order(po_id),
            received_on,
            actor,
        )
        .await
    }

    /// `SALE` movements for the stock lines of an issued invoice
    pub async fn adjust_from_invoice_lines(
        &self,
        lines: &[DocumentLine],
        invoice_id: Uuid,
        invoice_date: NaiveDate,
        actor: &Actor,
    ) -> LineAdjustments {
        self.adjust_from_lines(
            lines,
            MovementType::Sale,
            DocumentRef::invoice(invoice_id),
            invoice_date,
            actor,
        )
        .await
    }

    /// Lines are independent: a failed line is logged and reported, the rest still apply
    async fn adjust_from_lines(
        &self,
        lines: &[DocumentLine],
        movement_type: MovementType,
        document: DocumentRef,
        movement_date: NaiveDate,
        actor: &Actor,
    ) -> LineAdjustments {
        let mut result = LineAdjustments::default();

        for line in lines {
            let Some(item_id) = line.inventory_item_id else {
                continue;
            };

            // Purchases carry their own cost; sales are valued at the item's cost
            let unit_cost = match movement_type {
                MovementType::Purchase => Some(line.unit_price),
                _ => None,
            };

            let input = MovementInput {
                movement_type,
                quantity: line.quantity,
                unit_cost,
                reference: Some(document.with_line(line.line_no)),
                movement_date: Some(movement_date),
                notes: Some(line.description.clone()),
            };

            match self.process_movement(item_id, input, actor).await {
                Ok((_, movement)) => result.movements.push(movement),
                Err(AppError::DuplicateEntry(_)) => {
                    tracing::debug!(document = %document, line_no = line.line_no, "Line already recorded");
                    result.duplicates.push(line.line_no);
                }
                Err(err) => {
                    tracing::warn!(
                        document = %document,
                        line_no = line.line_no,
                        item_id = %item_id,
                        "Failed to record stock line: {}",
                        err
                    );
                    result.failures.push(LineFailure {
                        line_no: line.line_no,
                        item_id,
                        code: err.code().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        result
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Active items at or below their reorder level, most depleted first
    pub async fn get_low_stock_items(&self, scope: Scope) -> AppResult<Vec<LowStockItem>> {
        let mut low: Vec<LowStockItem> = self
            .store
            .list_items(scope)
            .await?
            .into_iter()
            .filter(InventoryItem::is_low_stock)
            .map(|item| LowStockItem {
                level: if item.is_out_of_stock() {
                    StockLevel::OutOfStock
                } else {
                    StockLevel::Low
                },
                stock_ratio: stock_ratio(&item),
                item,
            })
            .collect();

        low.sort_by(|a, b| a.stock_ratio.cmp(&b.stock_ratio));
        Ok(low)
    }

    /// Movements of an item, newest first
    pub async fn get_movement_history(
        &self,
        item_id: Uuid,
        scope: Scope,
    ) -> AppResult<Vec<InventoryMovement>> {
        self.get_item(item_id, scope).await?;
        self.store.list_movements(item_id).await
    }

    /// Quantity and value on hand across the active items in `scope`
    pub async fn get_valuation(&self, scope: Scope) -> AppResult<InventoryValuation> {
        let items = self.store.list_items(scope).await?;

        let total_quantity = items.iter().map(|i| i.current_quantity).sum::<Decimal>();
        let total_value = items
            .iter()
            .map(|i| i.current_quantity * i.unit_cost)
            .sum::<Decimal>();

        Ok(InventoryValuation {
            item_count: items.len(),
            total_quantity,
            total_value: round_currency(total_value),
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn find_item(&self, item_id: Uuid) -> AppResult<InventoryItem> {
        self.store
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    async fn owned_item(&self, item_id: Uuid, actor: &Actor) -> AppResult<InventoryItem> {
        let item = self.find_item(item_id).await?;
        if !actor.can_access(item.user_id) {
            return Err(AppError::Forbidden(
                "Inventory item belongs to another user".to_string(),
            ));
        }
        Ok(item)
    }
}

/// `current / reorder`, zero when no reorder level is set
fn stock_ratio(item: &InventoryItem) -> Decimal {
    if item.reorder_level.is_zero() {
        return Decimal::ZERO;
    }
    item.current_quantity
        .checked_div(item.reorder_level)
        .unwrap_or(Decimal::ZERO)
}
