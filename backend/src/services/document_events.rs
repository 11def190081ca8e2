//! Document lifecycle transitions and their ledger side effects
//!
//! The document transition is the primary operation and its errors reach the
//! caller. The stock movements and the financial record derived from it are
//! independent side effects: each one either commits, is skipped, or fails
//! and is reported in the outcome without undoing anything else.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    Actor, FinancialRecord, InventoryItem, InventoryMovement, Invoice, MovementType,
    PaymentData, PurchaseOrder,
};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::services::financial::FinancialLedger;
use crate::services::inventory::{InventoryLedger, LineAdjustments, LineFailure};
use crate::store::LedgerStore;

/// How a best-effort side effect ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SideEffect {
    Committed,
    /// Nothing to do, or already done by an earlier run
    Skipped { reason: String },
    Failed { error: String },
}

impl SideEffect {
    pub fn is_committed(&self) -> bool {
        matches!(self, SideEffect::Committed)
    }
}

/// Result of a document transition
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome<D> {
    /// The document after the transition
    pub document: D,
    pub inventory: SideEffect,
    pub financial: SideEffect,
    pub movements: Vec<InventoryMovement>,
    pub line_failures: Vec<LineFailure>,
    pub financial_record: Option<FinancialRecord>,
}

/// Coordinates the inventory and financial ledgers around document transitions
#[derive(Clone)]
pub struct DocumentEventBridge {
    store: Arc<dyn LedgerStore>,
    inventory: InventoryLedger,
    financial: FinancialLedger,
    sales_category_id: Option<Uuid>,
    purchases_category_id: Option<Uuid>,
    payments_category_id: Option<Uuid>,
}

impl DocumentEventBridge {
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            inventory: InventoryLedger::new(store.clone()),
            financial: FinancialLedger::new(store.clone()),
            store,
            sales_category_id: config.sales_category_id,
            purchases_category_id: config.purchases_category_id,
            payments_category_id: config.payments_category_id,
        }
    }

    /// Mark a purchase order received, then book its stock and its expense
    pub async fn receive_purchase_order(
        &self,
        po_id: Uuid,
        delivery_date: NaiveDate,
        actor: &Actor,
    ) -> AppResult<TransitionOutcome<PurchaseOrder>> {
        let po = self
            .store
            .find_purchase_order(po_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;
        if !actor.can_access(po.user_id) {
            return Err(AppError::Forbidden(
                "Purchase order belongs to another user".to_string(),
            ));
        }

        let po = self
            .store
            .mark_purchase_order_received(po_id, delivery_date)
            .await?;
        tracing::info!(purchase_order_id = %po.id, po_number = %po.po_number, "Purchase order received");

        let lines = self
            .inventory
            .adjust_from_purchase_order_lines(&po.lines, po.id, delivery_date, actor)
            .await;

        let financial = self
            .financial
            .create_from_purchase_order(po.id, actor, self.purchases_category_id)
            .await;

        Ok(outcome(po, lines, financial))
    }

    /// Issue a draft invoice, then book its sold stock and its income
    pub async fn issue_invoice(
        &self,
        invoice_id: Uuid,
        actor: &Actor,
    ) -> AppResult<TransitionOutcome<Invoice>> {
        let invoice = self
            .store
            .find_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;
        if !actor.can_access(invoice.user_id) {
            return Err(AppError::Forbidden(
                "Invoice belongs to another user".to_string(),
            ));
        }

        let invoice = self.store.mark_invoice_sent(invoice_id).await?;
        tracing::info!(invoice_id = %invoice.id, invoice_number = %invoice.invoice_number, "Invoice issued");

        let lines = self
            .inventory
            .adjust_from_invoice_lines(&invoice.lines, invoice.id, invoice.invoice_date, actor)
            .await;

        let financial = self
            .financial
            .create_from_invoice(invoice.id, actor, self.sales_category_id)
            .await;

        Ok(outcome(invoice, lines, financial))
    }

    /// Direct stock correction; errors go straight to the caller
    pub async fn record_manual_adjustment(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        movement_type: MovementType,
        reason: Option<String>,
        actor: &Actor,
    ) -> AppResult<(InventoryItem, InventoryMovement)> {
        self.inventory
            .adjust_quantity(item_id, quantity, movement_type, reason, actor)
            .await
    }

    /// Payment against an issued invoice, booked under the payments category
    pub async fn record_invoice_payment(
        &self,
        invoice_id: Uuid,
        payment: PaymentData,
        actor: &Actor,
    ) -> AppResult<(Invoice, FinancialRecord)> {
        let category_id = self.payments_category_id.or(self.sales_category_id);
        self.financial
            .create_payment_record(invoice_id, payment, actor, category_id)
            .await
    }
}

fn outcome<D>(
    document: D,
    lines: LineAdjustments,
    financial: AppResult<FinancialRecord>,
) -> TransitionOutcome<D> {
    let inventory = inventory_effect(&lines);

    let (financial, financial_record) = match financial {
        Ok(record) => (SideEffect::Committed, Some(record)),
        Err(AppError::DuplicateEntry(_)) => (
            SideEffect::Skipped {
                reason: "Financial record already exists".to_string(),
            },
            None,
        ),
        Err(err) => {
            tracing::warn!(code = err.code(), "Financial side effect failed: {}", err);
            (
                SideEffect::Failed {
                    error: err.to_string(),
                },
                None,
            )
        }
    };

    TransitionOutcome {
        document,
        inventory,
        financial,
        movements: lines.movements,
        line_failures: lines.failures,
        financial_record,
    }
}

fn inventory_effect(lines: &LineAdjustments) -> SideEffect {
    if lines.is_empty() {
        return SideEffect::Skipped {
            reason: "No inventory lines".to_string(),
        };
    }

    if !lines.failures.is_empty() {
        let error = lines
            .failures
            .iter()
            .map(|f| format!("line {}: {}", f.line_no, f.error))
            .collect::<Vec<_>>()
            .join("; ");
        return SideEffect::Failed { error };
    }

    if lines.movements.is_empty() {
        SideEffect::Skipped {
            reason: "Stock movements already recorded".to_string(),
        }
    } else {
        SideEffect::Committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(line_no: i32) -> LineFailure {
        LineFailure {
            line_no,
            item_id: Uuid::nil(),
            code: "INSUFFICIENT_STOCK".to_string(),
            error: "Insufficient stock".to_string(),
        }
    }

    #[test]
    fn test_no_stock_lines_is_skipped() {
        assert!(matches!(
            inventory_effect(&LineAdjustments::default()),
            SideEffect::Skipped { .. }
        ));
    }

    #[test]
    fn test_any_failed_line_fails_the_effect() {
        let lines = LineAdjustments {
            movements: Vec::new(),
            duplicates: vec![1],
            failures: vec![failure(2), failure(3)],
        };

        match inventory_effect(&lines) {
            SideEffect::Failed { error } => {
                assert!(error.contains("line 2"));
                assert!(error.contains("line 3"));
            }
            other => panic!("unexpected effect: {other:?}"),
        }
    }

    #[test]
    fn test_only_duplicates_is_skipped() {
        let lines = LineAdjustments {
            movements: Vec::new(),
            duplicates: vec![1, 2],
            failures: Vec::new(),
        };
        assert!(matches!(inventory_effect(&lines), SideEffect::Skipped { .. }));
    }

    #[test]
    fn test_duplicate_financial_record_is_skipped() {
        let result = outcome(
            (),
            LineAdjustments::default(),
            Err(AppError::DuplicateEntry("Financial record".into())),
        );
        assert!(matches!(result.financial, SideEffect::Skipped { .. }));
        assert!(result.financial_record.is_none());
    }
}
