//! In-memory ledger store
//!
//! Intended for tests and local development. Every operation runs under a
//! single write lock, so check-and-write sequences are atomic.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    DateRange, FinancialRecord, InventoryItem, InventoryMovement, Invoice, InvoiceStatus,
    MaintenanceRecord, MovementDirection, NewFinancialRecord, PaymentData, PurchaseOrder,
    PurchaseOrderStatus, RecordOrigin, RecordSource, Scope, StockChange, TaskRecord,
};
use uuid::Uuid;

use super::{payment_rejection, LedgerStore, NewInventoryItem};
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
struct State {
    items: HashMap<Uuid, InventoryItem>,
    /// Append order
    movements: Vec<InventoryMovement>,
    records: Vec<FinancialRecord>,
    invoices: HashMap<Uuid, Invoice>,
    purchase_orders: HashMap<Uuid, PurchaseOrder>,
    maintenance: Vec<MaintenanceRecord>,
    tasks: Vec<TaskRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: RwLock<State>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("ledger store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| AppError::Internal("ledger store lock poisoned".to_string()))
    }

    // Documents, maintenance and tasks are owned elsewhere; these seed them.

    pub fn insert_invoice(&self, invoice: Invoice) -> AppResult<()> {
        self.write()?.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    pub fn insert_purchase_order(&self, po: PurchaseOrder) -> AppResult<()> {
        self.write()?.purchase_orders.insert(po.id, po);
        Ok(())
    }

    pub fn insert_maintenance(&self, record: MaintenanceRecord) -> AppResult<()> {
        self.write()?.maintenance.push(record);
        Ok(())
    }

    pub fn insert_task(&self, task: TaskRecord) -> AppResult<()> {
        self.write()?.tasks.push(task);
        Ok(())
    }
}

fn materialize(record: NewFinancialRecord) -> AppResult<FinancialRecord> {
    let category_id = record
        .category_id
        .ok_or_else(|| AppError::validation("Category is required"))?;

    Ok(FinancialRecord {
        id: Uuid::new_v4(),
        user_id: record.user_id,
        transaction_type: record.transaction_type,
        amount: record.amount,
        category_id,
        transaction_date: record.transaction_date,
        description: record.description,
        reference_number: record.reference_number,
        customer_id: record.customer_id,
        supplier_id: record.supplier_id,
        invoice_id: record.invoice_id,
        purchase_order_id: record.purchase_order_id,
        origin: record.origin,
        created_at: Utc::now(),
    })
}

impl State {
    /// Mirrors the partial unique indexes on derived records
    fn check_derived_unique(&self, record: &FinancialRecord) -> AppResult<()> {
        let clash = match record.origin {
            RecordOrigin::Invoice => self.records.iter().any(|r| {
                r.origin == RecordOrigin::Invoice && r.invoice_id == record.invoice_id
            }),
            RecordOrigin::PurchaseOrder => self.records.iter().any(|r| {
                r.origin == RecordOrigin::PurchaseOrder
                    && r.purchase_order_id == record.purchase_order_id
            }),
            RecordOrigin::Manual | RecordOrigin::Payment => false,
        };

        if clash {
            return Err(AppError::DuplicateEntry(format!(
                "Financial record for {}",
                record.origin.as_str().replace('_', " ")
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_item(&self, item: NewInventoryItem) -> AppResult<InventoryItem> {
        let mut state = self.write()?;

        if state
            .items
            .values()
            .any(|i| i.user_id == item.user_id && i.code == item.code)
        {
            return Err(AppError::DuplicateEntry(format!("Item code '{}'", item.code)));
        }

        let now = Utc::now();
        let created = InventoryItem {
            id: Uuid::new_v4(),
            user_id: item.user_id,
            name: item.name,
            code: item.code,
            unit: item.unit,
            current_quantity: item.initial_quantity,
            reorder_level: item.reorder_level,
            unit_cost: item.unit_cost,
            selling_price: item.selling_price,
            expiry_date: item.expiry_date,
            category_id: item.category_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_item(&self, item_id: Uuid) -> AppResult<Option<InventoryItem>> {
        Ok(self.read()?.items.get(&item_id).cloned())
    }

    async fn list_items(&self, scope: Scope) -> AppResult<Vec<InventoryItem>> {
        let mut items: Vec<InventoryItem> = self
            .read()?
            .items
            .values()
            .filter(|i| i.is_active && scope.includes(i.user_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn deactivate_item(&self, item_id: Uuid) -> AppResult<InventoryItem> {
        let mut state = self.write()?;
        let item = state
            .items
            .get_mut(&item_id)
            .filter(|i| i.is_active)
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        item.is_active = false;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn apply_stock_change(
        &self,
        change: StockChange,
    ) -> AppResult<(InventoryItem, InventoryMovement)> {
        let mut state = self.write()?;

        let current = match state.items.get(&change.item_id) {
            Some(item) if item.is_active => item.current_quantity,
            _ => return Err(AppError::NotFound("Inventory item".to_string())),
        };

        // A replayed line is a duplicate whatever the stock is now
        if let Some(reference) = change.reference {
            let duplicate = state.movements.iter().any(|m| {
                m.item_id == change.item_id
                    && m.movement_type == change.movement_type
                    && m.reference == Some(reference)
            });
            if duplicate {
                return Err(AppError::DuplicateEntry(format!(
                    "{} movement for {}",
                    change.movement_type, reference
                )));
            }
        }

        let balance_after = current + change.delta;
        if balance_after < Decimal::ZERO {
            return Err(AppError::InsufficientStock {
                item_id: change.item_id,
                available: current,
                requested: change.delta.abs(),
            });
        }

        let now = Utc::now();
        let movement = InventoryMovement {
            id: Uuid::new_v4(),
            item_id: change.item_id,
            user_id: change.user_id,
            movement_type: change.movement_type,
            quantity: change.delta.abs(),
            direction: MovementDirection::of_delta(change.delta),
            unit_cost: change.unit_cost,
            balance_after,
            movement_date: change.movement_date,
            reference: change.reference,
            reason: change.reason,
            created_at: now,
        };

        let item = state
            .items
            .get_mut(&change.item_id)
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;
        item.current_quantity = balance_after;
        item.updated_at = now;
        let item = item.clone();

        state.movements.push(movement.clone());
        Ok((item, movement))
    }

    async fn list_movements(&self, item_id: Uuid) -> AppResult<Vec<InventoryMovement>> {
        let mut movements: Vec<InventoryMovement> = self
            .read()?
            .movements
            .iter()
            .rev()
            .filter(|m| m.item_id == item_id)
            .cloned()
            .collect();
        // Stable sort keeps newest-first among movements on the same date
        movements.sort_by(|a, b| b.movement_date.cmp(&a.movement_date));
        Ok(movements)
    }

    async fn insert_financial_record(
        &self,
        record: NewFinancialRecord,
    ) -> AppResult<FinancialRecord> {
        let mut state = self.write()?;
        let created = materialize(record)?;
        state.check_derived_unique(&created)?;
        state.records.push(created.clone());
        Ok(created)
    }

    async fn records_by_source(
        &self,
        source: RecordSource,
        scope: Scope,
    ) -> AppResult<Vec<FinancialRecord>> {
        let mut records: Vec<FinancialRecord> = self
            .read()?
            .records
            .iter()
            .rev()
            .filter(|r| source.matches(r) && scope.includes(r.user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(records)
    }

    async fn records_in_range(
        &self,
        range: DateRange,
        scope: Scope,
    ) -> AppResult<Vec<FinancialRecord>> {
        let mut records: Vec<FinancialRecord> = self
            .read()?
            .records
            .iter()
            .filter(|r| range.contains(r.transaction_date) && scope.includes(r.user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.transaction_date.cmp(&b.transaction_date));
        Ok(records)
    }

    async fn find_derived_record(
        &self,
        origin: RecordOrigin,
        document_id: Uuid,
    ) -> AppResult<Option<FinancialRecord>> {
        let state = self.read()?;
        let found = state.records.iter().find(|r| {
            r.origin == origin
                && match origin {
                    RecordOrigin::Invoice => r.invoice_id == Some(document_id),
                    RecordOrigin::PurchaseOrder => r.purchase_order_id == Some(document_id),
                    RecordOrigin::Manual | RecordOrigin::Payment => false,
                }
        });
        Ok(found.cloned())
    }

    async fn find_invoice(&self, invoice_id: Uuid) -> AppResult<Option<Invoice>> {
        Ok(self.read()?.invoices.get(&invoice_id).cloned())
    }

    async fn find_purchase_order(&self, po_id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        Ok(self.read()?.purchase_orders.get(&po_id).cloned())
    }

    async fn mark_invoice_sent(&self, invoice_id: Uuid) -> AppResult<Invoice> {
        let mut state = self.write()?;
        let invoice = state
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        if invoice.status != InvoiceStatus::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Invoice {} cannot be issued from status {}",
                invoice.invoice_number,
                invoice.status.as_str()
            )));
        }

        invoice.status = InvoiceStatus::Sent;
        Ok(invoice.clone())
    }

    async fn mark_purchase_order_received(
        &self,
        po_id: Uuid,
        delivery_date: NaiveDate,
    ) -> AppResult<PurchaseOrder> {
        let mut state = self.write()?;
        let po = state
            .purchase_orders
            .get_mut(&po_id)
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        if !po.status.can_receive() {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order {} cannot be received from status {}",
                po.po_number,
                po.status.as_str()
            )));
        }

        po.status = PurchaseOrderStatus::Received;
        po.actual_delivery_date = Some(delivery_date);
        Ok(po.clone())
    }

    async fn record_invoice_payment(
        &self,
        invoice_id: Uuid,
        payment: &PaymentData,
        record: NewFinancialRecord,
    ) -> AppResult<(Invoice, FinancialRecord)> {
        let mut state = self.write()?;
        let created = materialize(record)?;

        let invoice = state
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let paid = invoice.amount_paid + payment.amount;
        if !invoice.status.accepts_payment() || paid > invoice.total_amount {
            return Err(payment_rejection(invoice, payment.amount));
        }

        invoice.amount_paid = paid;
        invoice.status = if paid >= invoice.total_amount {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        invoice.payment_date = Some(payment.payment_date);
        invoice.payment_method = Some(payment.payment_method.clone());
        let invoice = invoice.clone();

        state.records.push(created.clone());
        Ok((invoice, created))
    }

    async fn open_maintenance(&self, scope: Scope) -> AppResult<Vec<MaintenanceRecord>> {
        Ok(self
            .read()?
            .maintenance
            .iter()
            .filter(|m| m.completed_date.is_none() && scope.includes(m.user_id))
            .cloned()
            .collect())
    }

    async fn open_tasks(&self, scope: Scope) -> AppResult<Vec<TaskRecord>> {
        Ok(self
            .read()?
            .tasks
            .iter()
            .filter(|t| t.status.is_open() && scope.includes(t.user_id))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        self.read().map(|_| ())
    }
}
