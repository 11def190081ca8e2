//! Persistence seam for the ledger core
//!
//! Services receive an `Arc<dyn LedgerStore>` at construction time. Compound
//! writes (`apply_stock_change`, `record_invoice_payment`) are a single unit
//! of work in every implementation: either all of their effects are stored
//! or none are.

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{
    DateRange, FinancialRecord, InventoryItem, InventoryMovement, Invoice, MaintenanceRecord,
    NewFinancialRecord, PaymentData, PurchaseOrder, RecordOrigin, RecordSource, Scope,
    StockChange, TaskRecord,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Fields of a new inventory item as handed to the store
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub user_id: Uuid,
    pub name: String,
    pub code: String,
    pub unit: String,
    pub initial_quantity: Decimal,
    pub reorder_level: Decimal,
    pub unit_cost: Decimal,
    pub selling_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------

    async fn insert_item(&self, item: NewInventoryItem) -> AppResult<InventoryItem>;

    async fn find_item(&self, item_id: Uuid) -> AppResult<Option<InventoryItem>>;

    /// Active items visible in `scope`
    async fn list_items(&self, scope: Scope) -> AppResult<Vec<InventoryItem>>;

    /// Soft delete; returns the deactivated item
    async fn deactivate_item(&self, item_id: Uuid) -> AppResult<InventoryItem>;

    /// Apply `change.delta` to the item and append the movement as one unit.
    ///
    /// Fails with `NotFound` for unknown or inactive items,
    /// `InsufficientStock` when the result would be negative and
    /// `DuplicateEntry` when a movement with the same document reference and
    /// type already exists. Nothing is written on failure.
    async fn apply_stock_change(
        &self,
        change: StockChange,
    ) -> AppResult<(InventoryItem, InventoryMovement)>;

    /// Movements of one item, newest first
    async fn list_movements(&self, item_id: Uuid) -> AppResult<Vec<InventoryMovement>>;

    // ------------------------------------------------------------------
    // Financial records
    // ------------------------------------------------------------------

    /// Fails with `DuplicateEntry` when a record of the same document
    /// origin already exists for the source document
    async fn insert_financial_record(
        &self,
        record: NewFinancialRecord,
    ) -> AppResult<FinancialRecord>;

    async fn records_by_source(
        &self,
        source: RecordSource,
        scope: Scope,
    ) -> AppResult<Vec<FinancialRecord>>;

    async fn records_in_range(
        &self,
        range: DateRange,
        scope: Scope,
    ) -> AppResult<Vec<FinancialRecord>>;

    /// Record derived from a document, if any (`origin` is `Invoice` or `PurchaseOrder`)
    async fn find_derived_record(
        &self,
        origin: RecordOrigin,
        document_id: Uuid,
    ) -> AppResult<Option<FinancialRecord>>;

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    async fn find_invoice(&self, invoice_id: Uuid) -> AppResult<Option<Invoice>>;

    async fn find_purchase_order(&self, po_id: Uuid) -> AppResult<Option<PurchaseOrder>>;

    /// `draft -> sent`
    async fn mark_invoice_sent(&self, invoice_id: Uuid) -> AppResult<Invoice>;

    /// `sent | confirmed -> received`, stamping the delivery date
    async fn mark_purchase_order_received(
        &self,
        po_id: Uuid,
        delivery_date: NaiveDate,
    ) -> AppResult<PurchaseOrder>;

    /// Add the payment to the invoice and insert its income record as one unit.
    ///
    /// The invoice becomes `paid` once `amount_paid` reaches the total and
    /// `partially_paid` before that. Payments that would exceed the total or
    /// target an invoice that does not accept payments are rejected.
    async fn record_invoice_payment(
        &self,
        invoice_id: Uuid,
        payment: &PaymentData,
        record: NewFinancialRecord,
    ) -> AppResult<(Invoice, FinancialRecord)>;

    // ------------------------------------------------------------------
    // Operations (read sources for alerts)
    // ------------------------------------------------------------------

    /// Maintenance not yet completed
    async fn open_maintenance(&self, scope: Scope) -> AppResult<Vec<MaintenanceRecord>>;

    /// Tasks pending or in progress
    async fn open_tasks(&self, scope: Scope) -> AppResult<Vec<TaskRecord>>;

    /// Connectivity probe
    async fn ping(&self) -> AppResult<()>;
}

/// Why a payment could not be applied to `invoice`
pub(crate) fn payment_rejection(invoice: &Invoice, amount: Decimal) -> AppError {
    if !invoice.status.accepts_payment() {
        AppError::InvalidStateTransition(format!(
            "Invoice {} does not accept payments in status {}",
            invoice.invoice_number,
            invoice.status.as_str()
        ))
    } else {
        AppError::validation(format!(
            "Payment of {} exceeds the outstanding balance of {}",
            amount,
            invoice.outstanding()
        ))
    }
}
