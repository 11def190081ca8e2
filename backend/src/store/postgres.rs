//! PostgreSQL implementation of the ledger store
//!
//! Enum columns are stored as text and parsed back through the shared
//! `from_str` helpers; an unknown value is reported as an internal error.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    DateRange, DocumentKind, DocumentLine, DocumentRef, FinancialRecord, InventoryItem,
    InventoryMovement, Invoice, InvoiceStatus, MaintenanceRecord, MovementDirection,
    MovementType, NewFinancialRecord, PaymentData, PurchaseOrder, PurchaseOrderStatus,
    RecordOrigin, RecordSource, Scope, StockChange, TaskPriority, TaskRecord, TaskStatus,
    TransactionType,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{payment_rejection, LedgerStore, NewInventoryItem};
use crate::error::{AppError, AppResult};

const ITEM_COLUMNS: &str = "id, user_id, name, code, unit, current_quantity, reorder_level, \
    unit_cost, selling_price, expiry_date, category_id, is_active, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, item_id, user_id, movement_type, quantity, direction, \
    unit_cost, balance_after, movement_date, reference_type, reference_id, reference_line, \
    reason, created_at";

const RECORD_COLUMNS: &str = "id, user_id, transaction_type, amount, category_id, \
    transaction_date, description, reference_number, customer_id, supplier_id, invoice_id, \
    purchase_order_id, origin, created_at";

const INVOICE_COLUMNS: &str = "id, user_id, invoice_number, customer_id, status, invoice_date, \
    due_date, subtotal, tax_rate, total_amount, amount_paid, payment_date, payment_method, \
    created_at";

const PURCHASE_ORDER_COLUMNS: &str = "id, user_id, po_number, supplier_id, status, order_date, \
    expected_delivery_date, actual_delivery_date, subtotal, tax_rate, total_amount, created_at";

/// Ledger store backed by a Postgres pool
#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
}

impl PgLedgerStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    code: String,
    unit: String,
    current_quantity: Decimal,
    reorder_level: Decimal,
    unit_cost: Decimal,
    selling_price: Decimal,
    expiry_date: Option<NaiveDate>,
    category_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for InventoryItem {
    fn from(row: ItemRow) -> Self {
        InventoryItem {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            code: row.code,
            unit: row.unit,
            current_quantity: row.current_quantity,
            reorder_level: row.reorder_level,
            unit_cost: row.unit_cost,
            selling_price: row.selling_price,
            expiry_date: row.expiry_date,
            category_id: row.category_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    item_id: Uuid,
    user_id: Uuid,
    movement_type: String,
    quantity: Decimal,
    direction: String,
    unit_cost: Decimal,
    balance_after: Decimal,
    movement_date: NaiveDate,
    reference_type: Option<String>,
    reference_id: Option<Uuid>,
    reference_line: Option<i32>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        let reference = match (row.reference_type.as_deref(), row.reference_id) {
            (Some(kind), Some(id)) => Some(DocumentRef {
                kind: parse_column("reference_type", kind, DocumentKind::from_str)?,
                id,
                line_no: row.reference_line,
            }),
            _ => None,
        };

        Ok(InventoryMovement {
            id: row.id,
            item_id: row.item_id,
            user_id: row.user_id,
            movement_type: parse_column("movement_type", &row.movement_type, MovementType::from_str)?,
            quantity: row.quantity,
            direction: parse_column("direction", &row.direction, MovementDirection::from_str)?,
            unit_cost: row.unit_cost,
            balance_after: row.balance_after,
            movement_date: row.movement_date,
            reference,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RecordRow {
    id: Uuid,
    user_id: Uuid,
    transaction_type: String,
    amount: Decimal,
    category_id: Uuid,
    transaction_date: NaiveDate,
    description: String,
    reference_number: Option<String>,
    customer_id: Option<Uuid>,
    supplier_id: Option<Uuid>,
    invoice_id: Option<Uuid>,
    purchase_order_id: Option<Uuid>,
    origin: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for FinancialRecord {
    type Error = AppError;

    fn try_from(row: RecordRow) -> AppResult<Self> {
        Ok(FinancialRecord {
            id: row.id,
            user_id: row.user_id,
            transaction_type: parse_column(
                "transaction_type",
                &row.transaction_type,
                TransactionType::from_str,
            )?,
            amount: row.amount,
            category_id: row.category_id,
            transaction_date: row.transaction_date,
            description: row.description,
            reference_number: row.reference_number,
            customer_id: row.customer_id,
            supplier_id: row.supplier_id,
            invoice_id: row.invoice_id,
            purchase_order_id: row.purchase_order_id,
            origin: parse_column("origin", &row.origin, RecordOrigin::from_str)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    user_id: Uuid,
    invoice_number: String,
    customer_id: Uuid,
    status: String,
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    subtotal: Decimal,
    tax_rate: Decimal,
    total_amount: Decimal,
    amount_paid: Decimal,
    payment_date: Option<NaiveDate>,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, lines: Vec<DocumentLine>) -> AppResult<Invoice> {
        Ok(Invoice {
            id: self.id,
            user_id: self.user_id,
            invoice_number: self.invoice_number,
            customer_id: self.customer_id,
            status: parse_column("status", &self.status, InvoiceStatus::from_str)?,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            subtotal: self.subtotal,
            tax_rate: self.tax_rate,
            total_amount: self.total_amount,
            amount_paid: self.amount_paid,
            payment_date: self.payment_date,
            payment_method: self.payment_method,
            lines,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    user_id: Uuid,
    po_number: String,
    supplier_id: Uuid,
    status: String,
    order_date: NaiveDate,
    expected_delivery_date: Option<NaiveDate>,
    actual_delivery_date: Option<NaiveDate>,
    subtotal: Decimal,
    tax_rate: Decimal,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
}

impl PurchaseOrderRow {
    fn into_purchase_order(self, lines: Vec<DocumentLine>) -> AppResult<PurchaseOrder> {
        Ok(PurchaseOrder {
            id: self.id,
            user_id: self.user_id,
            po_number: self.po_number,
            supplier_id: self.supplier_id,
            status: parse_column("status", &self.status, PurchaseOrderStatus::from_str)?,
            order_date: self.order_date,
            expected_delivery_date: self.expected_delivery_date,
            actual_delivery_date: self.actual_delivery_date,
            subtotal: self.subtotal,
            tax_rate: self.tax_rate,
            total_amount: self.total_amount,
            lines,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    line_no: i32,
    inventory_item_id: Option<Uuid>,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
}

impl From<LineRow> for DocumentLine {
    fn from(row: LineRow) -> Self {
        DocumentLine {
            line_no: row.line_no,
            inventory_item_id: row.inventory_item_id,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct MaintenanceRow {
    id: Uuid,
    user_id: Uuid,
    asset_id: Uuid,
    asset_name: String,
    description: String,
    cost: Decimal,
    scheduled_date: NaiveDate,
    completed_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl From<MaintenanceRow> for MaintenanceRecord {
    fn from(row: MaintenanceRow) -> Self {
        MaintenanceRecord {
            id: row.id,
            user_id: row.user_id,
            asset_id: row.asset_id,
            asset_name: row.asset_name,
            description: row.description,
            cost: row.cost,
            scheduled_date: row.scheduled_date,
            completed_date: row.completed_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    priority: String,
    status: String,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = AppError;

    fn try_from(row: TaskRow) -> AppResult<Self> {
        Ok(TaskRecord {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            priority: parse_column("priority", &row.priority, TaskPriority::from_str)?,
            status: parse_column("status", &row.status, TaskStatus::from_str)?,
            due_date: row.due_date,
            created_at: row.created_at,
        })
    }
}

fn parse_column<T>(column: &str, value: &str, parse: fn(&str) -> Option<T>) -> AppResult<T> {
    parse(value).ok_or_else(|| {
        AppError::Internal(format!("Unexpected value '{}' in column {}", value, column))
    })
}

/// Map a unique violation to `DuplicateEntry`, everything else to `DatabaseError`
fn unique_as_duplicate(err: sqlx::Error, what: impl FnOnce() -> String) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateEntry(what())
        }
        other => AppError::DatabaseError(other),
    }
}

// ============================================================================
// Queries shared by several operations
// ============================================================================

impl PgLedgerStore {
    async fn invoice_lines(&self, invoice_id: Uuid) -> AppResult<Vec<DocumentLine>> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT line_no, inventory_item_id, description, quantity, unit_price
            FROM invoice_lines
            WHERE invoice_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DocumentLine::from).collect())
    }

    async fn purchase_order_lines(&self, po_id: Uuid) -> AppResult<Vec<DocumentLine>> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT line_no, inventory_item_id, description, quantity, unit_price
            FROM purchase_order_lines
            WHERE purchase_order_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(po_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DocumentLine::from).collect())
    }

    async fn insert_record_in(
        tx: &mut Transaction<'_, Postgres>,
        record: &NewFinancialRecord,
        category_id: Uuid,
    ) -> AppResult<FinancialRecord> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            INSERT INTO financial_records (
                user_id, transaction_type, amount, category_id, transaction_date, description,
                reference_number, customer_id, supplier_id, invoice_id, purchase_order_id, origin
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(record.user_id)
        .bind(record.transaction_type.as_str())
        .bind(record.amount)
        .bind(category_id)
        .bind(record.transaction_date)
        .bind(&record.description)
        .bind(&record.reference_number)
        .bind(record.customer_id)
        .bind(record.supplier_id)
        .bind(record.invoice_id)
        .bind(record.purchase_order_id)
        .bind(record.origin.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            unique_as_duplicate(e, || {
                format!("Financial record for {}", record.origin.as_str().replace('_', " "))
            })
        })?;

        row.try_into()
    }
}

fn required_category(record: &NewFinancialRecord) -> AppResult<Uuid> {
    record
        .category_id
        .ok_or_else(|| AppError::validation("Category is required"))
}

// ============================================================================
// LedgerStore
// ============================================================================

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn insert_item(&self, item: NewInventoryItem) -> AppResult<InventoryItem> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO inventory_items (
                user_id, name, code, unit, current_quantity, reorder_level,
                unit_cost, selling_price, expiry_date, category_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item.user_id)
        .bind(&item.name)
        .bind(&item.code)
        .bind(&item.unit)
        .bind(item.initial_quantity)
        .bind(item.reorder_level)
        .bind(item.unit_cost)
        .bind(item.selling_price)
        .bind(item.expiry_date)
        .bind(item.category_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| unique_as_duplicate(e, || format!("Item code '{}'", item.code)))?;

        Ok(row.into())
    }

    async fn find_item(&self, item_id: Uuid) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(InventoryItem::from))
    }

    async fn list_items(&self, scope: Scope) -> AppResult<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM inventory_items
            WHERE is_active AND ($1::uuid IS NULL OR user_id = $1)
            ORDER BY name
            "#
        ))
        .bind(scope.owner())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    async fn deactivate_item(&self, item_id: Uuid) -> AppResult<InventoryItem> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE inventory_items
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        Ok(row.into())
    }

    async fn apply_stock_change(
        &self,
        change: StockChange,
    ) -> AppResult<(InventoryItem, InventoryMovement)> {
        let mut tx = self.db.begin().await?;

        // A replayed line is a duplicate whatever the stock is now; the unique index settles races
        if let Some(reference) = change.reference {
            let recorded: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM inventory_movements
                    WHERE reference_type = $1 AND reference_id = $2
                      AND COALESCE(reference_line, -1) = COALESCE($3, -1)
                      AND movement_type = $4 AND item_id = $5
                )
                "#,
            )
            .bind(reference.kind.as_str())
            .bind(reference.id)
            .bind(reference.line_no)
            .bind(change.movement_type.as_str())
            .bind(change.item_id)
            .fetch_one(&mut *tx)
            .await?;

            if recorded {
                return Err(AppError::DuplicateEntry(format!(
                    "{} movement for {}",
                    change.movement_type, reference
                )));
            }
        }

        // Conditional update: the non-negativity check and the write are one statement
        let updated = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE inventory_items
            SET current_quantity = current_quantity + $1, updated_at = NOW()
            WHERE id = $2 AND is_active AND current_quantity + $1 >= 0
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(change.delta)
        .bind(change.item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let item: InventoryItem = match updated {
            Some(row) => row.into(),
            None => {
                let current = sqlx::query_as::<_, (Decimal, bool)>(
                    "SELECT current_quantity, is_active FROM inventory_items WHERE id = $1",
                )
                .bind(change.item_id)
                .fetch_optional(&mut *tx)
                .await?;

                return Err(match current {
                    Some((available, true)) => AppError::InsufficientStock {
                        item_id: change.item_id,
                        available,
                        requested: change.delta.abs(),
                    },
                    _ => AppError::NotFound("Inventory item".to_string()),
                });
            }
        };

        let reference = change.reference;
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO inventory_movements (
                item_id, user_id, movement_type, quantity, direction, unit_cost,
                balance_after, movement_date, reference_type, reference_id, reference_line, reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(change.item_id)
        .bind(change.user_id)
        .bind(change.movement_type.as_str())
        .bind(change.delta.abs())
        .bind(MovementDirection::of_delta(change.delta).as_str())
        .bind(change.unit_cost)
        .bind(item.current_quantity)
        .bind(change.movement_date)
        .bind(reference.map(|r| r.kind.as_str()))
        .bind(reference.map(|r| r.id))
        .bind(reference.and_then(|r| r.line_no))
        .bind(&change.reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            unique_as_duplicate(e, || match reference {
                Some(r) => format!("{} movement for {}", change.movement_type, r),
                None => format!("{} movement", change.movement_type),
            })
        })?;

        let movement = InventoryMovement::try_from(row)?;
        tx.commit().await?;

        Ok((item, movement))
    }

    async fn list_movements(&self, item_id: Uuid) -> AppResult<Vec<InventoryMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM inventory_movements
            WHERE item_id = $1
            ORDER BY movement_date DESC, created_at DESC
            "#
        ))
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(InventoryMovement::try_from).collect()
    }

    async fn insert_financial_record(
        &self,
        record: NewFinancialRecord,
    ) -> AppResult<FinancialRecord> {
        let category_id = required_category(&record)?;
        let mut tx = self.db.begin().await?;
        let created = Self::insert_record_in(&mut tx, &record, category_id).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn records_by_source(
        &self,
        source: RecordSource,
        scope: Scope,
    ) -> AppResult<Vec<FinancialRecord>> {
        let (column, id) = match source {
            RecordSource::Invoice(id) => ("invoice_id", id),
            RecordSource::PurchaseOrder(id) => ("purchase_order_id", id),
            RecordSource::Customer(id) => ("customer_id", id),
            RecordSource::Supplier(id) => ("supplier_id", id),
        };

        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM financial_records
            WHERE {column} = $1 AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY transaction_date DESC, created_at DESC
            "#
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(FinancialRecord::try_from).collect()
    }

    async fn records_in_range(
        &self,
        range: DateRange,
        scope: Scope,
    ) -> AppResult<Vec<FinancialRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM financial_records
            WHERE transaction_date BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR user_id = $3)
            ORDER BY transaction_date, created_at
            "#
        ))
        .bind(range.start)
        .bind(range.end)
        .bind(scope.owner())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(FinancialRecord::try_from).collect()
    }

    async fn find_derived_record(
        &self,
        origin: RecordOrigin,
        document_id: Uuid,
    ) -> AppResult<Option<FinancialRecord>> {
        let column = match origin {
            RecordOrigin::Invoice => "invoice_id",
            RecordOrigin::PurchaseOrder => "purchase_order_id",
            RecordOrigin::Manual | RecordOrigin::Payment => return Ok(None),
        };

        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM financial_records WHERE origin = $1 AND {column} = $2"
        ))
        .bind(origin.as_str())
        .bind(document_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(FinancialRecord::try_from).transpose()
    }

    async fn find_invoice(&self, invoice_id: Uuid) -> AppResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let lines = self.invoice_lines(invoice_id).await?;
                row.into_invoice(lines).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn find_purchase_order(&self, po_id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders WHERE id = $1"
        ))
        .bind(po_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let lines = self.purchase_order_lines(po_id).await?;
                row.into_purchase_order(lines).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn mark_invoice_sent(&self, invoice_id: Uuid) -> AppResult<Invoice> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
            SET status = 'sent', updated_at = NOW()
            WHERE id = $1 AND status = 'draft'
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let lines = self.invoice_lines(invoice_id).await?;
                row.into_invoice(lines)
            }
            None => Err(match self.find_invoice(invoice_id).await? {
                Some(invoice) => AppError::InvalidStateTransition(format!(
                    "Invoice {} cannot be issued from status {}",
                    invoice.invoice_number,
                    invoice.status.as_str()
                )),
                None => AppError::NotFound("Invoice".to_string()),
            }),
        }
    }

    async fn mark_purchase_order_received(
        &self,
        po_id: Uuid,
        delivery_date: NaiveDate,
    ) -> AppResult<PurchaseOrder> {
        let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            r#"
            UPDATE purchase_orders
            SET status = 'received', actual_delivery_date = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('sent', 'confirmed')
            RETURNING {PURCHASE_ORDER_COLUMNS}
            "#
        ))
        .bind(po_id)
        .bind(delivery_date)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let lines = self.purchase_order_lines(po_id).await?;
                row.into_purchase_order(lines)
            }
            None => Err(match self.find_purchase_order(po_id).await? {
                Some(po) => AppError::InvalidStateTransition(format!(
                    "Purchase order {} cannot be received from status {}",
                    po.po_number,
                    po.status.as_str()
                )),
                None => AppError::NotFound("Purchase order".to_string()),
            }),
        }
    }

    async fn record_invoice_payment(
        &self,
        invoice_id: Uuid,
        payment: &PaymentData,
        record: NewFinancialRecord,
    ) -> AppResult<(Invoice, FinancialRecord)> {
        let category_id = required_category(&record)?;
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
            SET amount_paid = amount_paid + $2,
                status = CASE WHEN amount_paid + $2 >= total_amount
                              THEN 'paid' ELSE 'partially_paid' END,
                payment_date = $3,
                payment_method = $4,
                updated_at = NOW()
            WHERE id = $1
              AND status IN ('sent', 'partially_paid', 'overdue')
              AND amount_paid + $2 <= total_amount
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(payment.amount)
        .bind(payment.payment_date)
        .bind(&payment.payment_method)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let current = sqlx::query_as::<_, InvoiceRow>(&format!(
                "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
            ))
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await?;

            return Err(match current {
                None => AppError::NotFound("Invoice".to_string()),
                Some(row) => {
                    let invoice = row.into_invoice(Vec::new())?;
                    payment_rejection(&invoice, payment.amount)
                }
            });
        };

        let created = Self::insert_record_in(&mut tx, &record, category_id).await?;
        tx.commit().await?;

        let lines = self.invoice_lines(invoice_id).await?;
        Ok((row.into_invoice(lines)?, created))
    }

    async fn open_maintenance(&self, scope: Scope) -> AppResult<Vec<MaintenanceRecord>> {
        let rows = sqlx::query_as::<_, MaintenanceRow>(
            r#"
            SELECT id, user_id, asset_id, asset_name, description, cost,
                   scheduled_date, completed_date, created_at
            FROM maintenance_records
            WHERE completed_date IS NULL AND ($1::uuid IS NULL OR user_id = $1)
            ORDER BY scheduled_date
            "#,
        )
        .bind(scope.owner())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(MaintenanceRecord::from).collect())
    }

    async fn open_tasks(&self, scope: Scope) -> AppResult<Vec<TaskRecord>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, user_id, title, priority, status, due_date, created_at
            FROM tasks
            WHERE status IN ('pending', 'in_progress') AND ($1::uuid IS NULL OR user_id = $1)
            ORDER BY due_date NULLS LAST
            "#,
        )
        .bind(scope.owner())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TaskRecord::try_from).collect()
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
