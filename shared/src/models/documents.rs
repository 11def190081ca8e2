//! Business documents read by the ledger core
//!
//! Invoices and purchase orders are owned by their own modules; the ledger
//! only consumes their totals, dates and stock lines.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of document that caused a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    PurchaseOrder,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::PurchaseOrder => "purchase_order",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(DocumentKind::Invoice),
            "purchase_order" => Some(DocumentKind::PurchaseOrder),
            _ => None,
        }
    }
}

/// Pointer from a movement back to the document (and line) that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: Uuid,
    pub line_no: Option<i32>,
}

impl DocumentRef {
    pub fn invoice(id: Uuid) -> Self {
        Self {
            kind: DocumentKind::Invoice,
            id,
            line_no: None,
        }
    }

    pub fn purchase_order(id: Uuid) -> Self {
        Self {
            kind: DocumentKind::PurchaseOrder,
            id,
            line_no: None,
        }
    }

    pub fn with_line(mut self, line_no: i32) -> Self {
        self.line_no = Some(line_no);
        self
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line_no {
            Some(line) => write!(f, "{}:{}#{}", self.kind.as_str(), self.id, line),
            None => write!(f, "{}:{}", self.kind.as_str(), self.id),
        }
    }
}

/// A document line; only lines with an inventory reference move stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentLine {
    pub line_no: i32,
    pub inventory_item_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Invoice lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "partially_paid" => Some(InvoiceStatus::PartiallyPaid),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    /// Payments are accepted once the invoice is issued and until it is settled
    pub fn accepts_payment(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }
}

/// An invoice as seen by the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub status: InvoiceStatus,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub lines: Vec<DocumentLine>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn outstanding(&self) -> Decimal {
        (self.total_amount - self.amount_paid).max(Decimal::ZERO)
    }
}

/// Purchase order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Confirmed,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Sent => "sent",
            PurchaseOrderStatus::Confirmed => "confirmed",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PurchaseOrderStatus::Draft),
            "sent" => Some(PurchaseOrderStatus::Sent),
            "confirmed" => Some(PurchaseOrderStatus::Confirmed),
            "received" => Some(PurchaseOrderStatus::Received),
            "cancelled" => Some(PurchaseOrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_receive(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Sent | PurchaseOrderStatus::Confirmed
        )
    }
}

/// A purchase order as seen by the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub order_date: NaiveDate,
    pub expected_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub total_amount: Decimal,
    pub lines: Vec<DocumentLine>,
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Date the expense is booked at: delivery if known, order date otherwise
    pub fn expense_date(&self) -> NaiveDate {
        self.actual_delivery_date.unwrap_or(self.order_date)
    }
}

/// Payment details supplied when an invoice is paid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentData {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_ref_display() {
        let id = Uuid::nil();
        assert_eq!(
            DocumentRef::invoice(id).with_line(3).to_string(),
            format!("invoice:{}#3", id)
        );
        assert_eq!(
            DocumentRef::purchase_order(id).to_string(),
            format!("purchase_order:{}", id)
        );
    }

    #[test]
    fn test_invoice_payment_states() {
        assert!(InvoiceStatus::Sent.accepts_payment());
        assert!(InvoiceStatus::PartiallyPaid.accepts_payment());
        assert!(InvoiceStatus::Overdue.accepts_payment());
        assert!(!InvoiceStatus::Draft.accepts_payment());
        assert!(!InvoiceStatus::Paid.accepts_payment());
        assert!(!InvoiceStatus::Cancelled.accepts_payment());
    }

    #[test]
    fn test_purchase_order_receivable_states() {
        assert!(PurchaseOrderStatus::Sent.can_receive());
        assert!(PurchaseOrderStatus::Confirmed.can_receive());
        assert!(!PurchaseOrderStatus::Draft.can_receive());
        assert!(!PurchaseOrderStatus::Received.can_receive());
    }
}
