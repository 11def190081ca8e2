//! Financial ledger models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::not_blank;

/// Financial transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INCOME" => Some(TransactionType::Income),
            "EXPENSE" => Some(TransactionType::Expense),
            "TRANSFER" => Some(TransactionType::Transfer),
            _ => None,
        }
    }
}

/// What produced a financial record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    Manual,
    Invoice,
    PurchaseOrder,
    Payment,
}

impl RecordOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordOrigin::Manual => "manual",
            RecordOrigin::Invoice => "invoice",
            RecordOrigin::PurchaseOrder => "purchase_order",
            RecordOrigin::Payment => "payment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(RecordOrigin::Manual),
            "invoice" => Some(RecordOrigin::Invoice),
            "purchase_order" => Some(RecordOrigin::PurchaseOrder),
            "payment" => Some(RecordOrigin::Payment),
            _ => None,
        }
    }
}

/// An income, expense or transfer record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub category_id: Uuid,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub reference_number: Option<String>,
    pub customer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    pub origin: RecordOrigin,
    pub created_at: DateTime<Utc>,
}

/// A financial record ready to be validated and persisted
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewFinancialRecord {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub category_id: Option<Uuid>,
    pub transaction_date: NaiveDate,
    #[validate(custom = "not_blank")]
    pub description: String,
    pub reference_number: Option<String>,
    pub customer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    pub origin: RecordOrigin,
}

impl NewFinancialRecord {
    /// Whether the counterparty/document reference required by the type is present
    pub fn has_required_reference(&self) -> bool {
        match self.transaction_type {
            TransactionType::Income => self.customer_id.is_some() || self.invoice_id.is_some(),
            TransactionType::Expense => {
                self.supplier_id.is_some() || self.purchase_order_id.is_some()
            }
            TransactionType::Transfer => true,
        }
    }
}

/// Manual entry input (no origin, no owner: those come from the actor)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordInput {
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub category_id: Option<Uuid>,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub reference_number: Option<String>,
    pub customer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
}

impl CreateRecordInput {
    pub fn into_new_record(self, user_id: Uuid) -> NewFinancialRecord {
        NewFinancialRecord {
            user_id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            category_id: self.category_id,
            transaction_date: self.transaction_date,
            description: self.description,
            reference_number: self.reference_number,
            customer_id: self.customer_id,
            supplier_id: self.supplier_id,
            invoice_id: self.invoice_id,
            purchase_order_id: self.purchase_order_id,
            origin: RecordOrigin::Manual,
        }
    }
}

/// Lookup key for records linked to a source entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source_type", content = "source_id")]
pub enum RecordSource {
    Invoice(Uuid),
    PurchaseOrder(Uuid),
    Customer(Uuid),
    Supplier(Uuid),
}

impl RecordSource {
    pub fn matches(&self, record: &FinancialRecord) -> bool {
        match self {
            RecordSource::Invoice(id) => record.invoice_id == Some(*id),
            RecordSource::PurchaseOrder(id) => record.purchase_order_id == Some(*id),
            RecordSource::Customer(id) => record.customer_id == Some(*id),
            RecordSource::Supplier(id) => record.supplier_id == Some(*id),
        }
    }
}

/// Income and expense totals over a period
///
/// Income is recognised when an invoice is issued. A payment against an
/// invoice that already has its own income record settles that income and is
/// reported under `settled_income` instead of being counted again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub settled_income: Decimal,
    pub record_count: usize,
}

impl FinancialSummary {
    /// `invoiced` answers whether an invoice has an invoice-origin income record
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a FinancialRecord>,
        invoiced: impl Fn(Uuid) -> bool,
    ) -> Self {
        let mut total_income = Decimal::ZERO;
        let mut total_expense = Decimal::ZERO;
        let mut settled_income = Decimal::ZERO;
        let mut record_count = 0;

        for record in records {
            record_count += 1;
            match record.transaction_type {
                TransactionType::Income if record.settles_invoiced_income(&invoiced) => {
                    settled_income += record.amount
                }
                TransactionType::Income => total_income += record.amount,
                TransactionType::Expense => total_expense += record.amount,
                TransactionType::Transfer => {}
            }
        }

        Self {
            total_income,
            total_expense,
            net: total_income - total_expense,
            settled_income,
            record_count,
        }
    }
}

impl FinancialRecord {
    fn settles_invoiced_income(&self, invoiced: impl Fn(Uuid) -> bool) -> bool {
        self.origin == RecordOrigin::Payment && self.invoice_id.is_some_and(invoiced)
    }
}
