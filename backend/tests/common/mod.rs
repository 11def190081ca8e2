//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use farm_ledger_backend::config::LedgerConfig;
use farm_ledger_backend::store::{LedgerStore, MemoryLedgerStore};
use rust_decimal::Decimal;
use shared::{
    calculate_financial_amount, CreateItemInput, DocumentLine, Invoice, InvoiceStatus,
    PurchaseOrder, PurchaseOrderStatus,
};
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A memory store, plus the same store behind the trait object services take
pub fn stores() -> (Arc<MemoryLedgerStore>, Arc<dyn LedgerStore>) {
    let memory = Arc::new(MemoryLedgerStore::new());
    let store: Arc<dyn LedgerStore> = memory.clone();
    (memory, store)
}

pub fn ledger_config() -> LedgerConfig {
    LedgerConfig {
        sales_category_id: Some(Uuid::new_v4()),
        purchases_category_id: Some(Uuid::new_v4()),
        payments_category_id: Some(Uuid::new_v4()),
        ..LedgerConfig::default()
    }
}

pub fn item_input(code: &str, quantity: &str, reorder_level: &str) -> CreateItemInput {
    CreateItemInput {
        name: format!("Item {}", code),
        code: code.to_string(),
        unit: "kg".to_string(),
        initial_quantity: dec(quantity),
        reorder_level: dec(reorder_level),
        unit_cost: dec("2.50"),
        selling_price: dec("4.00"),
        expiry_date: None,
        category_id: None,
    }
}

pub fn line(line_no: i32, item_id: Option<Uuid>, quantity: &str, unit_price: &str) -> DocumentLine {
    DocumentLine {
        line_no,
        inventory_item_id: item_id,
        description: format!("Line {}", line_no),
        quantity: dec(quantity),
        unit_price: dec(unit_price),
    }
}

/// Invoice whose total is derived from subtotal and tax rate
pub fn invoice(
    owner: Uuid,
    status: InvoiceStatus,
    subtotal: &str,
    tax_rate: &str,
    lines: Vec<DocumentLine>,
) -> Invoice {
    let subtotal = dec(subtotal);
    let tax_rate = dec(tax_rate);
    Invoice {
        id: Uuid::new_v4(),
        user_id: owner,
        invoice_number: "INV-0001".to_string(),
        customer_id: Uuid::new_v4(),
        status,
        invoice_date: date(2024, 3, 15),
        due_date: Some(date(2024, 4, 15)),
        subtotal,
        tax_rate,
        total_amount: calculate_financial_amount(subtotal, tax_rate).unwrap(),
        amount_paid: Decimal::ZERO,
        payment_date: None,
        payment_method: None,
        lines,
        created_at: Utc::now(),
    }
}

/// Purchase order whose total is derived from subtotal and tax rate
pub fn purchase_order(
    owner: Uuid,
    status: PurchaseOrderStatus,
    subtotal: &str,
    tax_rate: &str,
    lines: Vec<DocumentLine>,
) -> PurchaseOrder {
    let subtotal = dec(subtotal);
    let tax_rate = dec(tax_rate);
    PurchaseOrder {
        id: Uuid::new_v4(),
        user_id: owner,
        po_number: "PO-0001".to_string(),
        supplier_id: Uuid::new_v4(),
        status,
        order_date: date(2024, 3, 1),
        expected_delivery_date: Some(date(2024, 3, 10)),
        actual_delivery_date: None,
        subtotal,
        tax_rate,
        total_amount: calculate_financial_amount(subtotal, tax_rate).unwrap(),
        lines,
        created_at: Utc::now(),
    }
}
