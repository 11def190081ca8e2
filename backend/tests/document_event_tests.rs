//! Document lifecycle tests
//!
//! A transition always lands; its stock movements and derived financial
//! record are reported side effects that never undo it.

mod common;

use common::{date, dec, invoice, item_input, ledger_config, line, purchase_order, stores};
use farm_ledger_backend::config::LedgerConfig;
use farm_ledger_backend::error::AppError;
use farm_ledger_backend::services::{DocumentEventBridge, InventoryLedger, SideEffect};
use farm_ledger_backend::store::LedgerStore;
use shared::{
    Actor, DocumentKind, InvoiceStatus, MovementType, PaymentData, PurchaseOrderStatus,
    RecordOrigin, TransactionType,
};
use uuid::Uuid;

// ============================================================================
// Purchase orders
// ============================================================================

#[tokio::test]
async fn test_receiving_purchase_order_books_stock_and_expense() {
    let (memory, store) = stores();
    let config = ledger_config();
    let bridge = DocumentEventBridge::new(store.clone(), &config);
    let inventory = InventoryLedger::new(store.clone());
    let owner = Actor::member(Uuid::new_v4());

    let feed = inventory
        .create_item(item_input("FEED", "10", "5"), &owner)
        .await
        .unwrap();
    let seed = inventory
        .create_item(item_input("SEED", "0", "0"), &owner)
        .await
        .unwrap();

    let po = purchase_order(
        owner.user_id,
        PurchaseOrderStatus::Confirmed,
        "280",
        "0.05",
        vec![
            line(1, Some(feed.id), "40", "3.50"),
            line(2, Some(seed.id), "10", "14"),
            line(3, None, "1", "0"),
        ],
    );
    memory.insert_purchase_order(po.clone()).unwrap();

    let outcome = bridge
        .receive_purchase_order(po.id, date(2024, 3, 8), &owner)
        .await
        .unwrap();

    assert_eq!(outcome.document.status, PurchaseOrderStatus::Received);
    assert_eq!(outcome.document.actual_delivery_date, Some(date(2024, 3, 8)));
    assert_eq!(outcome.inventory, SideEffect::Committed);
    assert_eq!(outcome.financial, SideEffect::Committed);
    assert_eq!(outcome.movements.len(), 2);

    let first = &outcome.movements[0];
    assert_eq!(first.movement_type, MovementType::Purchase);
    assert_eq!(first.unit_cost, dec("3.50"));
    assert_eq!(first.movement_date, date(2024, 3, 8));
    let reference = first.reference.unwrap();
    assert_eq!(reference.kind, DocumentKind::PurchaseOrder);
    assert_eq!(reference.id, po.id);
    assert_eq!(reference.line_no, Some(1));

    let feed = store.find_item(feed.id).await.unwrap().unwrap();
    assert_eq!(feed.current_quantity, dec("50"));

    let record = outcome.financial_record.unwrap();
    assert_eq!(record.transaction_type, TransactionType::Expense);
    assert_eq!(record.amount, dec("294.00"));
    assert_eq!(record.transaction_date, date(2024, 3, 8));
    assert_eq!(Some(record.category_id), config.purchases_category_id);
}

#[tokio::test]
async fn test_receiving_twice_is_rejected_without_side_effects() {
    let (memory, store) = stores();
    let bridge = DocumentEventBridge::new(store.clone(), &ledger_config());
    let inventory = InventoryLedger::new(store.clone());
    let owner = Actor::member(Uuid::new_v4());

    let item = inventory
        .create_item(item_input("HAY", "0", "0"), &owner)
        .await
        .unwrap();
    let po = purchase_order(
        owner.user_id,
        PurchaseOrderStatus::Sent,
        "100",
        "0",
        vec![line(1, Some(item.id), "20", "5")],
    );
    memory.insert_purchase_order(po.clone()).unwrap();

    bridge
        .receive_purchase_order(po.id, date(2024, 3, 8), &owner)
        .await
        .unwrap();
    let err = bridge
        .receive_purchase_order(po.id, date(2024, 3, 9), &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));

    let item = store.find_item(item.id).await.unwrap().unwrap();
    assert_eq!(item.current_quantity, dec("20"));
    assert_eq!(store.list_movements(item.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_draft_purchase_order_cannot_be_received() {
    let (memory, store) = stores();
    let bridge = DocumentEventBridge::new(store, &ledger_config());
    let owner = Actor::member(Uuid::new_v4());

    let po = purchase_order(owner.user_id, PurchaseOrderStatus::Draft, "10", "0", Vec::new());
    memory.insert_purchase_order(po.clone()).unwrap();

    let err = bridge
        .receive_purchase_order(po.id, date(2024, 3, 8), &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_missing_category_fails_only_the_financial_effect() {
    let (memory, store) = stores();
    let bridge = DocumentEventBridge::new(store.clone(), &LedgerConfig::default());
    let inventory = InventoryLedger::new(store.clone());
    let owner = Actor::member(Uuid::new_v4());

    let item = inventory
        .create_item(item_input("EGGS", "0", "0"), &owner)
        .await
        .unwrap();
    let po = purchase_order(
        owner.user_id,
        PurchaseOrderStatus::Confirmed,
        "60",
        "0",
        vec![line(1, Some(item.id), "30", "2")],
    );
    memory.insert_purchase_order(po.clone()).unwrap();

    let outcome = bridge
        .receive_purchase_order(po.id, date(2024, 3, 8), &owner)
        .await
        .unwrap();

    assert_eq!(outcome.document.status, PurchaseOrderStatus::Received);
    assert_eq!(outcome.inventory, SideEffect::Committed);
    match &outcome.financial {
        SideEffect::Failed { error } => assert!(error.contains("Category is required")),
        other => panic!("unexpected effect: {other:?}"),
    }
    assert!(outcome.financial_record.is_none());

    let item = store.find_item(item.id).await.unwrap().unwrap();
    assert_eq!(item.current_quantity, dec("30"));
}

#[tokio::test]
async fn test_other_users_purchase_order_is_forbidden() {
    let (memory, store) = stores();
    let bridge = DocumentEventBridge::new(store.clone(), &ledger_config());
    let owner = Actor::member(Uuid::new_v4());
    let stranger = Actor::member(Uuid::new_v4());

    let po = purchase_order(owner.user_id, PurchaseOrderStatus::Sent, "10", "0", Vec::new());
    memory.insert_purchase_order(po.clone()).unwrap();

    let err = bridge
        .receive_purchase_order(po.id, date(2024, 3, 8), &stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let unchanged = store.find_purchase_order(po.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, PurchaseOrderStatus::Sent);

    let err = bridge
        .receive_purchase_order(Uuid::new_v4(), date(2024, 3, 8), &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// Invoices
// ============================================================================

#[tokio::test]
async fn test_issuing_invoice_books_sales_and_income() {
    let (memory, store) = stores();
    let config = ledger_config();
    let bridge = DocumentEventBridge::new(store.clone(), &config);
    let inventory = InventoryLedger::new(store.clone());
    let owner = Actor::member(Uuid::new_v4());

    let eggs = inventory
        .create_item(item_input("EGGS", "100", "10"), &owner)
        .await
        .unwrap();

    let inv = invoice(
        owner.user_id,
        InvoiceStatus::Draft,
        "1000",
        "0.08",
        vec![line(1, Some(eggs.id), "30", "5"), line(2, None, "1", "850")],
    );
    memory.insert_invoice(inv.clone()).unwrap();

    let outcome = bridge.issue_invoice(inv.id, &owner).await.unwrap();

    assert_eq!(outcome.document.status, InvoiceStatus::Sent);
    assert_eq!(outcome.inventory, SideEffect::Committed);
    assert_eq!(outcome.movements.len(), 1);
    assert_eq!(outcome.movements[0].movement_type, MovementType::Sale);
    assert_eq!(outcome.movements[0].movement_date, inv.invoice_date);
    // Sales are valued at the item's own cost
    assert_eq!(outcome.movements[0].unit_cost, dec("2.50"));

    let record = outcome.financial_record.unwrap();
    assert_eq!(record.amount, dec("1080.00"));
    assert_eq!(record.origin, RecordOrigin::Invoice);
    assert_eq!(Some(record.category_id), config.sales_category_id);

    let eggs = store.find_item(eggs.id).await.unwrap().unwrap();
    assert_eq!(eggs.current_quantity, dec("70"));

    let err = bridge.issue_invoice(inv.id, &owner).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_short_stock_line_does_not_block_the_invoice() {
    let (memory, store) = stores();
    let bridge = DocumentEventBridge::new(store.clone(), &ledger_config());
    let inventory = InventoryLedger::new(store.clone());
    let owner = Actor::member(Uuid::new_v4());

    let milk = inventory
        .create_item(item_input("MILK", "5", "0"), &owner)
        .await
        .unwrap();
    let cheese = inventory
        .create_item(item_input("CHEESE", "20", "0"), &owner)
        .await
        .unwrap();

    let inv = invoice(
        owner.user_id,
        InvoiceStatus::Draft,
        "200",
        "0",
        vec![
            line(1, Some(milk.id), "8", "5"),
            line(2, Some(cheese.id), "10", "16"),
        ],
    );
    memory.insert_invoice(inv.clone()).unwrap();

    let outcome = bridge.issue_invoice(inv.id, &owner).await.unwrap();

    assert_eq!(outcome.document.status, InvoiceStatus::Sent);
    assert!(matches!(outcome.inventory, SideEffect::Failed { .. }));
    assert_eq!(outcome.line_failures.len(), 1);
    assert_eq!(outcome.line_failures[0].line_no, 1);
    assert_eq!(outcome.line_failures[0].item_id, milk.id);
    assert_eq!(outcome.movements.len(), 1);
    assert!(outcome.financial.is_committed());

    let milk = store.find_item(milk.id).await.unwrap().unwrap();
    let cheese = store.find_item(cheese.id).await.unwrap().unwrap();
    assert_eq!(milk.current_quantity, dec("5"));
    assert_eq!(cheese.current_quantity, dec("10"));
}

#[tokio::test]
async fn test_invoice_without_stock_lines_skips_inventory() {
    let (memory, store) = stores();
    let bridge = DocumentEventBridge::new(store, &ledger_config());
    let owner = Actor::member(Uuid::new_v4());

    let inv = invoice(
        owner.user_id,
        InvoiceStatus::Draft,
        "75",
        "0",
        vec![line(1, None, "3", "25")],
    );
    memory.insert_invoice(inv.clone()).unwrap();

    let outcome = bridge.issue_invoice(inv.id, &owner).await.unwrap();
    assert!(matches!(outcome.inventory, SideEffect::Skipped { .. }));
    assert!(outcome.financial.is_committed());
}

#[tokio::test]
async fn test_existing_income_record_is_skipped() {
    let (memory, store) = stores();
    let config = ledger_config();
    let bridge = DocumentEventBridge::new(store.clone(), &config);
    let owner = Actor::member(Uuid::new_v4());

    let inv = invoice(owner.user_id, InvoiceStatus::Draft, "75", "0", Vec::new());
    memory.insert_invoice(inv.clone()).unwrap();

    // Booked by hand before the invoice was issued
    farm_ledger_backend::services::FinancialLedger::new(store.clone())
        .create_from_invoice(inv.id, &owner, config.sales_category_id)
        .await
        .unwrap();

    let outcome = bridge.issue_invoice(inv.id, &owner).await.unwrap();
    assert_eq!(outcome.document.status, InvoiceStatus::Sent);
    assert!(matches!(outcome.financial, SideEffect::Skipped { .. }));
    assert!(outcome.financial_record.is_none());
}

// ============================================================================
// Adjustments and payments
// ============================================================================

#[tokio::test]
async fn test_manual_adjustment_errors_reach_the_caller() {
    let (_, store) = stores();
    let bridge = DocumentEventBridge::new(store.clone(), &ledger_config());
    let inventory = InventoryLedger::new(store);
    let owner = Actor::member(Uuid::new_v4());

    let item = inventory
        .create_item(item_input("FEED", "4", "0"), &owner)
        .await
        .unwrap();

    let err = bridge
        .record_manual_adjustment(item.id, dec("-5"), MovementType::Adjustment, Some("Spoiled".into()), &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    let (item, movement) = bridge
        .record_manual_adjustment(item.id, dec("-4"), MovementType::Adjustment, Some("Spoiled".into()), &owner)
        .await
        .unwrap();
    assert!(item.is_out_of_stock());
    assert_eq!(movement.reason.as_deref(), Some("Spoiled"));
}

#[tokio::test]
async fn test_payment_uses_payments_category() {
    let (memory, store) = stores();
    let config = ledger_config();
    let bridge = DocumentEventBridge::new(store, &config);
    let owner = Actor::member(Uuid::new_v4());

    let inv = invoice(owner.user_id, InvoiceStatus::Draft, "50", "0", Vec::new());
    memory.insert_invoice(inv.clone()).unwrap();
    bridge.issue_invoice(inv.id, &owner).await.unwrap();

    let (after, record) = bridge
        .record_invoice_payment(
            inv.id,
            PaymentData {
                amount: dec("50"),
                payment_date: date(2024, 3, 30),
                payment_method: "cash".to_string(),
                notes: Some("Paid at market".to_string()),
            },
            &owner,
        )
        .await
        .unwrap();

    assert_eq!(after.status, InvoiceStatus::Paid);
    assert_eq!(Some(record.category_id), config.payments_category_id);
    assert_eq!(record.origin, RecordOrigin::Payment);
    assert!(record.description.contains("Paid at market"));
}
