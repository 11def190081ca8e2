//! Financial ledger: income and expense records, manual or derived from documents

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use shared::{
    amounts_match, validate_financial_record, validate_payment_amount, Actor, CreateRecordInput, DateRange,
    FinancialRecord, FinancialSummary, Invoice, NewFinancialRecord, PaymentData, PurchaseOrder,
    RecordOrigin, RecordSource, Scope, TransactionType,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{payment_rejection, LedgerStore};

/// Financial ledger service
#[derive(Clone)]
pub struct FinancialLedger {
    store: Arc<dyn LedgerStore>,
}

impl FinancialLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// `base * (1 + tax_rate)` rounded to cents, half away from zero
    pub fn calculate_financial_amount(base: Decimal, tax_rate: Decimal) -> Option<Decimal> {
        shared::calculate_financial_amount(base, tax_rate)
    }

    // ========================================================================
    // Derived records
    // ========================================================================

    /// INCOME record for an invoice total, dated at the invoice date
    pub async fn create_from_invoice(
        &self,
        invoice_id: Uuid,
        actor: &Actor,
        category_id: Option<Uuid>,
    ) -> AppResult<FinancialRecord> {
        let invoice = self.accessible_invoice(invoice_id, actor).await?;
        self.ensure_not_derived(RecordOrigin::Invoice, invoice.id).await?;
        check_document_total(
            "Invoice",
            &invoice.invoice_number,
            invoice.subtotal,
            invoice.tax_rate,
            invoice.total_amount,
        )?;

        let record = NewFinancialRecord {
            user_id: invoice.user_id,
            transaction_type: TransactionType::Income,
            amount: invoice.total_amount,
            category_id,
            transaction_date: invoice.invoice_date,
            description: format!("Invoice {}", invoice.invoice_number),
            reference_number: Some(invoice.invoice_number.clone()),
            customer_id: Some(invoice.customer_id),
            supplier_id: None,
            invoice_id: Some(invoice.id),
            purchase_order_id: None,
            origin: RecordOrigin::Invoice,
        };

        let created = self.insert(record).await?;
        tracing::info!(
            record_id = %created.id,
            invoice_id = %invoice.id,
            amount = %created.amount,
            "Income recorded from invoice"
        );
        Ok(created)
    }

    /// EXPENSE record for a purchase order total, dated at delivery (or order) date
    pub async fn create_from_purchase_order(
        &self,
        po_id: Uuid,
        actor: &Actor,
        category_id: Option<Uuid>,
    ) -> AppResult<FinancialRecord> {
        let po = self.accessible_purchase_order(po_id, actor).await?;
        self.ensure_not_derived(RecordOrigin::PurchaseOrder, po.id).await?;
        check_document_total(
            "Purchase order",
            &po.po_number,
            po.subtotal,
            po.tax_rate,
            po.total_amount,
        )?;

        let record = NewFinancialRecord {
            user_id: po.user_id,
            transaction_type: TransactionType::Expense,
            amount: po.total_amount,
            category_id,
            transaction_date: po.expense_date(),
            description: format!("Purchase order {}", po.po_number),
            reference_number: Some(po.po_number.clone()),
            customer_id: None,
            supplier_id: Some(po.supplier_id),
            invoice_id: None,
            purchase_order_id: Some(po.id),
            origin: RecordOrigin::PurchaseOrder,
        };

        let created = self.insert(record).await?;
        tracing::info!(
            record_id = %created.id,
            purchase_order_id = %po.id,
            amount = %created.amount,
            "Expense recorded from purchase order"
        );
        Ok(created)
    }

    /// Apply a payment to an invoice and book it as income, as one unit
    pub async fn create_payment_record(
        &self,
        invoice_id: Uuid,
        payment: PaymentData,
        actor: &Actor,
        category_id: Option<Uuid>,
    ) -> AppResult<(Invoice, FinancialRecord)> {
        let invoice = self.accessible_invoice(invoice_id, actor).await?;

        let mut errors = validate_payment_amount(payment.amount);
        if payment.payment_method.trim().is_empty() {
            errors.push("Payment method is required".to_string());
        }
        AppError::check(errors)?;

        if !invoice.status.accepts_payment() || payment.amount > invoice.outstanding() {
            return Err(payment_rejection(&invoice, payment.amount));
        }

        let description = match payment.notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => {
                format!("Payment for invoice {}: {}", invoice.invoice_number, notes)
            }
            _ => format!("Payment for invoice {}", invoice.invoice_number),
        };

        let record = NewFinancialRecord {
            user_id: invoice.user_id,
            transaction_type: TransactionType::Income,
            amount: payment.amount,
            category_id,
            transaction_date: payment.payment_date,
            description,
            reference_number: Some(invoice.invoice_number.clone()),
            customer_id: Some(invoice.customer_id),
            supplier_id: None,
            invoice_id: Some(invoice.id),
            purchase_order_id: None,
            origin: RecordOrigin::Payment,
        };
        AppError::check(validate_financial_record(&record))?;

        let (invoice, created) = self
            .store
            .record_invoice_payment(invoice_id, &payment, record)
            .await?;

        tracing::info!(
            invoice_id = %invoice.id,
            amount = %payment.amount,
            status = invoice.status.as_str(),
            "Invoice payment recorded"
        );
        Ok((invoice, created))
    }

    // ========================================================================
    // Manual records and queries
    // ========================================================================

    /// Manual entry, owned by the actor
    pub async fn create_record(
        &self,
        input: CreateRecordInput,
        actor: &Actor,
    ) -> AppResult<FinancialRecord> {
        let created = self.insert(input.into_new_record(actor.user_id)).await?;
        tracing::info!(
            record_id = %created.id,
            transaction_type = created.transaction_type.as_str(),
            amount = %created.amount,
            "Financial record created"
        );
        Ok(created)
    }

    pub async fn get_records_by_source(
        &self,
        source: RecordSource,
        scope: Scope,
    ) -> AppResult<Vec<FinancialRecord>> {
        self.store.records_by_source(source, scope).await
    }

    /// Income, expense and net totals over an inclusive date range
    pub async fn summarize(&self, scope: Scope, range: DateRange) -> AppResult<FinancialSummary> {
        if range.start > range.end {
            return Err(AppError::validation("Start date must not be after end date"));
        }

        let records = self.store.records_in_range(range, scope).await?;

        let mut invoiced = HashSet::new();
        for invoice_id in payment_invoice_ids(&records) {
            if self
                .store
                .find_derived_record(RecordOrigin::Invoice, invoice_id)
                .await?
                .is_some()
            {
                invoiced.insert(invoice_id);
            }
        }

        Ok(FinancialSummary::from_records(&records, |id| {
            invoiced.contains(&id)
        }))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn insert(&self, record: NewFinancialRecord) -> AppResult<FinancialRecord> {
        AppError::check(validate_financial_record(&record))?;
        self.store.insert_financial_record(record).await
    }

    /// Early duplicate check; the store's uniqueness rule still decides races
    async fn ensure_not_derived(&self, origin: RecordOrigin, document_id: Uuid) -> AppResult<()> {
        match self.store.find_derived_record(origin, document_id).await? {
            Some(existing) => {
                tracing::debug!(record_id = %existing.id, %document_id, "Record already derived");
                Err(AppError::DuplicateEntry(format!(
                    "Financial record for {}",
                    origin.as_str().replace('_', " ")
                )))
            }
            None => Ok(()),
        }
    }

    async fn accessible_invoice(&self, invoice_id: Uuid, actor: &Actor) -> AppResult<Invoice> {
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
        Ok(invoice)
    }

    async fn accessible_purchase_order(
        &self,
        po_id: Uuid,
        actor: &Actor,
    ) -> AppResult<PurchaseOrder> {
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
        Ok(po)
    }
}

/// Invoices that received payments within a set of records
fn payment_invoice_ids(records: &[FinancialRecord]) -> HashSet<Uuid> {
    records
        .iter()
        .filter(|record| record.origin == RecordOrigin::Payment)
        .filter_map(|record| record.invoice_id)
        .collect()
}

/// A derived record copies the document total, so the total must agree with its subtotal and tax
fn check_document_total(
    kind: &str,
    number: &str,
    subtotal: Decimal,
    tax_rate: Decimal,
    total: Decimal,
) -> AppResult<()> {
    let expected = shared::calculate_financial_amount(subtotal, tax_rate).ok_or_else(|| {
        AppError::validation(format!("{} {} amounts are out of range", kind, number))
    })?;
    if amounts_match(expected, total) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{} {} total {} does not match subtotal {} at tax rate {} (expected {})",
            kind, number, total, subtotal, tax_rate, expected
        )))
    }
}
