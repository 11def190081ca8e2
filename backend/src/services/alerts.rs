//! Alerts derived from ledger and operations state
//!
//! Alerts are computed on demand and never stored.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use shared::{
    Alert, AlertKind, AlertSeverity, InventoryItem, MaintenanceRecord, Scope, TaskPriority,
    TaskRecord,
};

use crate::error::AppResult;
use crate::store::LedgerStore;

/// Maintenance overdue by more than this many days is critical
const MAINTENANCE_CRITICAL_DAYS: i64 = 30;

/// Alert generator service
#[derive(Clone)]
pub struct AlertGenerator {
    store: Arc<dyn LedgerStore>,
    expiry_warning_days: i64,
}

impl AlertGenerator {
    pub fn new(store: Arc<dyn LedgerStore>, expiry_warning_days: i64) -> Self {
        Self {
            store,
            expiry_warning_days,
        }
    }

    /// All alerts visible in `scope` as of `today`, critical first
    pub async fn generate(&self, scope: Scope, today: NaiveDate) -> AppResult<Vec<Alert>> {
        let items = self.store.list_items(scope).await?;
        let maintenance = self.store.open_maintenance(scope).await?;
        let tasks = self.store.open_tasks(scope).await?;

        let mut alerts = Vec::new();
        for item in &items {
            alerts.extend(stock_alert(item));
            alerts.extend(expiry_alert(item, today, self.expiry_warning_days));
        }
        alerts.extend(maintenance.iter().filter_map(|m| maintenance_alert(m, today)));
        alerts.extend(tasks.iter().filter_map(|t| task_alert(t, today)));

        // Stable: within a severity, alerts keep their source order
        alerts.sort_by_key(|a| a.severity);

        tracing::debug!(count = alerts.len(), "Alerts generated");
        Ok(alerts)
    }
}

fn stock_alert(item: &InventoryItem) -> Option<Alert> {
    if item.is_out_of_stock() {
        Some(Alert {
            kind: AlertKind::OutOfStock,
            severity: AlertSeverity::Critical,
            entity_id: item.id,
            title: format!("Out of stock: {}", item.name),
            message: format!("{} ({}) has no stock left", item.name, item.code),
            due_date: None,
        })
    } else if item.is_low_stock() {
        Some(Alert {
            kind: AlertKind::LowStock,
            severity: AlertSeverity::Warning,
            entity_id: item.id,
            title: format!("Low stock: {}", item.name),
            message: format!(
                "{} ({}) is at {} {}, reorder level {}",
                item.name, item.code, item.current_quantity, item.unit, item.reorder_level
            ),
            due_date: None,
        })
    } else {
        None
    }
}

fn expiry_alert(item: &InventoryItem, today: NaiveDate, warning_days: i64) -> Option<Alert> {
    let expiry = item.expiry_date?;
    if item.is_out_of_stock() {
        return None;
    }

    if expiry < today {
        Some(Alert {
            kind: AlertKind::ExpiringStock,
            severity: AlertSeverity::Critical,
            entity_id: item.id,
            title: format!("Expired stock: {}", item.name),
            message: format!(
                "{} {} of {} expired on {}",
                item.current_quantity, item.unit, item.name, expiry
            ),
            due_date: Some(expiry),
        })
    } else if expiry <= today + Duration::days(warning_days) {
        Some(Alert {
            kind: AlertKind::ExpiringStock,
            severity: AlertSeverity::Warning,
            entity_id: item.id,
            title: format!("Expiring soon: {}", item.name),
            message: format!(
                "{} {} of {} expire on {}",
                item.current_quantity, item.unit, item.name, expiry
            ),
            due_date: Some(expiry),
        })
    } else {
        None
    }
}

fn maintenance_alert(record: &MaintenanceRecord, today: NaiveDate) -> Option<Alert> {
    if !record.is_overdue(today) {
        return None;
    }

    let days_overdue = (today - record.scheduled_date).num_days();
    let severity = if days_overdue > MAINTENANCE_CRITICAL_DAYS {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    };

    Some(Alert {
        kind: AlertKind::OverdueMaintenance,
        severity,
        entity_id: record.id,
        title: format!("Overdue maintenance: {}", record.asset_name),
        message: format!(
            "{} was scheduled for {} ({} days overdue)",
            record.description, record.scheduled_date, days_overdue
        ),
        due_date: Some(record.scheduled_date),
    })
}

fn task_alert(task: &TaskRecord, today: NaiveDate) -> Option<Alert> {
    if !task.is_overdue(today) {
        return None;
    }

    let severity = if task.priority >= TaskPriority::High {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    };

    Some(Alert {
        kind: AlertKind::OverdueTask,
        severity,
        entity_id: task.id,
        title: format!("Overdue task: {}", task.title),
        message: format!("{} priority task is past its due date", task.priority.as_str()),
        due_date: task.due_date,
    })
}
