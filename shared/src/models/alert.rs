//! Alerts derived from ledger and operations state

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OutOfStock,
    LowStock,
    ExpiringStock,
    OverdueMaintenance,
    OverdueTask,
}

/// Alert severity, ordered so that `Critical` sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

/// A derived, non-persisted alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub entity_id: Uuid,
    pub title: String,
    pub message: String,
    pub due_date: Option<NaiveDate>,
}
