//! Assets, maintenance and tasks
//!
//! These are owned by other parts of the back office. The ledger core reads
//! them for alerts and validates them before they are stored.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::not_blank;

/// Asset fields that drive depreciation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetInput {
    pub name: String,
    pub purchase_cost: Decimal,
    pub salvage_value: Decimal,
    pub useful_life_years: i32,
    pub purchase_date: NaiveDate,
}

/// A maintenance job on an asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub asset_id: Uuid,
    pub asset_name: String,
    pub description: String,
    pub cost: Decimal,
    pub scheduled_date: NaiveDate,
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceRecord {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.completed_date.is_none() && self.scheduled_date < today
    }
}

/// Input for recording maintenance
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaintenanceInput {
    pub asset_id: Uuid,
    #[validate(custom = "not_blank")]
    pub description: String,
    pub cost: Decimal,
    pub scheduled_date: NaiveDate,
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            "urgent" => Some(TaskPriority::Urgent),
            _ => None,
        }
    }
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

/// A farm task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date.map_or(false, |due| due < today)
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(custom = "not_blank", length(max = 255))]
    pub title: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
}
