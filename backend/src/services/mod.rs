//! Business logic services for the Farm Ledger core

pub mod alerts;
pub mod document_events;
pub mod financial;
pub mod inventory;

pub use alerts::AlertGenerator;
pub use document_events::{DocumentEventBridge, SideEffect, TransitionOutcome};
pub use financial::FinancialLedger;
pub use inventory::{InventoryLedger, LineAdjustments, LineFailure, MovementInput};
