//! Domain models for the Farm Ledger core

mod alert;
mod documents;
mod financial;
mod inventory;
mod operations;

pub use alert::*;
pub use documents::*;
pub use financial::*;
pub use inventory::*;
pub use operations::*;
