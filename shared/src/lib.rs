//! Shared types and models for the Farm Ledger core
//!
//! Everything in this crate is pure: domain records, closed enumerations,
//! money arithmetic, the depreciation calculator and validation rules. The
//! backend and the WASM bindings both build on it.

pub mod depreciation;
pub mod models;
pub mod money;
pub mod types;
pub mod validation;

pub use depreciation::*;
pub use models::*;
pub use money::*;
pub use types::*;
pub use validation::*;
