//! HTTP request handlers

pub mod alerts;
pub mod documents;
pub mod financial;
pub mod health;
pub mod inventory;
pub mod operations;

pub use alerts::*;
pub use documents::*;
pub use financial::*;
pub use health::*;
pub use inventory::*;
pub use operations::*;
