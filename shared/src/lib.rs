//! Shared domain rules for the multi-brand ordering platform
//!
//! This crate holds every business rule of the VMI proposal engine and cart
//! reconciliation so the backend, the browser (via WASM) and the tests all
//! evaluate the same code. Nothing in here performs I/O.

pub mod error;
pub mod models;
pub mod validation;

pub use error::*;
pub use models::*;
pub use validation::*;
