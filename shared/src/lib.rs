//! Shared types and models for the Bobina Tracker
//!
//! This crate contains the domain models, validation rules and view logic
//! shared between the backend and the browser client (via WASM).

pub mod analytics;
pub mod consolidation;
pub mod models;
pub mod stock;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
