//! Cleaner - bank statement normalizer
//!
//! Parses Santander credit-card spreadsheets and MercadoPago account CSV
//! exports into signed, dated records, and reconciles them into a store
//! without creating duplicates.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod importers;
pub mod reconcile;
pub mod utils;

pub use error::{CleanerError, Result};
