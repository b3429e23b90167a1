//! Trichat Shared Types and Utilities
//!
//! This crate contains the domain types, errors, and database helpers shared
//! across the Trichat backend.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
