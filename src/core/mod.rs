//! Core business logic abstractions

pub mod config;
pub mod fact;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use fact::{Fact, FactEntry, FactStore, LoadError};
pub use price::{LookupFailure, Price, PriceOutcome, PriceQuery, PriceSource};
