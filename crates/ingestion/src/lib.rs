//! Cleaning (bronze) stage for the punta pipeline.
//!
//! This crate handles:
//! - Raw schema validation
//! - Type casting of raw rows
//! - Positivity filtering (volume and prices)
//! - Deduplication of (ticker, date) observations

pub mod cast;
pub mod cleaner;

pub use cast::{cast_row, CastOutcome};
pub use cleaner::{CleaningStats, PriceCleaner};
