//! Core types and configuration for the punta price pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Price rows for every layer (raw, bronze, silver, gold)
//! - The tri-state `Datum` used for undefined statistics
//! - Pipeline configuration
//! - Common error types

pub mod config;
pub mod datum;
pub mod error;
pub mod types;

pub use config::PipelineConfig;
pub use datum::{Datum, UndefinedReason};
pub use error::{Error, Result};
pub use types::*;
