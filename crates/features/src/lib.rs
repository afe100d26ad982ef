//! Stabilization (silver) and feature/label (gold) stages for the punta pipeline.
//!
//! This crate handles:
//! - Global winsorization of price columns and validity stamps
//! - Trailing momentum and forward returns over a fixed horizon
//! - The shared benchmark forward-return join table
//! - Excess-return labels, computed per ticker partition in parallel

pub mod winsorize;
pub mod returns;
pub mod benchmark;
pub mod engine;

pub use winsorize::{resolve_validity, ColumnBounds, StabilizationReport, Winsorizer};
pub use returns::{forward_returns, trailing_returns};
pub use benchmark::BenchmarkReturns;
pub use engine::{GoldEngine, GoldOutput, GoldReport};
