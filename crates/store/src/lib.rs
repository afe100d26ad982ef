//! DuckDB-backed table store for the punta pipeline.
//!
//! This crate provides:
//! - Named tables per layer (raw, bronze, silver, gold)
//! - All-or-nothing table replacement inside a single transaction
//! - Raw CSV import for the ingestion boundary
//! - Typed readers for every layer

pub mod schema;
pub mod records;
pub mod store;

pub use records::{FeatureRecord, LabelRecord};
pub use schema::TableName;
pub use store::PriceStore;
