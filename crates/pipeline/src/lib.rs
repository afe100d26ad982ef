//! Stage runner for the punta pipeline.
//!
//! This crate provides:
//! - `Pipeline`, running Cleaning, Stabilization and Feature/Label in order
//! - `PipelineReport`, the per-stage summaries of one run
//! - The `punta` command-line binary

pub mod runner;

pub use runner::{Pipeline, PipelineReport, Stage};
