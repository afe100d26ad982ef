//! Configuration structures for the punta pipeline.
//!
//! One `PipelineConfig` value is passed into every stage invocation; no
//! stage reads paths, table names or constants from anywhere else.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Store location.
    pub store: StoreConfig,
    /// Named tables for each layer.
    pub tables: TableConfig,
    /// Cleaning (bronze) configuration.
    pub cleaning: CleaningConfig,
    /// Stabilization (silver) configuration.
    pub stabilization: StabilizationConfig,
    /// Feature/label (gold) configuration.
    pub labels: LabelConfig,
    /// Execution configuration.
    pub execution: ExecutionConfig,
}

impl PipelineConfig {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Check every field that a stage would otherwise trip over mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.labels.horizon == 0 {
            return Err(Error::config("labels.horizon must be at least 1"));
        }
        if !self.labels.hit_threshold.is_finite() {
            return Err(Error::config("labels.hit_threshold must be finite"));
        }
        if self.labels.benchmark_ticker.trim().is_empty() {
            return Err(Error::config("labels.benchmark_ticker must not be empty"));
        }
        if !(self.stabilization.sigma.is_finite() && self.stabilization.sigma > 0.0) {
            return Err(Error::config("stabilization.sigma must be positive and finite"));
        }
        for name in self.tables.all() {
            validate_table_name(name)?;
        }
        Ok(())
    }
}

/// Check that a table name is `identifier` or `schema.identifier`.
///
/// Names are interpolated into SQL, so anything else is rejected.
pub fn validate_table_name(name: &str) -> Result<()> {
    let parts: Vec<&str> = name.split('.').collect();
    let valid_ident = |s: &str| {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    };
    if parts.len() > 2 || !parts.iter().all(|p| valid_ident(p)) {
        return Err(Error::config(format!("invalid table name '{name}'")));
    }
    Ok(())
}

/// Store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the DuckDB database file.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data").join("punta.duckdb"),
        }
    }
}

/// Table names, one per layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Raw ingestion table.
    pub raw: String,
    /// Cleaned (bronze) table.
    pub cleaned: String,
    /// Stabilized (silver) table.
    pub stabilized: String,
    /// Feature (gold) table.
    pub features: String,
    /// Label (gold) table.
    pub labels: String,
}

impl TableConfig {
    /// All table names.
    pub fn all(&self) -> [&str; 5] {
        [
            &self.raw,
            &self.cleaned,
            &self.stabilized,
            &self.features,
            &self.labels,
        ]
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            raw: "raw.prices".to_string(),
            cleaned: "bronze.prices".to_string(),
            stabilized: "silver.prices".to_string(),
            features: "gold.features".to_string(),
            labels: "gold.labels".to_string(),
        }
    }
}

/// Which row survives when several raw rows share (ticker, date).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Earliest valid row in ingestion order.
    #[default]
    KeepFirst,
    /// Latest valid row in ingestion order.
    KeepLatest,
}

/// Cleaning stage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Tie-break among duplicate (ticker, date) rows.
    pub duplicate_policy: DuplicatePolicy,
}

/// Stabilization stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
    /// Winsorization band half-width in standard deviations.
    pub sigma: f64,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self { sigma: 3.0 }
    }
}

/// Feature/label stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Benchmark ticker (e.g., "SPY"); excluded from the output.
    pub benchmark_ticker: String,
    /// Horizon in trading rows (252 ≈ one year).
    pub horizon: usize,
    /// Minimum excess return for `hit_2pct`.
    pub hit_threshold: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            benchmark_ticker: "SPY".to_string(),
            horizon: 252,
            hit_threshold: 0.02,
        }
    }
}

/// Execution configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Number of worker threads for ticker partitions (0 = auto, 1 = sequential).
    pub workers: u32,
}
