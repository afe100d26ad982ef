//! Strictly linear stage runner.
//!
//! Each stage reads its upstream table from the store, computes in memory and
//! replaces its own output table. A failing stage returns early, so nothing
//! downstream of it runs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use punta_core::{Error, PipelineConfig, Result};
use punta_features::{GoldEngine, GoldReport, StabilizationReport, Winsorizer};
use punta_ingestion::{CleaningStats, PriceCleaner};
use punta_store::PriceStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Which stages to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Clean,
    Stabilize,
    Gold,
    All,
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clean" | "bronze" => Ok(Stage::Clean),
            "stabilize" | "silver" => Ok(Stage::Stabilize),
            "gold" => Ok(Stage::Gold),
            "all" => Ok(Stage::All),
            other => Err(Error::config(format!(
                "unknown stage '{other}' (expected clean, stabilize, gold or all)"
            ))),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Clean => "clean",
            Stage::Stabilize => "stabilize",
            Stage::Gold => "gold",
            Stage::All => "all",
        };
        f.write_str(name)
    }
}

/// Summaries of the stages that ran.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaning: Option<CleaningStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stabilization: Option<StabilizationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold: Option<GoldReport>,
}

impl PipelineReport {
    /// Output row count of every stage that ran, keyed by layer.
    pub fn row_counts(&self) -> BTreeMap<&'static str, u64> {
        let mut counts = BTreeMap::new();
        if let Some(stats) = &self.cleaning {
            counts.insert("bronze", stats.output_rows);
        }
        if let Some(report) = &self.stabilization {
            counts.insert("silver", report.rows);
        }
        if let Some(report) = &self.gold {
            counts.insert("gold", report.rows);
        }
        counts
    }
}

/// Pipeline runner bound to one validated configuration.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a runner. The configuration is validated up front.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Raw → bronze.
    pub fn run_cleaning(&self, store: &mut PriceStore) -> Result<CleaningStats> {
        let tables = &self.config.tables;

        let columns = store.table_columns(&tables.raw)?;
        PriceCleaner::check_columns(&columns)?;

        let raw = store.load_raw(&tables.raw)?;
        if raw.is_empty() {
            return Err(Error::missing_dependency(format!(
                "raw table '{}' is empty",
                tables.raw
            )));
        }

        let mut cleaner = PriceCleaner::from_config(&self.config.cleaning);
        let cleaned = cleaner.clean(&raw)?;
        if cleaned.is_empty() {
            warn!(table = %tables.raw, "no raw row survived cleaning");
        }
        store.replace_cleaned(&tables.cleaned, &cleaned)?;

        Ok(cleaner.stats().clone())
    }

    /// Bronze → silver.
    pub fn run_stabilization(&self, store: &mut PriceStore) -> Result<StabilizationReport> {
        let tables = &self.config.tables;

        let cleaned = store.load_cleaned(&tables.cleaned)?;
        if cleaned.is_empty() {
            return Err(Error::missing_dependency(format!(
                "cleaned table '{}' is empty",
                tables.cleaned
            )));
        }

        let (stabilized, report) =
            Winsorizer::from_config(&self.config.stabilization).stabilize(cleaned);
        store.replace_stabilized(&tables.stabilized, &stabilized)?;

        Ok(report)
    }

    /// Silver → gold features and labels.
    pub fn run_gold(&self, store: &mut PriceStore) -> Result<GoldReport> {
        let tables = &self.config.tables;

        let stabilized = store.load_stabilized(&tables.stabilized)?;
        if stabilized.is_empty() {
            return Err(Error::missing_dependency(format!(
                "stabilized table '{}' is empty",
                tables.stabilized
            )));
        }

        let engine = GoldEngine::new(&self.config.labels, &self.config.execution);
        let output = engine.compute(stabilized)?;
        store.replace_gold(&tables.features, &tables.labels, &output.features, &output.labels)?;

        Ok(output.report)
    }

    /// Run one stage, or every stage in order.
    pub fn run_stage(&self, store: &mut PriceStore, stage: Stage) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        match stage {
            Stage::Clean => report.cleaning = Some(self.run_cleaning(store)?),
            Stage::Stabilize => report.stabilization = Some(self.run_stabilization(store)?),
            Stage::Gold => report.gold = Some(self.run_gold(store)?),
            Stage::All => return self.run_all(store),
        }
        Ok(report)
    }

    /// Cleaning, then Stabilization, then Feature/Label.
    pub fn run_all(&self, store: &mut PriceStore) -> Result<PipelineReport> {
        let cleaning = self.run_cleaning(store)?;
        let stabilization = self.run_stabilization(store)?;
        let gold = self.run_gold(store)?;

        info!(
            bronze = cleaning.output_rows,
            silver = stabilization.rows,
            gold = gold.rows,
            "pipeline complete"
        );

        Ok(PipelineReport {
            cleaning: Some(cleaning),
            stabilization: Some(stabilization),
            gold: Some(gold),
        })
    }
}
