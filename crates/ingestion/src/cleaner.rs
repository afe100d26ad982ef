//! Bronze-layer cleaning: cast, filter, deduplicate.
//!
//! Rows failing the positivity predicate are removed before deduplication,
//! so an invalid duplicate can never shadow a valid row for the same key.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::NaiveDate;
use punta_core::config::{CleaningConfig, DuplicatePolicy};
use punta_core::{
    Error, IngestSeq, PriceObservation, RawPriceRow, Result, Ticker, RAW_COLUMNS,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::cast::{cast_row, CastOutcome};

/// Counts collected during one cleaning pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningStats {
    /// Raw rows read.
    pub input_rows: u64,
    /// Rows with a NULL price or volume.
    pub missing_value_rows: u64,
    /// Rows with volume <= 0.
    pub non_positive_volume_rows: u64,
    /// Rows with a price <= 0 or non-finite.
    pub non_positive_price_rows: u64,
    /// Valid rows discarded as duplicates of a kept (ticker, date).
    pub duplicate_rows: u64,
    /// Rows written to the cleaned table.
    pub output_rows: u64,
    /// Distinct tickers in the output.
    pub tickers: u64,
}

impl CleaningStats {
    /// Total rows dropped for data quality.
    pub fn rejected_rows(&self) -> u64 {
        self.missing_value_rows + self.non_positive_volume_rows + self.non_positive_price_rows
    }

    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Cleaner turning raw rows into one typed observation per (ticker, date).
pub struct PriceCleaner {
    /// Tie-break among duplicates.
    policy: DuplicatePolicy,
    /// Statistics from the last run.
    stats: CleaningStats,
}

impl PriceCleaner {
    /// Create a new cleaner.
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            stats: CleaningStats::default(),
        }
    }

    /// Create a cleaner from configuration.
    pub fn from_config(config: &CleaningConfig) -> Self {
        Self::new(config.duplicate_policy)
    }

    /// Check that the raw table provides every required column.
    pub fn check_columns<S: AsRef<str>>(columns: &[S]) -> Result<()> {
        let missing: Vec<&str> = RAW_COLUMNS
            .iter()
            .copied()
            .filter(|req| !columns.iter().any(|c| c.as_ref().eq_ignore_ascii_case(req)))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::schema(format!(
                "raw table is missing required column(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Clean raw rows in any order.
    ///
    /// Output is sorted by (ticker, date). Fails on the first cast error
    /// and produces nothing in that case.
    pub fn clean(&mut self, rows: &[RawPriceRow]) -> Result<Vec<PriceObservation>> {
        self.stats.reset();
        self.stats.input_rows = rows.len() as u64;

        let mut kept: BTreeMap<(Ticker, NaiveDate), (IngestSeq, PriceObservation)> =
            BTreeMap::new();

        for row in rows {
            let obs = match cast_row(row)? {
                CastOutcome::Typed(obs) => obs,
                CastOutcome::MissingValue(column) => {
                    debug!(seq = row.seq, column, "dropping row with null value");
                    self.stats.missing_value_rows += 1;
                    continue;
                }
            };

            if obs.volume <= 0 {
                self.stats.non_positive_volume_rows += 1;
                continue;
            }
            if !obs.prices.all_positive() {
                self.stats.non_positive_price_rows += 1;
                continue;
            }

            match kept.entry((obs.ticker.clone(), obs.date)) {
                Entry::Vacant(slot) => {
                    slot.insert((row.seq, obs));
                }
                Entry::Occupied(mut slot) => {
                    self.stats.duplicate_rows += 1;
                    let held_seq = slot.get().0;
                    let replace = match self.policy {
                        DuplicatePolicy::KeepFirst => row.seq < held_seq,
                        DuplicatePolicy::KeepLatest => row.seq > held_seq,
                    };
                    if replace {
                        slot.insert((row.seq, obs));
                    }
                }
            }
        }

        let mut tickers = 0u64;
        let mut last: Option<&str> = None;
        for (ticker, _) in kept.keys() {
            if last != Some(ticker.as_str()) {
                tickers += 1;
                last = Some(ticker.as_str());
            }
        }
        self.stats.tickers = tickers;

        let cleaned: Vec<PriceObservation> = kept.into_values().map(|(_, obs)| obs).collect();
        self.stats.output_rows = cleaned.len() as u64;

        info!(
            input_rows = self.stats.input_rows,
            output_rows = self.stats.output_rows,
            rejected = self.stats.rejected_rows(),
            duplicates = self.stats.duplicate_rows,
            tickers = self.stats.tickers,
            "cleaned raw prices"
        );

        Ok(cleaned)
    }

    /// Get statistics from the last run.
    pub fn stats(&self) -> &CleaningStats {
        &self.stats
    }
}
