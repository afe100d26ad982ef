//! Silver-layer stabilization: global winsorization and validity stamps.
//!
//! Bounds are `mean ± sigma * stddev` per price column, computed once over
//! the whole input with every ticker pooled. High-priced tickers therefore
//! dominate the statistics; the band is not per-ticker and not rolling.

use std::collections::HashMap;

use chrono::NaiveDate;
use punta_core::config::StabilizationConfig;
use punta_core::{
    PriceFields, PriceObservation, StabilizedObservation, Ticker, PRICE_COLUMNS,
};
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::info;

/// Clip band for one price column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnBounds {
    /// Column name.
    pub column: &'static str,
    /// Mean over the stage input.
    pub mean: f64,
    /// Sample standard deviation over the stage input (NaN below two rows).
    pub std_dev: f64,
    /// Lower clip bound.
    pub lower: f64,
    /// Upper clip bound.
    pub upper: f64,
    /// Values moved onto a bound.
    pub clipped: u64,
}

impl ColumnBounds {
    /// Check if the band is usable. Without a finite deviation nothing is clipped.
    pub fn is_active(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    /// Clip one value into the band.
    #[inline]
    pub fn clip(&self, value: f64) -> f64 {
        if self.is_active() {
            value.clamp(self.lower, self.upper)
        } else {
            value
        }
    }
}

/// Summary of one stabilization run.
#[derive(Debug, Clone, Serialize)]
pub struct StabilizationReport {
    /// Rows in and out (identical; no row is dropped).
    pub rows: u64,
    /// Bounds in `PRICE_COLUMNS` order.
    pub bounds: Vec<ColumnBounds>,
}

impl StabilizationReport {
    /// Total values clipped across columns.
    pub fn total_clipped(&self) -> u64 {
        self.bounds.iter().map(|b| b.clipped).sum()
    }
}

/// Global winsorizer for the five price columns.
pub struct Winsorizer {
    sigma: f64,
}

impl Winsorizer {
    /// Create a new winsorizer with a band of `sigma` standard deviations.
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    /// Create a winsorizer from configuration.
    pub fn from_config(config: &StabilizationConfig) -> Self {
        Self::new(config.sigma)
    }

    /// Compute the clip band of every price column over `rows`.
    pub fn bounds(&self, rows: &[PriceObservation]) -> Vec<ColumnBounds> {
        PRICE_COLUMNS
            .iter()
            .enumerate()
            .map(|(idx, &column)| {
                let values: Vec<f64> = rows.iter().map(|r| r.prices.as_array()[idx]).collect();
                let mean = values.iter().mean();
                let std_dev = values.iter().std_dev();
                ColumnBounds {
                    column,
                    mean,
                    std_dev,
                    lower: mean - self.sigma * std_dev,
                    upper: mean + self.sigma * std_dev,
                    clipped: 0,
                }
            })
            .collect()
    }

    /// Winsorize prices and stamp `valid_from = date`, `valid_to = None`.
    ///
    /// Returns one output row per input row, in input order.
    pub fn stabilize(
        &self,
        rows: Vec<PriceObservation>,
    ) -> (Vec<StabilizedObservation>, StabilizationReport) {
        let mut bounds = self.bounds(&rows);

        let stabilized: Vec<StabilizedObservation> = rows
            .into_iter()
            .map(|obs| {
                let mut prices = obs.prices.as_array();
                for (value, band) in prices.iter_mut().zip(bounds.iter_mut()) {
                    let clipped = band.clip(*value);
                    if clipped != *value {
                        band.clipped += 1;
                    }
                    *value = clipped;
                }
                StabilizedObservation {
                    valid_from: obs.date,
                    valid_to: None,
                    ticker: obs.ticker,
                    date: obs.date,
                    prices: PriceFields::from_array(prices),
                    volume: obs.volume,
                }
            })
            .collect();

        for band in &bounds {
            info!(
                column = band.column,
                lower = band.lower,
                upper = band.upper,
                clipped = band.clipped,
                "winsorized price column"
            );
        }
        info!(rows = stabilized.len(), "stabilized prices");

        let report = StabilizationReport {
            rows: stabilized.len() as u64,
            bounds,
        };
        (stabilized, report)
    }
}

/// Fill `valid_to` with the next observation date of the same ticker.
///
/// The silver table leaves `valid_to` open; consumers that need closed
/// intervals call this on their own copy. The last row of each ticker stays
/// open-ended.
pub fn resolve_validity(rows: &mut [StabilizedObservation]) {
    let mut by_ticker: HashMap<Ticker, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        by_ticker.entry(row.ticker.clone()).or_default().push(idx);
    }

    for mut indices in by_ticker.into_values() {
        indices.sort_by_key(|&i| rows[i].date);
        let dates: Vec<NaiveDate> = indices.iter().map(|&i| rows[i].date).collect();
        for (pos, &i) in indices.iter().enumerate() {
            rows[i].valid_to = dates.get(pos + 1).copied();
        }
    }
}
