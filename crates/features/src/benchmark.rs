//! Benchmark forward returns, shared read-only across ticker partitions.

use std::collections::HashMap;

use chrono::NaiveDate;
use punta_core::{Datum, StabilizedObservation, UndefinedReason};

use crate::returns::forward_returns;

/// Benchmark forward return per date.
///
/// Built once from the date-sorted benchmark partition, then only read.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkReturns {
    by_date: HashMap<NaiveDate, Datum<f64>>,
}

impl BenchmarkReturns {
    /// Build from the benchmark partition, which must already be sorted by date.
    pub fn from_partition(rows: &[StabilizedObservation], horizon: usize) -> Self {
        let prices: Vec<f64> = rows.iter().map(|r| r.prices.adjusted_close).collect();
        let by_date = rows
            .iter()
            .map(|r| r.date)
            .zip(forward_returns(&prices, horizon))
            .collect();
        Self { by_date }
    }

    /// Left-join lookup: a date the benchmark never traded is `MissingBenchmark`.
    #[inline]
    pub fn lookup(&self, date: NaiveDate) -> Datum<f64> {
        self.by_date
            .get(&date)
            .copied()
            .unwrap_or(Datum::Undefined(UndefinedReason::MissingBenchmark))
    }

    /// Number of benchmark dates.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Number of dates with a defined forward return.
    pub fn defined_count(&self) -> usize {
        self.by_date.values().filter(|d| d.is_defined()).count()
    }
}
