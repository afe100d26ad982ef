//! Gold-layer feature/label engine.
//!
//! Partitions stabilized rows by ticker, orders each partition by date and
//! derives momentum features and excess-return labels against the
//! benchmark. Every row-offset computation below assumes that date order,
//! never the order rows arrived in.

use std::collections::BTreeMap;

use punta_core::config::{ExecutionConfig, LabelConfig};
use punta_core::{
    Error, FeatureRow, LabelRow, Result, StabilizedObservation, Ticker,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::benchmark::BenchmarkReturns;
use crate::returns::{forward_returns, trailing_returns};

/// Summary of one gold run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GoldReport {
    /// Non-benchmark tickers processed.
    pub tickers: u64,
    /// Rows emitted (features and labels alike).
    pub rows: u64,
    /// Rows with a defined momentum feature.
    pub complete_features: u64,
    /// Rows with a defined excess return and hit label.
    pub trainable_labels: u64,
    /// Rows labelled as a hit.
    pub hits: u64,
    /// Benchmark dates available for the join.
    pub benchmark_dates: u64,
}

impl GoldReport {
    /// Fraction of trainable rows that are hits.
    pub fn hit_rate(&self) -> f64 {
        if self.trainable_labels > 0 {
            self.hits as f64 / self.trainable_labels as f64
        } else {
            0.0
        }
    }
}

/// Row-aligned gold tables.
#[derive(Debug, Clone, Default)]
pub struct GoldOutput {
    /// Feature rows, ordered by ticker then date.
    pub features: Vec<FeatureRow>,
    /// Label rows, index-aligned with `features`.
    pub labels: Vec<LabelRow>,
    /// Run summary.
    pub report: GoldReport,
}

/// Feature/label computation engine.
pub struct GoldEngine {
    benchmark_ticker: Ticker,
    horizon: usize,
    hit_threshold: f64,
    workers: u32,
}

impl GoldEngine {
    /// Create a new engine from configuration.
    pub fn new(labels: &LabelConfig, execution: &ExecutionConfig) -> Self {
        Self {
            benchmark_ticker: labels.benchmark_ticker.clone(),
            horizon: labels.horizon,
            hit_threshold: labels.hit_threshold,
            workers: execution.workers,
        }
    }

    /// Compute the feature and label tables.
    ///
    /// Fails if the benchmark ticker is absent or a ticker has two rows on
    /// the same date.
    pub fn compute(&self, rows: Vec<StabilizedObservation>) -> Result<GoldOutput> {
        let mut partitions = partition_by_ticker(rows)?;

        let benchmark = partitions.remove(&self.benchmark_ticker).ok_or_else(|| {
            Error::missing_dependency(format!(
                "benchmark ticker '{}' not found among {} ticker(s) in stabilized input",
                self.benchmark_ticker,
                partitions.len()
            ))
        })?;
        let bench = BenchmarkReturns::from_partition(&benchmark, self.horizon);
        debug!(
            ticker = %self.benchmark_ticker,
            dates = bench.len(),
            defined = bench.defined_count(),
            "built benchmark forward returns"
        );

        let partitions: Vec<(Ticker, Vec<StabilizedObservation>)> =
            partitions.into_iter().collect();
        let results = self.label_partitions(&partitions, &bench)?;

        let total: usize = results.iter().map(|(f, _)| f.len()).sum();
        let mut output = GoldOutput {
            features: Vec::with_capacity(total),
            labels: Vec::with_capacity(total),
            report: GoldReport {
                tickers: partitions.len() as u64,
                benchmark_dates: bench.len() as u64,
                ..GoldReport::default()
            },
        };
        for (features, labels) in results {
            output.features.extend(features);
            output.labels.extend(labels);
        }

        let report = &mut output.report;
        report.rows = output.features.len() as u64;
        report.complete_features = output.features.iter().filter(|f| f.is_complete()).count() as u64;
        report.trainable_labels = output.labels.iter().filter(|l| l.is_trainable()).count() as u64;
        report.hits = output
            .labels
            .iter()
            .filter(|l| l.hit_2pct.value() == Some(true))
            .count() as u64;

        info!(
            tickers = report.tickers,
            rows = report.rows,
            trainable = report.trainable_labels,
            hits = report.hits,
            hit_rate = report.hit_rate(),
            "computed features and labels"
        );

        Ok(output)
    }

    /// Run every partition, preserving ticker order regardless of worker count.
    fn label_partitions(
        &self,
        partitions: &[(Ticker, Vec<StabilizedObservation>)],
        bench: &BenchmarkReturns,
    ) -> Result<Vec<(Vec<FeatureRow>, Vec<LabelRow>)>> {
        let work = |(ticker, rows): &(Ticker, Vec<StabilizedObservation>)| {
            self.label_partition(ticker, rows, bench)
        };

        match self.workers {
            1 => Ok(partitions.iter().map(work).collect()),
            0 => Ok(partitions.par_iter().map(work).collect()),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n as usize)
                    .build()
                    .map_err(|e| Error::config(format!("cannot build worker pool: {e}")))?;
                Ok(pool.install(|| partitions.par_iter().map(work).collect()))
            }
        }
    }

    /// Compute one ticker's rows. `rows` must be sorted by date.
    fn label_partition(
        &self,
        ticker: &str,
        rows: &[StabilizedObservation],
        bench: &BenchmarkReturns,
    ) -> (Vec<FeatureRow>, Vec<LabelRow>) {
        let adj: Vec<f64> = rows.iter().map(|r| r.prices.adjusted_close).collect();
        let momentum = trailing_returns(&adj, self.horizon);
        let stock_fwd = forward_returns(&adj, self.horizon);

        let mut features = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());

        for ((row, momentum_12m), stock_fwd_ret) in rows.iter().zip(momentum).zip(stock_fwd) {
            let spy_fwd_ret = bench.lookup(row.date);
            let excess_return_12m = stock_fwd_ret.zip_with(spy_fwd_ret, |s, b| s - b);
            let hit_2pct = excess_return_12m.map(|e| e >= self.hit_threshold);

            features.push(FeatureRow {
                date: row.date,
                ticker: ticker.to_string(),
                prices: row.prices,
                volume: row.volume,
                momentum_12m,
            });
            labels.push(LabelRow {
                date: row.date,
                ticker: ticker.to_string(),
                stock_fwd_ret,
                spy_fwd_ret,
                excess_return_12m,
                hit_2pct,
            });
        }

        (features, labels)
    }
}

/// Group rows by ticker and sort each group ascending by date.
fn partition_by_ticker(
    rows: Vec<StabilizedObservation>,
) -> Result<BTreeMap<Ticker, Vec<StabilizedObservation>>> {
    let mut partitions: BTreeMap<Ticker, Vec<StabilizedObservation>> = BTreeMap::new();
    for row in rows {
        partitions.entry(row.ticker.clone()).or_default().push(row);
    }

    for (ticker, rows) in partitions.iter_mut() {
        rows.sort_by_key(|r| r.date);
        if let Some(pair) = rows.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(Error::data(format!(
                "ticker '{}' has more than one row on {}",
                ticker, pair[0].date
            )));
        }
    }

    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};
    use punta_core::{Datum, PriceFields, UndefinedReason};

    fn series(ticker: &str, start: NaiveDate, prices: &[f64]) -> Vec<StabilizedObservation> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let date = start + Days::new(i as u64);
                StabilizedObservation {
                    ticker: ticker.to_string(),
                    date,
                    prices: PriceFields::from_array([p; 5]),
                    volume: 1_000,
                    valid_from: date,
                    valid_to: None,
                }
            })
            .collect()
    }

    fn engine(horizon: usize, workers: u32) -> GoldEngine {
        let labels = LabelConfig {
            benchmark_ticker: "BMK".to_string(),
            horizon,
            hit_threshold: 0.02,
        };
        GoldEngine::new(&labels, &ExecutionConfig { workers })
    }

    fn day0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    #[test]
    fn test_missing_benchmark_fails_fast() {
        let rows = series("AAA", day0(), &[1.0, 2.0, 3.0]);
        let err = engine(1, 1).compute(rows).unwrap_err();
        assert!(err.is_missing_dependency());
        assert!(err.to_string().contains("BMK"));
    }

    #[test]
    fn test_benchmark_excluded_from_output() {
        let mut rows = series("AAA", day0(), &[1.0, 2.0, 3.0]);
        rows.extend(series("BMK", day0(), &[1.0, 1.0, 1.0]));

        let out = engine(1, 1).compute(rows).unwrap();

        assert_eq!(out.features.len(), 3);
        assert!(out.features.iter().all(|f| f.ticker == "AAA"));
        assert!(out.labels.iter().all(|l| l.ticker == "AAA"));
    }

    #[test]
    fn test_unsorted_input_is_ordered_by_date() {
        let mut rows = series("AAA", day0(), &[100.0, 110.0, 121.0]);
        rows.reverse();
        rows.extend(series("BMK", day0(), &[100.0, 100.0, 100.0]));

        let out = engine(1, 1).compute(rows).unwrap();

        assert!(out.features.windows(2).all(|w| w[0].date < w[1].date));
        assert_relative_eq!(out.features[1].momentum_12m.value().unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(out.labels[0].stock_fwd_ret.value().unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_excess_and_hit() {
        let mut rows = series("AAA", day0(), &[100.0, 110.0, 100.0, 101.0]);
        rows.extend(series("BMK", day0(), &[100.0, 105.0, 100.0, 100.0]));

        let out = engine(1, 1).compute(rows).unwrap();
        let l = &out.labels;

        // t0: 0.10 - 0.05 = 0.05 -> hit
        assert_relative_eq!(l[0].excess_return_12m.value().unwrap(), 0.05, epsilon = 1e-12);
        assert_eq!(l[0].hit_2pct, Datum::Defined(true));
        // t2: 0.01 - 0.00 = 0.01 -> miss
        assert_relative_eq!(l[2].excess_return_12m.value().unwrap(), 0.01, epsilon = 1e-12);
        assert_eq!(l[2].hit_2pct, Datum::Defined(false));
        // t3: no forward observation
        assert_eq!(
            l[3].hit_2pct,
            Datum::Undefined(UndefinedReason::NoForwardObservation)
        );
        assert_eq!(out.report.trainable_labels, 3);
        assert_eq!(out.report.hits, 1);
        assert_relative_eq!(out.report.hit_rate(), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hit_rate_without_trainable_rows() {
        assert_eq!(GoldReport::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_non_overlapping_calendar_kept_as_undefined() {
        let mut rows = series("AAA", day0(), &[100.0, 110.0, 120.0, 130.0]);
        // Benchmark starts two days later.
        rows.extend(series("BMK", day0() + Days::new(2), &[100.0, 101.0, 102.0, 103.0]));

        let out = engine(1, 1).compute(rows).unwrap();

        assert_eq!(out.labels.len(), 4);
        assert_eq!(
            out.labels[0].spy_fwd_ret,
            Datum::Undefined(UndefinedReason::MissingBenchmark)
        );
        assert_eq!(
            out.labels[0].excess_return_12m,
            Datum::Undefined(UndefinedReason::MissingBenchmark)
        );
        assert!(out.labels[2].excess_return_12m.is_defined());
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let mut rows = series("AAA", day0(), &[1.0, 2.0]);
        rows.extend(series("AAA", day0(), &[3.0]));
        rows.extend(series("BMK", day0(), &[1.0, 1.0]));

        assert!(matches!(engine(1, 1).compute(rows), Err(Error::Data(_))));
    }

    #[test]
    fn test_five_hundred_row_scenario() {
        let aaa: Vec<f64> = (0..500).map(|i| 50.0 + i as f64 * 0.1).collect();
        let bmk: Vec<f64> = (0..500).map(|i| 300.0 + i as f64 * 0.2).collect();
        let mut rows = series("AAA", day0(), &aaa);
        rows.extend(series("BMK", day0(), &bmk));

        let out = engine(252, 1).compute(rows).unwrap();

        assert_eq!(out.features.len(), 500);
        assert_eq!(out.labels.len(), 500);
        assert!(out.features[..252].iter().all(|f| !f.momentum_12m.is_defined()));
        assert!(out.features[252..].iter().all(|f| f.momentum_12m.is_defined()));
        for l in &out.labels[248..] {
            assert!(!l.stock_fwd_ret.is_defined());
            assert!(!l.excess_return_12m.is_defined());
            assert!(!l.hit_2pct.is_defined());
        }
        assert_eq!(out.labels.iter().filter(|l| l.is_trainable()).count(), 248);
        assert_eq!(out.report.trainable_labels, 248);
    }

    #[test]
    fn test_worker_counts_agree() {
        let mut rows = Vec::new();
        for (k, t) in ["AAA", "BBB", "CCC", "DDD"].iter().enumerate() {
            let px: Vec<f64> = (0..40).map(|i| 10.0 + ((i * (k + 1)) % 7) as f64).collect();
            rows.extend(series(t, day0(), &px));
        }
        rows.extend(series("BMK", day0(), &[20.0; 40]));

        let sequential = engine(5, 1).compute(rows.clone()).unwrap();
        let auto = engine(5, 0).compute(rows.clone()).unwrap();
        let pooled = engine(5, 3).compute(rows).unwrap();

        assert_eq!(sequential.features, auto.features);
        assert_eq!(sequential.labels, auto.labels);
        assert_eq!(sequential.labels, pooled.labels);
        let tickers: Vec<&str> = sequential.features.iter().map(|f| f.ticker.as_str()).collect();
        assert!(tickers.windows(2).all(|w| w[0] <= w[1]));
    }
}
