//! Row types for every layer of the punta pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::datum::Datum;

/// Ticker identifier (e.g., "NVDA").
pub type Ticker = String;

/// Position of a raw row in ingestion order.
pub type IngestSeq = u64;

/// Column names the ingestion boundary must supply, in table order.
pub const RAW_COLUMNS: [&str; 8] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "adjusted_close",
    "volume",
    "ticker",
];

/// Price column names, in the order `PriceFields::as_array` returns them.
pub const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "adjusted_close"];

/// One raw row as delivered by the ingestion boundary, not yet type-checked.
///
/// Fields carry the textual form read from the raw table so that the
/// cleaning stage, not the reader, decides what a cast failure means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    /// Ingestion order.
    pub seq: IngestSeq,
    pub date: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub adjusted_close: Option<String>,
    pub volume: Option<String>,
    pub ticker: Option<String>,
}

/// The five price fields of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceFields {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
}

impl PriceFields {
    /// Fields in `PRICE_COLUMNS` order.
    #[inline]
    pub fn as_array(&self) -> [f64; 5] {
        [self.open, self.high, self.low, self.close, self.adjusted_close]
    }

    /// Build from an array in `PRICE_COLUMNS` order.
    #[inline]
    pub fn from_array(v: [f64; 5]) -> Self {
        Self {
            open: v[0],
            high: v[1],
            low: v[2],
            close: v[3],
            adjusted_close: v[4],
        }
    }

    /// Check that every field is finite and strictly positive.
    #[inline]
    pub fn all_positive(&self) -> bool {
        self.as_array().iter().all(|p| p.is_finite() && *p > 0.0)
    }
}

/// A typed daily OHLCV observation (bronze layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub ticker: Ticker,
    pub date: NaiveDate,
    pub prices: PriceFields,
    pub volume: i64,
}

/// A winsorized observation with point-in-time validity (silver layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilizedObservation {
    pub ticker: Ticker,
    pub date: NaiveDate,
    pub prices: PriceFields,
    pub volume: i64,
    /// First date this row is valid (the observation date).
    pub valid_from: NaiveDate,
    /// Open-ended when `None`: valid until the next observation supersedes it.
    pub valid_to: Option<NaiveDate>,
}

/// Model input row (gold layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub ticker: Ticker,
    pub prices: PriceFields,
    pub volume: i64,
    /// Trailing return over the horizon.
    pub momentum_12m: Datum<f64>,
}

impl FeatureRow {
    /// Check if every feature is defined.
    pub fn is_complete(&self) -> bool {
        self.momentum_12m.is_defined()
    }
}

/// Model target row (gold layer), aligned one-to-one with `FeatureRow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRow {
    pub date: NaiveDate,
    pub ticker: Ticker,
    pub stock_fwd_ret: Datum<f64>,
    pub spy_fwd_ret: Datum<f64>,
    pub excess_return_12m: Datum<f64>,
    pub hit_2pct: Datum<bool>,
}

impl LabelRow {
    /// Check if the row can be used as a training target.
    pub fn is_trainable(&self) -> bool {
        self.excess_return_12m.is_defined() && self.hit_2pct.is_defined()
    }
}
