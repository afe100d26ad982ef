//! Gold rows as downstream readers see them.
//!
//! The store keeps undefined values as SQL NULL, so the reason a value is
//! undefined does not survive a round trip. Readers get `Option`s and apply
//! their own masking.

use chrono::NaiveDate;
use punta_core::{FeatureRow, LabelRow, PriceFields};
use serde::{Deserialize, Serialize};

/// One stored row of the feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub prices: PriceFields,
    pub volume: i64,
    pub momentum_12m: Option<f64>,
}

impl From<&FeatureRow> for FeatureRecord {
    fn from(row: &FeatureRow) -> Self {
        Self {
            date: row.date,
            ticker: row.ticker.clone(),
            prices: row.prices,
            volume: row.volume,
            momentum_12m: row.momentum_12m.value(),
        }
    }
}

/// One stored row of the label table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub stock_fwd_ret: Option<f64>,
    pub spy_fwd_ret: Option<f64>,
    pub excess_return_12m: Option<f64>,
    pub hit_2pct: Option<bool>,
}

impl LabelRecord {
    /// Check if the row can be used as a training target.
    pub fn is_trainable(&self) -> bool {
        self.excess_return_12m.is_some() && self.hit_2pct.is_some()
    }
}

impl From<&LabelRow> for LabelRecord {
    fn from(row: &LabelRow) -> Self {
        Self {
            date: row.date,
            ticker: row.ticker.clone(),
            stock_fwd_ret: row.stock_fwd_ret.value(),
            spy_fwd_ret: row.spy_fwd_ret.value(),
            excess_return_12m: row.excess_return_12m.value(),
            hit_2pct: row.hit_2pct.value(),
        }
    }
}
