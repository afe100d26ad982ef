//! Type casting of raw rows into typed observations.
//!
//! A value that is present but cannot be read as its column type is a
//! schema error and aborts the stage, even when another column of the same
//! row is NULL. A missing (NULL) price or volume is not an error: the row
//! simply fails the positivity predicate, the same way a relational
//! `WHERE volume > 0` drops NULLs.
//!
//! Tickers are taken verbatim; no trimming or case folding.

use chrono::{NaiveDate, NaiveDateTime};
use punta_core::{Error, PriceFields, PriceObservation, RawPriceRow, Result};

/// Result of casting one raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum CastOutcome {
    /// Every column was present and well-typed.
    Typed(PriceObservation),
    /// A numeric column was NULL.
    MissingValue(&'static str),
}

/// Cast a raw row to the fixed bronze schema.
pub fn cast_row(row: &RawPriceRow) -> Result<CastOutcome> {
    let ticker = match row.ticker.as_deref() {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            return Err(Error::schema(format!("row {}: ticker is null or empty", row.seq)));
        }
    };
    let date = match row.date.as_deref() {
        Some(raw) => parse_date(raw).ok_or_else(|| cast_error(row, "date", raw, "DATE"))?,
        None => {
            return Err(Error::schema(format!("row {}: date is null", row.seq)));
        }
    };

    let columns = [
        ("open", &row.open),
        ("high", &row.high),
        ("low", &row.low),
        ("close", &row.close),
        ("adjusted_close", &row.adjusted_close),
    ];
    // Every present value is cast before a NULL is reported.
    let mut missing: Option<&'static str> = None;
    let mut prices = [0.0; 5];
    for (slot, (name, value)) in prices.iter_mut().zip(columns) {
        match value.as_deref() {
            Some(raw) => {
                *slot = parse_price(raw).ok_or_else(|| cast_error(row, name, raw, "DOUBLE"))?;
            }
            None => {
                missing.get_or_insert(name);
            }
        }
    }

    let volume = match row.volume.as_deref() {
        Some(raw) => {
            Some(parse_volume(raw).ok_or_else(|| cast_error(row, "volume", raw, "BIGINT"))?)
        }
        None => None,
    };

    let volume = match (missing, volume) {
        (Some(column), _) => return Ok(CastOutcome::MissingValue(column)),
        (None, None) => return Ok(CastOutcome::MissingValue("volume")),
        (None, Some(volume)) => volume,
    };

    Ok(CastOutcome::Typed(PriceObservation {
        ticker,
        date,
        prices: PriceFields::from_array(prices),
        volume,
    }))
}

fn cast_error(row: &RawPriceRow, column: &str, raw: &str, ty: &str) -> Error {
    Error::schema(format!(
        "row {}: column '{}' value '{}' cannot be cast to {}",
        row.seq, column, raw, ty
    ))
}

/// Parse a calendar date; timestamps are truncated to their date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

/// Parse a price. `NaN` and infinities parse; positivity rejects them later.
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Parse a volume. Integral floats such as `1200.0` are accepted.
pub fn parse_volume(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
