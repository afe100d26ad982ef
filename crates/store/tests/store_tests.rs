//! Integration tests for the DuckDB store.

use std::io::Write;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use punta_core::{
    Datum, Error, FeatureRow, LabelRow, PriceFields, PriceObservation, RawPriceRow,
    StabilizedObservation, UndefinedReason,
};
use punta_store::PriceStore;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn observation(ticker: &str, date: NaiveDate, px: f64) -> PriceObservation {
    PriceObservation {
        ticker: ticker.to_string(),
        date,
        prices: PriceFields::from_array([px, px + 1.0, px - 1.0, px, px]),
        volume: 1_000,
    }
}

fn stabilized(ticker: &str, date: NaiveDate, px: f64) -> StabilizedObservation {
    StabilizedObservation {
        ticker: ticker.to_string(),
        date,
        prices: PriceFields::from_array([px; 5]),
        volume: 10,
        valid_from: date,
        valid_to: None,
    }
}

fn raw(date: &str, close: &str, volume: Option<&str>, ticker: &str) -> RawPriceRow {
    RawPriceRow {
        seq: 0,
        date: Some(date.to_string()),
        open: Some(close.to_string()),
        high: Some(close.to_string()),
        low: Some(close.to_string()),
        close: Some(close.to_string()),
        adjusted_close: Some(close.to_string()),
        volume: volume.map(str::to_string),
        ticker: Some(ticker.to_string()),
    }
}

// ── Raw layer ──

#[test]
fn test_raw_round_trip_keeps_ingestion_order() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let rows = vec![
        raw("2020-01-03", "11.5", Some("200"), "BBB"),
        raw("2020-01-02", "10.0", None, "AAA"),
    ];

    store.replace_raw("raw.prices", &rows).unwrap();
    let loaded = store.load_raw("raw.prices").unwrap();

    assert_eq!(loaded.len(), 2);
    assert!(loaded[0].seq < loaded[1].seq);
    assert_eq!(loaded[0].ticker.as_deref(), Some("BBB"));
    assert_eq!(loaded[0].close.as_deref(), Some("11.5"));
    assert_eq!(loaded[1].volume, None);
    assert_eq!(
        store.table_columns("raw.prices").unwrap(),
        vec!["date", "open", "high", "low", "close", "adjusted_close", "volume", "ticker"]
    );
}

#[test]
fn test_import_raw_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "date,open,high,low,close,adjusted_close,volume,ticker").unwrap();
    writeln!(file, "2020-01-02,10.0,10.5,9.5,10.25,10.1,1500,AAA").unwrap();
    writeln!(file, "2020-01-02,300.0,301.0,299.0,300.5,300.5,90000,SPY").unwrap();
    drop(file);

    let mut store = PriceStore::open_in_memory().unwrap();
    let imported = store.import_raw_csv("raw.prices", &path).unwrap();
    let loaded = store.load_raw("raw.prices").unwrap();

    assert_eq!(imported, 2);
    assert_eq!(loaded[0].date.as_deref(), Some("2020-01-02"));
    assert_eq!(loaded[0].close.as_deref(), Some("10.25"));
    assert_eq!(loaded[1].ticker.as_deref(), Some("SPY"));
}

#[test]
fn test_import_missing_csv() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let err = store.import_raw_csv("raw.prices", "/nonexistent/prices.csv").unwrap_err();
    assert!(err.is_missing_dependency());
}

// ── Bronze and silver layers ──

#[test]
fn test_cleaned_round_trip() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let rows = vec![
        observation("BBB", ymd(2020, 1, 2), 50.0),
        observation("AAA", ymd(2020, 1, 3), 10.0),
        observation("AAA", ymd(2020, 1, 2), 9.0),
    ];

    store.replace_cleaned("bronze.prices", &rows).unwrap();
    let loaded = store.load_cleaned("bronze.prices").unwrap();

    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded[0], rows[2]);
    assert_eq!(loaded[1], rows[1]);
    assert_eq!(loaded[2], rows[0]);
}

#[test]
fn test_replace_does_not_accumulate() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let rows = vec![observation("AAA", ymd(2020, 1, 2), 9.0)];

    store.replace_cleaned("bronze.prices", &rows).unwrap();
    store.replace_cleaned("bronze.prices", &rows).unwrap();

    assert_eq!(store.row_count("bronze.prices").unwrap(), 1);
}

#[test]
fn test_failed_replace_keeps_previous_table() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let good = vec![observation("AAA", ymd(2020, 1, 2), 9.0)];
    store.replace_cleaned("bronze.prices", &good).unwrap();

    let clash = vec![
        observation("AAA", ymd(2020, 1, 2), 1.0),
        observation("AAA", ymd(2020, 1, 3), 2.0),
        observation("AAA", ymd(2020, 1, 2), 3.0),
    ];
    let err = store.replace_cleaned("bronze.prices", &clash).unwrap_err();

    assert!(matches!(err, Error::Database(_)));
    assert_eq!(store.load_cleaned("bronze.prices").unwrap(), good);
}

#[test]
fn test_bulk_write_keeps_every_row() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let start = ymd(2000, 1, 3);
    let rows: Vec<PriceObservation> = (0..5_000u64)
        .map(|i| observation("AAA", start + chrono::Days::new(i), 10.0 + i as f64))
        .collect();

    store.replace_cleaned("bronze.prices", &rows).unwrap();
    let loaded = store.load_cleaned("bronze.prices").unwrap();

    assert_eq!(loaded.len(), 5_000);
    assert_eq!(loaded.first(), rows.first());
    assert_eq!(loaded.last(), rows.last());
}

#[test]
fn test_stabilized_round_trip_with_validity() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let mut closed = stabilized("AAA", ymd(2020, 1, 2), 10.0);
    closed.valid_to = Some(ymd(2020, 1, 3));
    let rows = vec![closed, stabilized("AAA", ymd(2020, 1, 3), 10.5)];

    store.replace_stabilized("silver.prices", &rows).unwrap();
    let loaded = store.load_stabilized("silver.prices").unwrap();

    assert_eq!(loaded, rows);
}

#[test]
fn test_missing_table_is_missing_dependency() {
    let store = PriceStore::open_in_memory().unwrap();

    assert!(!store.table_exists("silver.prices").unwrap());
    let err = store.load_stabilized("silver.prices").unwrap_err();
    assert!(err.is_missing_dependency());
}

#[test]
fn test_invalid_table_name_rejected() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let err = store.replace_cleaned("bronze.prices; DROP", &[]).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

// ── Gold layer ──

#[test]
fn test_gold_round_trip_stores_undefined_as_null() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let date = ymd(2021, 3, 1);
    let features = vec![
        FeatureRow {
            date,
            ticker: "AAA".to_string(),
            prices: PriceFields::from_array([10.0; 5]),
            volume: 5,
            momentum_12m: Datum::Defined(0.25),
        },
        FeatureRow {
            date,
            ticker: "BBB".to_string(),
            prices: PriceFields::from_array([20.0; 5]),
            volume: 6,
            momentum_12m: Datum::Undefined(UndefinedReason::InsufficientHistory),
        },
    ];
    let labels = vec![
        LabelRow {
            date,
            ticker: "AAA".to_string(),
            stock_fwd_ret: Datum::Defined(0.10),
            spy_fwd_ret: Datum::Defined(0.05),
            excess_return_12m: Datum::Defined(0.05),
            hit_2pct: Datum::Defined(true),
        },
        LabelRow {
            date,
            ticker: "BBB".to_string(),
            stock_fwd_ret: Datum::Defined(0.10),
            spy_fwd_ret: Datum::Undefined(UndefinedReason::MissingBenchmark),
            excess_return_12m: Datum::Undefined(UndefinedReason::MissingBenchmark),
            hit_2pct: Datum::Undefined(UndefinedReason::MissingBenchmark),
        },
    ];

    store
        .replace_gold("gold.features", "gold.labels", &features, &labels)
        .unwrap();
    let loaded_features = store.load_features("gold.features").unwrap();
    let loaded_labels = store.load_labels("gold.labels").unwrap();

    assert_eq!(loaded_features.len(), 2);
    assert_relative_eq!(loaded_features[0].momentum_12m.unwrap(), 0.25);
    assert_eq!(loaded_features[1].momentum_12m, None);

    assert!(loaded_labels[0].is_trainable());
    assert_eq!(loaded_labels[0].hit_2pct, Some(true));
    assert!(!loaded_labels[1].is_trainable());
    assert_eq!(loaded_labels[1].spy_fwd_ret, None);
    assert_relative_eq!(loaded_labels[1].stock_fwd_ret.unwrap(), 0.10);
}

#[test]
fn test_gold_requires_aligned_rows() {
    let mut store = PriceStore::open_in_memory().unwrap();
    let features = vec![FeatureRow {
        date: ymd(2021, 3, 1),
        ticker: "AAA".to_string(),
        prices: PriceFields::from_array([10.0; 5]),
        volume: 5,
        momentum_12m: Datum::Defined(0.25),
    }];

    let err = store
        .replace_gold("gold.features", "gold.labels", &features, &[])
        .unwrap_err();

    assert!(matches!(err, Error::Data(_)));
    assert!(!store.table_exists("gold.features").unwrap());
}

#[test]
fn test_open_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("punta.duckdb");

    let mut store = PriceStore::open(&path).unwrap();
    store
        .replace_cleaned("bronze.prices", &[observation("AAA", ymd(2020, 1, 2), 9.0)])
        .unwrap();
    drop(store);

    let reopened = PriceStore::open(&path).unwrap();
    assert_eq!(reopened.row_count("bronze.prices").unwrap(), 1);
}
