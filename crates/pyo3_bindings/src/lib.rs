//! PyO3 bindings for the punta price pipeline.
//!
//! Exposes pipeline runs and the gold tables to the Python training and
//! explainability code:
//! - Stage runs against a configured store
//! - Default configuration as JSON
//! - Typed readers for the feature and label tables

use std::path::PathBuf;

use pyo3::exceptions::{PyLookupError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use punta_core::{Error as RustError, PipelineConfig};
use punta_runner::{Pipeline, Stage};
use punta_store::{
    FeatureRecord as RustFeatureRecord, LabelRecord as RustLabelRecord, PriceStore,
};

fn to_py_err(e: RustError) -> PyErr {
    match e {
        RustError::Config(_) | RustError::Schema(_) | RustError::Json(_) => {
            PyValueError::new_err(e.to_string())
        }
        RustError::MissingDependency(_) => PyLookupError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn load_config(config_path: Option<&str>, db: Option<&str>) -> PyResult<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_json_file(path).map_err(to_py_err)?,
        None => PipelineConfig::default(),
    };
    if let Some(db) = db {
        config.store.path = PathBuf::from(db);
    }
    config.validate().map_err(to_py_err)?;
    Ok(config)
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// One row of the feature table.
#[pyclass]
#[derive(Clone)]
pub struct FeatureRecord {
    /// ISO date.
    #[pyo3(get)]
    pub date: String,
    #[pyo3(get)]
    pub ticker: String,
    #[pyo3(get)]
    pub open: f64,
    #[pyo3(get)]
    pub high: f64,
    #[pyo3(get)]
    pub low: f64,
    #[pyo3(get)]
    pub close: f64,
    #[pyo3(get)]
    pub adjusted_close: f64,
    #[pyo3(get)]
    pub volume: i64,
    #[pyo3(get)]
    pub momentum_12m: Option<f64>,
}

#[pymethods]
impl FeatureRecord {
    fn __repr__(&self) -> String {
        format!(
            "FeatureRecord(date={}, ticker={}, adjusted_close={:.4}, momentum_12m={:?})",
            self.date, self.ticker, self.adjusted_close, self.momentum_12m
        )
    }
}

impl From<RustFeatureRecord> for FeatureRecord {
    fn from(r: RustFeatureRecord) -> Self {
        FeatureRecord {
            date: r.date.to_string(),
            ticker: r.ticker,
            open: r.prices.open,
            high: r.prices.high,
            low: r.prices.low,
            close: r.prices.close,
            adjusted_close: r.prices.adjusted_close,
            volume: r.volume,
            momentum_12m: r.momentum_12m,
        }
    }
}

/// One row of the label table. Undefined values are `None`.
#[pyclass]
#[derive(Clone)]
pub struct LabelRecord {
    /// ISO date.
    #[pyo3(get)]
    pub date: String,
    #[pyo3(get)]
    pub ticker: String,
    #[pyo3(get)]
    pub stock_fwd_ret: Option<f64>,
    #[pyo3(get)]
    pub spy_fwd_ret: Option<f64>,
    #[pyo3(get)]
    pub excess_return_12m: Option<f64>,
    #[pyo3(get)]
    pub hit_2pct: Option<bool>,
}

#[pymethods]
impl LabelRecord {
    /// Check if the row can be used as a training target.
    #[getter]
    fn is_trainable(&self) -> bool {
        self.excess_return_12m.is_some() && self.hit_2pct.is_some()
    }

    fn __repr__(&self) -> String {
        format!(
            "LabelRecord(date={}, ticker={}, excess_return_12m={:?}, hit_2pct={:?})",
            self.date, self.ticker, self.excess_return_12m, self.hit_2pct
        )
    }
}

impl From<RustLabelRecord> for LabelRecord {
    fn from(r: RustLabelRecord) -> Self {
        LabelRecord {
            date: r.date.to_string(),
            ticker: r.ticker,
            stock_fwd_ret: r.stock_fwd_ret,
            spy_fwd_ret: r.spy_fwd_ret,
            excess_return_12m: r.excess_return_12m,
            hit_2pct: r.hit_2pct,
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Run one stage (`clean`, `stabilize`, `gold`) or all of them.
///
/// Returns a dict of output row counts keyed by layer.
#[pyfunction]
#[pyo3(signature = (config_path=None, stage=None, db=None))]
fn run_pipeline<'py>(
    py: Python<'py>,
    config_path: Option<String>,
    stage: Option<String>,
    db: Option<String>,
) -> PyResult<Bound<'py, PyDict>> {
    let config = load_config(config_path.as_deref(), db.as_deref())?;
    let stage: Stage = stage.as_deref().unwrap_or("all").parse().map_err(to_py_err)?;

    let mut store = PriceStore::open(&config.store.path).map_err(to_py_err)?;
    let pipeline = Pipeline::new(config).map_err(to_py_err)?;
    let report = pipeline.run_stage(&mut store, stage).map_err(to_py_err)?;

    let dict = PyDict::new_bound(py);
    for (layer, rows) in report.row_counts() {
        dict.set_item(layer, rows)?;
    }
    Ok(dict)
}

/// Default configuration as pretty-printed JSON.
#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string_pretty(&PipelineConfig::default())
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

/// Read the feature table.
#[pyfunction]
#[pyo3(signature = (config_path=None, db=None))]
fn load_features(
    config_path: Option<String>,
    db: Option<String>,
) -> PyResult<Vec<FeatureRecord>> {
    let config = load_config(config_path.as_deref(), db.as_deref())?;
    let store = PriceStore::open(&config.store.path).map_err(to_py_err)?;
    let rows = store.load_features(&config.tables.features).map_err(to_py_err)?;
    Ok(rows.into_iter().map(FeatureRecord::from).collect())
}

/// Read the label table.
#[pyfunction]
#[pyo3(signature = (config_path=None, db=None))]
fn load_labels(
    config_path: Option<String>,
    db: Option<String>,
) -> PyResult<Vec<LabelRecord>> {
    let config = load_config(config_path.as_deref(), db.as_deref())?;
    let store = PriceStore::open(&config.store.path).map_err(to_py_err)?;
    let rows = store.load_labels(&config.tables.labels).map_err(to_py_err)?;
    Ok(rows.into_iter().map(LabelRecord::from).collect())
}

// ============================================================================
// Module Definition
// ============================================================================

/// punta pipeline - point-in-time features and labels for Python.
#[pymodule]
fn punta_pipeline(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<FeatureRecord>()?;
    m.add_class::<LabelRecord>()?;

    // Functions
    m.add_function(wrap_pyfunction!(run_pipeline, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(load_features, m)?)?;
    m.add_function(wrap_pyfunction!(load_labels, m)?)?;

    Ok(())
}
