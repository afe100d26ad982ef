//! DuckDB table store.
//!
//! Every `replace_*` call drops and recreates its table inside one
//! transaction, so a reader sees either the previous table or the complete
//! new one, never a partly written table.

use std::path::Path;

use chrono::NaiveDate;
use duckdb::{params, Appender, Connection, Row};
use punta_core::{
    Error, FeatureRow, LabelRow, PriceFields, PriceObservation, RawPriceRow, Result,
    StabilizedObservation,
};
use tracing::{debug, info};

use crate::records::{FeatureRecord, LabelRecord};
use crate::schema::{
    TableName, CLEANED_DDL, FEATURES_DDL, LABELS_DDL, RAW_DDL, STABILIZED_DDL,
};

fn db_err(e: duckdb::Error) -> Error {
    Error::database(e.to_string())
}

fn parse_stored_date(table: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::data(format!("{table}: unreadable date '{raw}'")))
}

/// Five consecutive price columns starting at `first`.
fn read_prices(row: &Row<'_>, first: usize) -> duckdb::Result<[f64; 5]> {
    Ok([
        row.get(first)?,
        row.get(first + 1)?,
        row.get(first + 2)?,
        row.get(first + 3)?,
        row.get(first + 4)?,
    ])
}

/// Named-table store for every pipeline layer.
pub struct PriceStore {
    conn: Connection,
}

impl PriceStore {
    /// Open or create a database file. The parent directory is created if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(db_err)?;
        debug!(path = %path.display(), "opened store");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Check whether a table exists.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let table = TableName::parse(name)?;
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = ? AND table_name = ?",
                params![table.schema, table.table],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Column names of a table, in table order.
    pub fn table_columns(&self, name: &str) -> Result<Vec<String>> {
        let table = self.require_table(name)?;
        let mut stmt = self
            .conn
            .prepare(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
            )
            .map_err(db_err)?;
        let columns = stmt
            .query_map(params![table.schema, table.table], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<duckdb::Result<Vec<String>>>()
            .map_err(db_err)?;
        Ok(columns)
    }

    /// Number of rows in a table.
    pub fn row_count(&self, name: &str) -> Result<u64> {
        let table = self.require_table(name)?;
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.qualified()), [], |row| {
                row.get(0)
            })
            .map_err(db_err)?;
        Ok(count as u64)
    }

    /// Resolve a table that a stage depends on.
    fn require_table(&self, name: &str) -> Result<TableName> {
        let table = TableName::parse(name)?;
        if !self.table_exists(name)? {
            return Err(Error::missing_dependency(format!("table '{name}' does not exist")));
        }
        Ok(table)
    }

    /// Replace the raw table with the contents of a CSV dump.
    ///
    /// Every column is imported as text; typing is the cleaning stage's job.
    pub fn import_raw_csv(&mut self, name: &str, csv_path: impl AsRef<Path>) -> Result<u64> {
        let csv_path = csv_path.as_ref();
        if !csv_path.is_file() {
            return Err(Error::missing_dependency(format!(
                "raw CSV '{}' not found",
                csv_path.display()
            )));
        }
        let table = TableName::parse(name)?;
        let q = table.qualified();
        let literal = csv_path.to_string_lossy().replace('\'', "''");

        let tx = self.conn.transaction().map_err(db_err)?;
        tx.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {schema}; \
             DROP TABLE IF EXISTS {q}; \
             CREATE TABLE {q} AS SELECT * FROM read_csv_auto('{literal}', header = true, all_varchar = true);",
            schema = table.schema,
        ))
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        let rows = self.row_count(name)?;
        info!(table = %q, rows, source = %csv_path.display(), "imported raw prices");
        Ok(rows)
    }

    /// Replace the raw table. Ingestion order follows slice order.
    pub fn replace_raw(&mut self, name: &str, rows: &[RawPriceRow]) -> Result<()> {
        let table = TableName::parse(name)?;
        let tx = self.conn.transaction().map_err(db_err)?;
        write_table(&tx, &table, RAW_DDL, rows, |app, r| {
            app.append_row(params![
                r.date,
                r.open,
                r.high,
                r.low,
                r.close,
                r.adjusted_close,
                r.volume,
                r.ticker
            ])
        })?;
        tx.commit().map_err(db_err)?;
        info!(table = %table.qualified(), rows = rows.len(), "replaced raw table");
        Ok(())
    }

    /// Read the raw table as text, in ingestion order.
    pub fn load_raw(&self, name: &str) -> Result<Vec<RawPriceRow>> {
        let table = self.require_table(name)?;
        let sql = format!(
            "SELECT rowid, CAST(date AS VARCHAR), CAST(open AS VARCHAR), CAST(high AS VARCHAR), \
             CAST(low AS VARCHAR), CAST(close AS VARCHAR), CAST(adjusted_close AS VARCHAR), \
             CAST(volume AS VARCHAR), CAST(ticker AS VARCHAR) FROM {} ORDER BY rowid",
            table.qualified()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawPriceRow {
                    seq: row.get::<_, i64>(0)? as u64,
                    date: row.get(1)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    adjusted_close: row.get(6)?,
                    volume: row.get(7)?,
                    ticker: row.get(8)?,
                })
            })
            .map_err(db_err)?
            .collect::<duckdb::Result<Vec<_>>>()
            .map_err(db_err)?;
        debug!(table = %table.qualified(), rows = rows.len(), "loaded raw table");
        Ok(rows)
    }

    /// Replace the cleaned (bronze) table.
    pub fn replace_cleaned(&mut self, name: &str, rows: &[PriceObservation]) -> Result<()> {
        let table = TableName::parse(name)?;
        let tx = self.conn.transaction().map_err(db_err)?;
        write_table(
            &tx,
            &table,
            CLEANED_DDL,
            rows,
            |app, r| {
                let p = &r.prices;
                app.append_row(params![
                    r.date,
                    p.open,
                    p.high,
                    p.low,
                    p.close,
                    p.adjusted_close,
                    r.volume,
                    r.ticker
                ])
            },
        )?;
        tx.commit().map_err(db_err)?;
        info!(table = %table.qualified(), rows = rows.len(), "replaced cleaned table");
        Ok(())
    }

    /// Read the cleaned (bronze) table, ordered by ticker and date.
    pub fn load_cleaned(&self, name: &str) -> Result<Vec<PriceObservation>> {
        let table = self.require_table(name)?;
        let sql = format!(
            "SELECT CAST(date AS VARCHAR), open, high, low, close, adjusted_close, volume, ticker \
             FROM {} ORDER BY ticker, date",
            table.qualified()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    read_prices(row, 1)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .map_err(db_err)?
            .collect::<duckdb::Result<Vec<(String, [f64; 5], i64, String)>>>()
            .map_err(db_err)?;

        raw.into_iter()
            .map(|(date, prices, volume, ticker)| {
                Ok(PriceObservation {
                    ticker,
                    date: parse_stored_date(name, &date)?,
                    prices: PriceFields::from_array(prices),
                    volume,
                })
            })
            .collect()
    }

    /// Replace the stabilized (silver) table.
    pub fn replace_stabilized(&mut self, name: &str, rows: &[StabilizedObservation]) -> Result<()> {
        let table = TableName::parse(name)?;
        let tx = self.conn.transaction().map_err(db_err)?;
        write_table(
            &tx,
            &table,
            STABILIZED_DDL,
            rows,
            |app, r| {
                let p = &r.prices;
                app.append_row(params![
                    r.date,
                    p.open,
                    p.high,
                    p.low,
                    p.close,
                    p.adjusted_close,
                    r.volume,
                    r.ticker,
                    r.valid_from,
                    r.valid_to
                ])
            },
        )?;
        tx.commit().map_err(db_err)?;
        info!(table = %table.qualified(), rows = rows.len(), "replaced stabilized table");
        Ok(())
    }

    /// Read the stabilized (silver) table, ordered by ticker and date.
    pub fn load_stabilized(&self, name: &str) -> Result<Vec<StabilizedObservation>> {
        let table = self.require_table(name)?;
        let sql = format!(
            "SELECT CAST(date AS VARCHAR), open, high, low, close, adjusted_close, volume, ticker, \
             CAST(valid_from AS VARCHAR), CAST(valid_to AS VARCHAR) \
             FROM {} ORDER BY ticker, date",
            table.qualified()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    read_prices(row, 1)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, Option<String>>(9)?,
                ))
            })
            .map_err(db_err)?
            .collect::<duckdb::Result<Vec<(String, [f64; 5], i64, String, String, Option<String>)>>>()
            .map_err(db_err)?;

        raw.into_iter()
            .map(|(date, prices, volume, ticker, valid_from, valid_to)| {
                Ok(StabilizedObservation {
                    ticker,
                    date: parse_stored_date(name, &date)?,
                    prices: PriceFields::from_array(prices),
                    volume,
                    valid_from: parse_stored_date(name, &valid_from)?,
                    valid_to: valid_to
                        .as_deref()
                        .map(|d| parse_stored_date(name, d))
                        .transpose()?,
                })
            })
            .collect()
    }

    /// Replace both gold tables in one transaction.
    pub fn replace_gold(
        &mut self,
        features_name: &str,
        labels_name: &str,
        features: &[FeatureRow],
        labels: &[LabelRow],
    ) -> Result<()> {
        if features.len() != labels.len() {
            return Err(Error::data(format!(
                "feature/label row counts differ: {} vs {}",
                features.len(),
                labels.len()
            )));
        }
        let features_table = TableName::parse(features_name)?;
        let labels_table = TableName::parse(labels_name)?;

        let tx = self.conn.transaction().map_err(db_err)?;
        write_table(
            &tx,
            &features_table,
            FEATURES_DDL,
            features,
            |app, r| {
                let p = &r.prices;
                app.append_row(params![
                    r.date,
                    r.ticker,
                    p.open,
                    p.high,
                    p.low,
                    p.close,
                    p.adjusted_close,
                    r.volume,
                    r.momentum_12m.value()
                ])
            },
        )?;
        write_table(
            &tx,
            &labels_table,
            LABELS_DDL,
            labels,
            |app, r| {
                app.append_row(params![
                    r.date,
                    r.ticker,
                    r.stock_fwd_ret.value(),
                    r.spy_fwd_ret.value(),
                    r.excess_return_12m.value(),
                    r.hit_2pct.value().map(i32::from)
                ])
            },
        )?;
        tx.commit().map_err(db_err)?;
        info!(
            features = %features_table.qualified(),
            labels = %labels_table.qualified(),
            rows = features.len(),
            "replaced gold tables"
        );
        Ok(())
    }

    /// Read the feature table, ordered by ticker and date.
    pub fn load_features(&self, name: &str) -> Result<Vec<FeatureRecord>> {
        let table = self.require_table(name)?;
        let sql = format!(
            "SELECT CAST(date AS VARCHAR), ticker, open, high, low, close, adjusted_close, \
             volume, momentum_12m FROM {} ORDER BY ticker, date",
            table.qualified()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    read_prices(row, 2)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, Option<f64>>(8)?,
                ))
            })
            .map_err(db_err)?
            .collect::<duckdb::Result<Vec<(String, String, [f64; 5], i64, Option<f64>)>>>()
            .map_err(db_err)?;

        raw.into_iter()
            .map(|(date, ticker, prices, volume, momentum_12m)| {
                Ok(FeatureRecord {
                    date: parse_stored_date(name, &date)?,
                    ticker,
                    prices: PriceFields::from_array(prices),
                    volume,
                    momentum_12m,
                })
            })
            .collect()
    }

    /// Read the label table, ordered by ticker and date.
    pub fn load_labels(&self, name: &str) -> Result<Vec<LabelRecord>> {
        let table = self.require_table(name)?;
        let sql = format!(
            "SELECT CAST(date AS VARCHAR), ticker, stock_fwd_ret, spy_fwd_ret, \
             excess_return_12m, hit_2pct FROM {} ORDER BY ticker, date",
            table.qualified()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<i32>>(5)?,
                ))
            })
            .map_err(db_err)?
            .collect::<duckdb::Result<Vec<_>>>()
            .map_err(db_err)?;

        raw.into_iter()
            .map(|(date, ticker, stock, spy, excess, hit)| {
                Ok(LabelRecord {
                    date: parse_stored_date(name, &date)?,
                    ticker,
                    stock_fwd_ret: stock,
                    spy_fwd_ret: spy,
                    excess_return_12m: excess,
                    hit_2pct: hit.map(|h| h != 0),
                })
            })
            .collect()
    }
}

/// Drop and recreate `table`, then bulk-append `rows`. Caller owns the transaction.
///
/// Constraint violations surface at the final flush, inside the transaction.
fn write_table<T>(
    conn: &Connection,
    table: &TableName,
    ddl: &str,
    rows: &[T],
    mut append: impl FnMut(&mut Appender<'_>, &T) -> duckdb::Result<()>,
) -> Result<()> {
    let q = table.qualified();
    conn.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS {}; DROP TABLE IF EXISTS {q}; CREATE TABLE {q} ({ddl});",
        table.schema
    ))
    .map_err(db_err)?;

    let mut appender = conn
        .appender_to_db(&table.table, &table.schema)
        .map_err(db_err)?;
    for row in rows {
        append(&mut appender, row).map_err(db_err)?;
    }
    appender.flush().map_err(db_err)?;
    Ok(())
}
