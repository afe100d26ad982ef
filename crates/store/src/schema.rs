//! Table names and fixed column layouts for each layer.

use punta_core::config::validate_table_name;
use punta_core::Result;

/// Raw layer: text as delivered by the ingestion boundary.
pub const RAW_DDL: &str = "date VARCHAR, open VARCHAR, high VARCHAR, low VARCHAR, \
     close VARCHAR, adjusted_close VARCHAR, volume VARCHAR, ticker VARCHAR";

/// Bronze layer.
pub const CLEANED_DDL: &str = "date DATE NOT NULL, open DOUBLE NOT NULL, high DOUBLE NOT NULL, \
     low DOUBLE NOT NULL, close DOUBLE NOT NULL, adjusted_close DOUBLE NOT NULL, \
     volume BIGINT NOT NULL, ticker VARCHAR NOT NULL, PRIMARY KEY (ticker, date)";

/// Silver layer.
pub const STABILIZED_DDL: &str = "date DATE NOT NULL, open DOUBLE NOT NULL, high DOUBLE NOT NULL, \
     low DOUBLE NOT NULL, close DOUBLE NOT NULL, adjusted_close DOUBLE NOT NULL, \
     volume BIGINT NOT NULL, ticker VARCHAR NOT NULL, valid_from DATE NOT NULL, valid_to DATE, \
     PRIMARY KEY (ticker, date)";

/// Gold features.
pub const FEATURES_DDL: &str = "date DATE NOT NULL, ticker VARCHAR NOT NULL, open DOUBLE, \
     high DOUBLE, low DOUBLE, close DOUBLE, adjusted_close DOUBLE, volume BIGINT, \
     momentum_12m DOUBLE, PRIMARY KEY (ticker, date)";

/// Gold labels.
pub const LABELS_DDL: &str = "date DATE NOT NULL, ticker VARCHAR NOT NULL, stock_fwd_ret DOUBLE, \
     spy_fwd_ret DOUBLE, excess_return_12m DOUBLE, hit_2pct INTEGER, PRIMARY KEY (ticker, date)";

/// A validated `table` or `schema.table` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    /// Schema, `main` when unqualified.
    pub schema: String,
    /// Table.
    pub table: String,
}

impl TableName {
    /// Parse and validate a table name.
    pub fn parse(name: &str) -> Result<Self> {
        validate_table_name(name)?;
        Ok(match name.split_once('.') {
            Some((schema, table)) => Self {
                schema: schema.to_string(),
                table: table.to_string(),
            },
            None => Self {
                schema: "main".to_string(),
                table: name.to_string(),
            },
        })
    }

    /// Fully qualified name for SQL.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified() {
        let name = TableName::parse("gold.labels").unwrap();
        assert_eq!(name.schema, "gold");
        assert_eq!(name.table, "labels");
        assert_eq!(name.qualified(), "gold.labels");
    }

    #[test]
    fn test_parse_unqualified() {
        let name = TableName::parse("prices").unwrap();
        assert_eq!(name.qualified(), "main.prices");
    }

    #[test]
    fn test_parse_rejects_injection() {
        assert!(TableName::parse("x; DROP TABLE y").is_err());
    }
}
