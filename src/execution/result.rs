//! Raw tabular results returned by the service.

use serde::{Deserialize, Serialize};

/// Column metadata reported alongside the rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

/// One raw row. `None` marks a null or absent cell.
pub type RawRow = Vec<Option<String>>;

/// Undecoded result set. For SELECT queries the first row holds the
/// column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

impl ResultSet {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnInfo>) -> Self {
        self.columns = columns;
        self
    }

    /// Build from plain string cells; handy for callers that never see nulls.
    pub fn from_strings<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| Some(cell.into())).collect())
            .collect();
        Self::new(rows)
    }

    /// Number of data rows, excluding the header
    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
