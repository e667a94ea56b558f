//! Result Decoder
//!
//! Turns a raw result set (first row = header) into header-keyed records.

use crate::error::{QueryError, Result};
use crate::execution::result::ResultSet;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One decoded record: column name to cell text, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    fields: Vec<(String, String)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. A name already present keeps its position and takes
    /// the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = ResultRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Decode every data row against the header row.
///
/// Missing or null cells become `""`; cells past the header width are
/// dropped. Fails on an empty row set or a header cell without a name.
pub fn decode_rows(results: &ResultSet) -> Result<Vec<ResultRow>> {
    let (header, data) = results
        .rows
        .split_first()
        .ok_or_else(|| QueryError::Decode("result set has no header row".to_string()))?;

    let names = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            cell.clone()
                .ok_or_else(|| QueryError::Decode(format!("header column {} has no name", idx)))
        })
        .collect::<Result<Vec<String>>>()?;

    let rows = data
        .iter()
        .map(|row| {
            names
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let value = row.get(idx).cloned().flatten().unwrap_or_default();
                    (name.clone(), value)
                })
                .collect::<ResultRow>()
        })
        .collect();

    Ok(rows)
}
