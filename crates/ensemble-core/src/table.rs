//! Stacked tables
//!
//! The in-memory shape for aggregated results: ordered named columns and
//! row-major cells. Rows keep insertion order (provider order, then the
//! provider's own row order). Concatenation takes the union of columns and
//! fills cells a table does not carry with [`Value::Null`].

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{EnsembleError, Result};
use crate::types::RealizationId;

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    /// Parse a raw text cell.
    ///
    /// With `numeric` set, integers and floats are recognised; everything
    /// else stays opaque text. Empty cells are null.
    pub fn parse(raw: &str, numeric: bool) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Value::Null;
        }
        if numeric {
            if let Ok(i) = raw.parse::<i64>() {
                return Value::Int(i);
            }
            if let Ok(f) = raw.parse::<f64>() {
                return Value::Float(f);
            }
        }
        Value::Text(raw.to_string())
    }

    /// Numeric view of the cell
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_realization(&self) -> Option<RealizationId> {
        match self {
            Value::Int(i) => u32::try_from(*i).ok().map(RealizationId),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<RealizationId> for Value {
    fn from(id: RealizationId) -> Self {
        Value::Int(i64::from(id.0))
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Ordered rows of named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; the cell count must match the column count
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EnsembleError::provider(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Insert a column holding `value` in every row at `position`
    pub fn insert_column(&mut self, position: usize, name: impl Into<String>, value: Value) {
        let position = position.min(self.columns.len());
        self.columns.insert(position, name.into());
        for row in &mut self.rows {
            row.insert(position, value.clone());
        }
    }

    /// Set `name` to `value` in every row, appending the column if absent
    pub fn set_constant(&mut self, name: &str, value: Value) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                let end = self.columns.len();
                self.insert_column(end, name, value);
            }
        }
    }

    /// Keep the rows for which `keep` returns true
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Row-wise concatenation with column union.
    ///
    /// Columns appear in order of first occurrence across the inputs.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let tables: Vec<Table> = tables.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for col in &table.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(Table::len).sum());
        for table in tables {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| table.column_index(c)).collect();
            for row in table.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|idx| idx.map_or(Value::Null, |i| row[i].clone()))
                        .collect(),
                );
            }
        }

        Table { columns, rows }
    }

    /// Render as comma-separated text with a header line
    pub fn to_csv(&self) -> String {
        let mut out = self.columns.join(",");
        out.push('\n');
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(ToString::to_string).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    /// Render as a JSON array of records
    pub fn to_json_records(&self) -> Result<String> {
        let mut records = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut record = serde_json::Map::new();
            for (col, cell) in self.columns.iter().zip(row) {
                record.insert(col.clone(), serde_json::to_value(cell)?);
            }
            records.push(serde_json::Value::Object(record));
        }
        Ok(serde_json::to_string_pretty(&records)?)
    }
}

/// Whether a column name matches any of the wildcard keys.
///
/// Keys use shell-style wildcards. An empty key list matches every column.
pub fn column_matches(keys: &[String], name: &str) -> bool {
    if keys.is_empty() {
        return true;
    }
    keys.iter().any(|key| match glob::Pattern::new(key) {
        Ok(pattern) => pattern.matches(name),
        Err(_) => key == name,
    })
}
