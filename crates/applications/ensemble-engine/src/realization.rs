//! Realization providers
//!
//! - [`DirectoryRealization`]: one `realization-N/iter-M` directory on disk
//! - [`MemoryRealization`]: tables held in memory, for derived ensembles
//!
//! Both resample summary data the same way, through [`select_summary`].

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use ensemble_core::{
    column_matches, EnsembleError, RealizationId, RealizationLoader, RealizationProvider, Result,
    Table, Value, DATE,
};
use tracing::debug;

/// Marker file for a successfully completed realization
pub const OK_FILE: &str = "OK";
/// Parameter file, `KEY VALUE` per line
pub const PARAMETERS_FILE: &str = "parameters.txt";
/// Summary vectors, a DATE column plus one column per vector
pub const SUMMARY_FILE: &str = "summary.csv";

/// Restrict a raw summary table to `column_keys` and resample it.
///
/// Without a time index the native report rows are returned. With one, each
/// vector is linearly interpolated between bracketing report dates and held
/// constant outside the reported range.
pub fn select_summary(
    raw: &Table,
    time_index: Option<&[NaiveDate]>,
    column_keys: &[String],
) -> Result<Table> {
    let Some(date_idx) = raw.column_index(DATE) else {
        return Ok(Table::new([DATE]));
    };

    let selected: Vec<(usize, &String)> = raw
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != date_idx && column_matches(column_keys, name))
        .collect();

    let mut out = Table::new(
        std::iter::once(DATE.to_string()).chain(selected.iter().map(|(_, name)| (*name).clone())),
    );

    match time_index {
        None => {
            for row in raw.rows() {
                let mut cells = Vec::with_capacity(selected.len() + 1);
                cells.push(row[date_idx].clone());
                cells.extend(selected.iter().map(|(i, _)| row[*i].clone()));
                out.push_row(cells)?;
            }
        }
        Some(dates) => {
            let series: Vec<Vec<(NaiveDate, f64)>> = selected
                .iter()
                .map(|(i, _)| {
                    let mut points: Vec<(NaiveDate, f64)> = raw
                        .rows()
                        .iter()
                        .filter_map(|row| Some((row[date_idx].as_date()?, row[*i].as_f64()?)))
                        .collect();
                    points.sort_by_key(|(d, _)| *d);
                    points
                })
                .collect();

            for date in dates {
                let mut cells = Vec::with_capacity(selected.len() + 1);
                cells.push(Value::Date(*date));
                cells.extend(
                    series
                        .iter()
                        .map(|points| interpolate(points, *date).map_or(Value::Null, Value::Float)),
                );
                out.push_row(cells)?;
            }
        }
    }

    Ok(out)
}

// Points must be sorted by date.
fn interpolate(points: &[(NaiveDate, f64)], at: NaiveDate) -> Option<f64> {
    let (first, last) = (points.first()?, points.last()?);
    if at <= first.0 {
        return Some(first.1);
    }
    if at >= last.0 {
        return Some(last.1);
    }

    let i = points.partition_point(|(d, _)| *d < at);
    let (d1, v1) = points[i];
    if d1 == at {
        return Some(v1);
    }
    let (d0, v0) = points[i - 1];
    let span = (d1 - d0).num_days() as f64;
    let offset = (at - d0).num_days() as f64;
    Some(v0 + (v1 - v0) * offset / span)
}

/// Parse comma-separated text with a header line
pub fn parse_csv(text: &str, numeric: bool) -> Result<Table> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(Table::default());
    };

    let mut table = Table::new(header.split(',').map(|c| c.trim().to_string()));
    for line in lines {
        table.push_row(line.split(',').map(|cell| Value::parse(cell, numeric)).collect())?;
    }
    Ok(table)
}

/// Parse `KEY VALUE` lines into a single-row table
pub fn parse_parameters(text: &str, convert_numeric: bool) -> Result<Table> {
    let mut keys = Vec::new();
    let mut values = Vec::new();
    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        if let (Some(key), Some(value)) = (tokens.next(), tokens.next()) {
            keys.push(key.to_string());
            values.push(Value::parse(value, convert_numeric));
        }
    }

    let mut table = Table::new(keys);
    table.push_row(values)?;
    Ok(table)
}

/// Parse summary text, turning the DATE column into dates
pub fn parse_summary(text: &str) -> Result<Table> {
    let raw = parse_csv(text, true)?;
    let Some(date_idx) = raw.column_index(DATE) else {
        return Err(EnsembleError::provider("summary data has no DATE column"));
    };

    let mut table = Table::new(raw.columns().iter().cloned());
    for row in raw.rows() {
        let mut row = row.clone();
        let text = row[date_idx].to_string();
        let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map_err(|_| EnsembleError::provider(format!("invalid summary date {text}")))?;
        row[date_idx] = Value::Date(date);
        table.push_row(row)?;
    }
    Ok(table)
}

// Apply the file parsing rules to in-memory parameters: numeric text becomes
// numbers with `convert_numeric`, every value becomes text without it.
fn retype_parameters(table: &Table, convert_numeric: bool) -> Result<Table> {
    let mut out = Table::new(table.columns().iter().cloned());
    for row in table.rows() {
        let cells = row
            .iter()
            .map(|cell| match cell {
                Value::Null => Value::Null,
                Value::Text(text) => Value::parse(text, convert_numeric),
                other if convert_numeric => other.clone(),
                other => Value::Text(other.to_string()),
            })
            .collect();
        out.push_row(cells)?;
    }
    Ok(out)
}

fn summary_dates(summary: &Table) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = summary
        .column(DATE)
        .map(|cells| cells.into_iter().filter_map(Value::as_date).collect())
        .unwrap_or_default();
    dates.sort();
    dates.dedup();
    dates
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A realization directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryRealization {
    path: PathBuf,
    index: RealizationId,
}

impl DirectoryRealization {
    pub fn new(path: impl Into<PathBuf>, index: RealizationId) -> Self {
        Self {
            path: path.into(),
            index,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn raw_summary(&self) -> Result<Option<Table>> {
        read_optional(&self.path.join(SUMMARY_FILE))?
            .map(|text| parse_summary(&text))
            .transpose()
    }
}

impl RealizationProvider for DirectoryRealization {
    fn index(&self) -> RealizationId {
        self.index
    }

    fn is_ok(&self) -> bool {
        self.path.join(OK_FILE).is_file()
    }

    fn parameters(&self, convert_numeric: bool) -> Result<Option<Table>> {
        read_optional(&self.path.join(PARAMETERS_FILE))?
            .map(|text| parse_parameters(&text, convert_numeric))
            .transpose()
    }

    fn csv(&self, filename: &str) -> Result<Option<Table>> {
        read_optional(&self.path.join(filename))?
            .map(|text| parse_csv(&text, true))
            .transpose()
    }

    fn smry(&self, time_index: Option<&[NaiveDate]>, column_keys: &[String]) -> Result<Option<Table>> {
        self.raw_summary()?
            .map(|raw| select_summary(&raw, time_index, column_keys))
            .transpose()
    }

    fn smry_dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self
            .raw_summary()?
            .map(|raw| summary_dates(&raw))
            .unwrap_or_default())
    }
}

/// Loads [`DirectoryRealization`]s; paths that are not directories are skipped
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryLoader;

impl RealizationLoader for DirectoryLoader {
    fn load(&self, path: &Path, index: RealizationId) -> Result<Option<Arc<dyn RealizationProvider>>> {
        if !path.is_dir() {
            debug!(path = %path.display(), "Not a directory, skipping");
            return Ok(None);
        }
        Ok(Some(Arc::new(DirectoryRealization::new(path, index))))
    }
}

/// A realization whose tables are held in memory
#[derive(Debug, Clone)]
pub struct MemoryRealization {
    index: RealizationId,
    ok: bool,
    parameters: Option<Table>,
    tables: HashMap<String, Table>,
    summary: Option<Table>,
}

impl MemoryRealization {
    /// Create an OK realization with no data
    pub fn new(index: impl Into<RealizationId>) -> Self {
        Self {
            index: index.into(),
            ok: true,
            parameters: None,
            tables: HashMap::new(),
            summary: None,
        }
    }

    pub fn with_ok(mut self, ok: bool) -> Self {
        self.ok = ok;
        self
    }

    pub fn with_parameters(mut self, parameters: Table) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_table(mut self, filename: impl Into<String>, table: Table) -> Self {
        self.tables.insert(filename.into(), table);
        self
    }

    /// Raw summary with a DATE column of dates
    pub fn with_summary(mut self, summary: Table) -> Self {
        self.summary = Some(summary);
        self
    }
}

impl RealizationProvider for MemoryRealization {
    fn index(&self) -> RealizationId {
        self.index
    }

    fn is_ok(&self) -> bool {
        self.ok
    }

    fn parameters(&self, convert_numeric: bool) -> Result<Option<Table>> {
        self.parameters
            .as_ref()
            .map(|table| retype_parameters(table, convert_numeric))
            .transpose()
    }

    fn csv(&self, filename: &str) -> Result<Option<Table>> {
        Ok(self.tables.get(filename).cloned())
    }

    fn smry(&self, time_index: Option<&[NaiveDate]>, column_keys: &[String]) -> Result<Option<Table>> {
        self.summary
            .as_ref()
            .map(|raw| select_summary(raw, time_index, column_keys))
            .transpose()
    }

    fn smry_dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self.summary.as_ref().map(summary_dates).unwrap_or_default())
    }
}
