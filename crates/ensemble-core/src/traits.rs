//! Provider contracts
//!
//! Discovery and parsing of realization output live behind these traits.
//! Aggregation code works through them only, never through concrete
//! on-disk formats.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;
use crate::table::{Table, Value};
use crate::types::{Frequency, RealizationId, OK, REAL};

/// One realization's results.
///
/// `Ok(None)` from a table accessor means the data is absent; callers omit
/// the realization instead of failing.
pub trait RealizationProvider: Send + Sync {
    /// Realization index, unique within its ensemble
    fn index(&self) -> RealizationId;

    /// Whether the realization completed successfully
    fn is_ok(&self) -> bool;

    /// Parameter set as a single-row table
    fn parameters(&self, convert_numeric: bool) -> Result<Option<Table>>;

    /// Arbitrary named table local to the realization
    fn csv(&self, filename: &str) -> Result<Option<Table>>;

    /// Summary vectors with a DATE column, resampled onto `time_index` when
    /// given, at native report times otherwise
    fn smry(&self, time_index: Option<&[NaiveDate]>, column_keys: &[String])
        -> Result<Option<Table>>;

    /// Native report dates, ascending
    fn smry_dates(&self) -> Result<Vec<NaiveDate>>;
}

/// Builds realization providers from matched directories
pub trait RealizationLoader {
    /// `Ok(None)` skips the path
    fn load(&self, path: &Path, index: RealizationId)
        -> Result<Option<Arc<dyn RealizationProvider>>>;
}

/// The aggregated query surface of a named ensemble.
///
/// Every table is stacked: one row per realization (and observation) with a
/// REAL column identifying the source realization.
pub trait EnsembleProvider: Send + Sync {
    fn name(&self) -> &str;

    /// `{REAL, OK}` status for every realization
    fn ok_table(&self) -> Result<Table>;

    /// Realizations flagged OK
    fn eligible(&self) -> Result<BTreeSet<RealizationId>> {
        let table = self.ok_table()?;
        let (Some(real), Some(ok)) = (table.column_index(REAL), table.column_index(OK)) else {
            return Ok(BTreeSet::new());
        };
        Ok(table
            .rows()
            .iter()
            .filter(|row| row[ok] == Value::Bool(true))
            .filter_map(|row| row[real].as_realization())
            .collect())
    }

    fn parameters(&self, convert_numeric: bool) -> Result<Table>;

    fn csv(&self, filename: &str) -> Result<Table>;

    /// Stacked `{DATE, REAL, values...}` summary table
    fn smry(&self, time_index: Option<&[NaiveDate]>, column_keys: &[String]) -> Result<Table>;

    /// Report-date union of all realizations, resolved at `freq`
    fn smry_dates(&self, freq: Frequency) -> Result<Vec<NaiveDate>>;
}
