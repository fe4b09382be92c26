//! Ensembles: named collections of realizations
//!
//! An ensemble keeps one provider per realization index and aggregates their
//! tables by stacking them, tagging every row with a REAL column. A
//! realization that lacks the requested data is left out of the stack.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use ensemble_core::{
    resolve_dates, EnsembleProvider, Frequency, RealizationId, RealizationLoader,
    RealizationProvider, Result, Table, Value, DATE, OK, REAL,
};
use tracing::{debug, info_span, warn, Span};

use crate::paths::realization_index;

/// A named collection of realizations.
///
/// Realizations are keyed by index. [`Ensemble::insert`] replaces an existing
/// entry (last write wins); [`Ensemble::insert_if_absent`] keeps it.
pub struct Ensemble {
    name: String,
    realizations: BTreeMap<RealizationId, Arc<dyn RealizationProvider>>,
    span: Span,
}

impl Ensemble {
    /// Create an empty ensemble
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let span = info_span!("ensemble", name = %name);
        Self {
            name,
            realizations: BTreeMap::new(),
            span,
        }
    }

    /// Create an ensemble from realization providers
    pub fn from_realizations<I>(name: impl Into<String>, realizations: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn RealizationProvider>>,
    {
        let mut ensemble = Self::new(name);
        for realization in realizations {
            ensemble.insert(realization);
        }
        ensemble
    }

    /// Create an ensemble from realization directories.
    ///
    /// Paths without a `realization-<digits>` marker, paths the loader
    /// rejects, and paths the loader fails on are skipped.
    pub fn from_paths<L>(name: impl Into<String>, paths: &[PathBuf], loader: &L) -> Self
    where
        L: RealizationLoader + ?Sized,
    {
        let mut ensemble = Self::new(name);
        let _enter = ensemble.span.clone().entered();

        for path in paths {
            let Some(index) = realization_index(path) else {
                debug!(path = %path.display(), "No realization marker, skipping");
                continue;
            };
            match loader.load(path, index) {
                Ok(Some(realization)) => {
                    ensemble.insert(realization);
                }
                Ok(None) => debug!(path = %path.display(), "Loader skipped path"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to load realization"),
            }
        }

        debug!(realizations = ensemble.len(), "Ensemble loaded from paths");
        ensemble
    }

    /// Replace the tracing span operations run under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Insert a realization, returning the one it replaced
    pub fn insert(
        &mut self,
        realization: Arc<dyn RealizationProvider>,
    ) -> Option<Arc<dyn RealizationProvider>> {
        self.realizations.insert(realization.index(), realization)
    }

    /// Insert a realization unless its index is taken; returns whether it was inserted
    pub fn insert_if_absent(&mut self, realization: Arc<dyn RealizationProvider>) -> bool {
        match self.realizations.entry(realization.index()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(realization);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, index: RealizationId) -> Option<&Arc<dyn RealizationProvider>> {
        self.realizations.get(&index)
    }

    pub fn remove(&mut self, index: RealizationId) -> Option<Arc<dyn RealizationProvider>> {
        self.realizations.remove(&index)
    }

    pub fn len(&self) -> usize {
        self.realizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realizations.is_empty()
    }

    /// Realization indices, ascending
    pub fn realization_ids(&self) -> Vec<RealizationId> {
        self.realizations.keys().copied().collect()
    }

    /// Summary tables per realization (the unstacked form)
    pub fn smry_by_realization(
        &self,
        time_index: Option<&[NaiveDate]>,
        column_keys: &[String],
    ) -> Result<BTreeMap<RealizationId, Table>> {
        let _enter = self.span.enter();
        let mut tables = BTreeMap::new();
        for (index, realization) in &self.realizations {
            match realization.smry(time_index, column_keys)? {
                Some(table) => {
                    tables.insert(*index, table);
                }
                None => debug!(real = %index, "No summary data"),
            }
        }
        Ok(tables)
    }

    // Tag each realization's table with REAL at `position` and stack them.
    // A realization whose data cannot be read is left out like a missing one.
    fn stack<F>(&self, what: &str, position: usize, mut fetch: F) -> Table
    where
        F: FnMut(&dyn RealizationProvider) -> Result<Option<Table>>,
    {
        let _enter = self.span.enter();
        let mut tables = Vec::with_capacity(self.realizations.len());
        for (index, realization) in &self.realizations {
            match fetch(realization.as_ref()) {
                Ok(Some(mut table)) => {
                    table.insert_column(position, REAL, Value::from(*index));
                    tables.push(table);
                }
                Ok(None) => debug!(real = %index, what, "Realization has no data, skipping"),
                Err(e) => {
                    warn!(real = %index, what, error = %e, "Failed to read realization, skipping")
                }
            }
        }
        debug!(what, stacked = tables.len(), "Aggregated realizations");
        if tables.is_empty() {
            return Table::new([REAL]);
        }
        Table::concat(tables)
    }
}

impl std::fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensemble")
            .field("name", &self.name)
            .field("realizations", &self.realization_ids())
            .finish()
    }
}

impl EnsembleProvider for Ensemble {
    fn name(&self) -> &str {
        &self.name
    }

    fn ok_table(&self) -> Result<Table> {
        let mut table = Table::new([REAL, OK]);
        for (index, realization) in &self.realizations {
            table.push_row(vec![Value::from(*index), Value::Bool(realization.is_ok())])?;
        }
        Ok(table)
    }

    fn eligible(&self) -> Result<BTreeSet<RealizationId>> {
        Ok(self
            .realizations
            .iter()
            .filter(|(_, realization)| realization.is_ok())
            .map(|(index, _)| *index)
            .collect())
    }

    fn parameters(&self, convert_numeric: bool) -> Result<Table> {
        Ok(self.stack("parameters", 0, |r| r.parameters(convert_numeric)))
    }

    fn csv(&self, filename: &str) -> Result<Table> {
        Ok(self.stack(filename, 0, |r| r.csv(filename)))
    }

    fn smry(&self, time_index: Option<&[NaiveDate]>, column_keys: &[String]) -> Result<Table> {
        let table = self.stack("summary", 1, |r| r.smry(time_index, column_keys));
        if !table.has_column(DATE) {
            return Ok(Table::new([DATE, REAL]));
        }
        Ok(table)
    }

    fn smry_dates(&self, freq: Frequency) -> Result<Vec<NaiveDate>> {
        let _enter = self.span.enter();
        let mut rawdates = BTreeSet::new();
        for (index, realization) in &self.realizations {
            match realization.smry_dates() {
                Ok(dates) => rawdates.extend(dates),
                Err(e) => {
                    warn!(real = %index, error = %e, "Failed to read report dates, skipping")
                }
            }
        }
        Ok(resolve_dates(rawdates, freq))
    }
}
