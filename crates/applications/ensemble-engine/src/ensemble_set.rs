//! Ensemble sets: book-keeping and aggregation across ensembles
//!
//! An ensemble set is any collection of ensembles, keyed by ensemble name.
//! Aggregated tables carry an ENSEMBLE column naming the source ensemble on
//! top of the REAL column each ensemble adds.
//!
//! ## Time index reconciliation
//!
//! Realizations report at irregular dates. [`EnsembleSet::smry_dates`] unions
//! the report dates of every member ensemble and resolves them at the
//! requested frequency, so that all ensembles can be resampled onto one
//! shared index before their rows are compared or combined.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use ensemble_core::{
    resolve_dates, EnsembleProvider, Frequency, RealizationLoader, Result, Table, TimeIndex,
    Value, DATE, ENSEMBLE, OK, REAL,
};
use indexmap::IndexMap;
use tracing::{debug, info, info_span, Span};

use crate::ensemble::Ensemble;
use crate::paths::{expand_patterns, group_by_iteration, single_path_patterns};

/// A named collection of ensembles.
///
/// Ensembles are kept in insertion order. [`EnsembleSet::add_ensemble`]
/// replaces an ensemble of the same name in place (last write wins);
/// [`EnsembleSet::insert_if_absent`] keeps the existing one.
pub struct EnsembleSet {
    name: String,
    ensembles: IndexMap<String, Arc<dyn EnsembleProvider>>,
    span: Span,
}

impl EnsembleSet {
    /// Create an ensemble set; duplicate names collapse to the last occurrence
    pub fn new<I>(name: impl Into<String>, ensembles: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn EnsembleProvider>>,
    {
        let name = name.into();
        let span = info_span!("ensemble_set", name = %name);
        let mut set = Self {
            name,
            ensembles: IndexMap::new(),
            span,
        };
        for ensemble in ensembles {
            set.add_ensemble(ensemble);
        }
        set
    }

    /// Replace the tracing span operations run under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.ensembles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ensembles.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn EnsembleProvider>> {
        self.ensembles.get(name)
    }

    /// Ensemble names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.ensembles.keys().map(String::as_str).collect()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn EnsembleProvider>> {
        self.ensembles.shift_remove(name)
    }

    /// Add an ensemble under its own name, returning the one it replaced
    pub fn add_ensemble(
        &mut self,
        ensemble: Arc<dyn EnsembleProvider>,
    ) -> Option<Arc<dyn EnsembleProvider>> {
        let name = ensemble.name().to_string();
        let replaced = self.ensembles.insert(name.clone(), ensemble);
        if replaced.is_some() {
            let _enter = self.span.enter();
            debug!(ensemble = %name, "Replaced existing ensemble");
        }
        replaced
    }

    /// Add an ensemble unless its name is taken; returns whether it was added
    pub fn insert_if_absent(&mut self, ensemble: Arc<dyn EnsembleProvider>) -> bool {
        if self.ensembles.contains_key(ensemble.name()) {
            return false;
        }
        self.add_ensemble(ensemble);
        true
    }

    /// Add ensembles from a single directory or path pattern.
    ///
    /// A string without a realization marker is taken as the case directory
    /// holding the `realization-*/iter-*` structure.
    pub fn add_ensembles_from_path<L>(&mut self, path: &str, loader: &L) -> usize
    where
        L: RealizationLoader + ?Sized,
    {
        self.add_ensembles_from_paths(&single_path_patterns(path), loader)
    }

    /// Add one ensemble per iteration found among the matched paths.
    ///
    /// Every distinct `iter-<N>` becomes an ensemble named `iter-<N>` holding
    /// the matched paths of that iteration. Paths without an iteration marker
    /// contribute to no ensemble. Returns the number of ensembles added.
    pub fn add_ensembles_from_paths<S, L>(&mut self, patterns: &[S], loader: &L) -> usize
    where
        S: AsRef<str>,
        L: RealizationLoader + ?Sized,
    {
        let paths = expand_patterns(patterns);
        let groups = group_by_iteration(&paths);

        let mut added = 0;
        for (iteration, members) in groups {
            let ensemble = Ensemble::from_paths(format!("iter-{iteration}"), &members, loader);
            {
                let _enter = self.span.enter();
                info!(
                    ensemble = %EnsembleProvider::name(&ensemble),
                    realizations = ensemble.len(),
                    "Adding ensemble from paths"
                );
            }
            self.add_ensemble(Arc::new(ensemble));
            added += 1;
        }
        added
    }

    /// `{ENSEMBLE, REAL, OK}` for every realization of every ensemble
    pub fn ok_table(&self) -> Result<Table> {
        self.aggregate(|ensemble| ensemble.ok_table(), Placement::First, &[ENSEMBLE, REAL, OK])
    }

    /// Parameters of every ensemble, prefixed with an ENSEMBLE column
    pub fn parameters(&self, convert_numeric: bool) -> Result<Table> {
        self.aggregate(
            |ensemble| ensemble.parameters(convert_numeric),
            Placement::First,
            &[ENSEMBLE, REAL],
        )
    }

    /// A per-realization table aggregated over every ensemble.
    ///
    /// Realizations without the file are left out.
    pub fn csv(&self, filename: &str) -> Result<Table> {
        self.aggregate(|ensemble| ensemble.csv(filename), Placement::Last, &[REAL, ENSEMBLE])
    }

    /// Summary vectors of every ensemble.
    ///
    /// A frequency is resolved through [`EnsembleSet::smry_dates`] first;
    /// explicit dates are used as given; [`TimeIndex::Native`] keeps each
    /// realization's report times.
    pub fn smry(&self, time_index: &TimeIndex, column_keys: &[String]) -> Result<Table> {
        let resolved: Option<Vec<NaiveDate>> = match time_index {
            TimeIndex::Native => None,
            TimeIndex::Frequency(freq) => Some(self.smry_dates(*freq)?),
            TimeIndex::Dates(dates) => Some(dates.clone()),
        };

        self.aggregate(
            |ensemble| ensemble.smry(resolved.as_deref(), column_keys),
            Placement::Last,
            &[DATE, REAL, ENSEMBLE],
        )
    }

    /// Dates across all ensembles at the requested frequency.
    ///
    /// `report` yields the sorted union of every report date in the set and
    /// never invents dates; the other frequencies produce a regular calendar
    /// sequence spanning the union.
    pub fn smry_dates(&self, freq: Frequency) -> Result<Vec<NaiveDate>> {
        let _enter = self.span.enter();
        let mut rawdates = BTreeSet::new();
        for ensemble in self.ensembles.values() {
            rawdates.extend(ensemble.smry_dates(Frequency::Report)?);
        }
        let dates = resolve_dates(rawdates, freq);
        debug!(%freq, dates = dates.len(), "Resolved time index");
        Ok(dates)
    }

    // `skeleton` gives the columns of the result for a set with no ensembles.
    fn aggregate<F>(&self, mut fetch: F, placement: Placement, skeleton: &[&str]) -> Result<Table>
    where
        F: FnMut(&dyn EnsembleProvider) -> Result<Table>,
    {
        let _enter = self.span.enter();
        if self.ensembles.is_empty() {
            return Ok(Table::new(skeleton.iter().copied()));
        }
        let mut tables = Vec::with_capacity(self.ensembles.len());
        for (name, ensemble) in &self.ensembles {
            let mut table = fetch(ensemble.as_ref())?;
            match placement {
                Placement::First => table.insert_column(0, ENSEMBLE, Value::from(name.as_str())),
                Placement::Last => table.set_constant(ENSEMBLE, Value::from(name.as_str())),
            }
            tables.push(table);
        }
        Ok(Table::concat(tables))
    }
}

/// Where the ENSEMBLE column goes
#[derive(Debug, Clone, Copy)]
enum Placement {
    First,
    Last,
}

impl std::fmt::Debug for EnsembleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleSet")
            .field("name", &self.name)
            .field("ensembles", &self.names())
            .finish()
    }
}
