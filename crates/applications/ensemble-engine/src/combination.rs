//! Arithmetic between ensembles
//!
//! An [`EnsembleCombination`] derives summary data from a reference ensemble
//! and ordered lists of ensembles to subtract and add. Only realizations that
//! completed successfully in every participating ensemble take part.
//!
//! ## Evaluation order
//!
//! The reference table seeds an accumulator. Each subtract term replaces it
//! with `term - accumulator`, in registration order; then each add term
//! replaces it with `term + accumulator`. With one term of each kind the
//! result is `add + (sub - reference)`. This is a left fold: terms are not
//! re-associated into a sum of deltas.

use std::collections::BTreeSet;
use std::sync::Arc;

use ensemble_core::{
    EnsembleError, EnsembleProvider, Frequency, RealizationId, Result, Table, Value, DATE,
    ENSEMBLE, REAL,
};
use tracing::{debug, info_span, Span};

/// Which list a term belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Subtract,
    Add,
}

/// Reference ensemble plus add/subtract terms.
///
/// The combined set is computed once, at construction, from the ensembles as
/// they are then. [`with_add`](Self::with_add) and
/// [`with_subtract`](Self::with_subtract) do not refresh it, and neither does
/// a later change to a constituent ensemble; call
/// [`recompute_combined`](Self::recompute_combined) to refresh.
pub struct EnsembleCombination {
    reference: Arc<dyn EnsembleProvider>,
    adds: Vec<Arc<dyn EnsembleProvider>>,
    subs: Vec<Arc<dyn EnsembleProvider>>,
    combined: BTreeSet<RealizationId>,
    span: Span,
}

impl EnsembleCombination {
    /// Create a combination with at most one initial add and subtract term
    pub fn new(
        reference: Arc<dyn EnsembleProvider>,
        add: Option<Arc<dyn EnsembleProvider>>,
        sub: Option<Arc<dyn EnsembleProvider>>,
    ) -> Result<Self> {
        let span = info_span!("ensemble_combination", reference = %reference.name());
        let mut combination = Self {
            reference,
            adds: add.into_iter().collect(),
            subs: sub.into_iter().collect(),
            combined: BTreeSet::new(),
            span,
        };
        combination.recompute_combined()?;
        Ok(combination)
    }

    /// Append an add term
    pub fn with_add(mut self, ensemble: Arc<dyn EnsembleProvider>) -> Self {
        self.adds.push(ensemble);
        self
    }

    /// Append a subtract term
    pub fn with_subtract(mut self, ensemble: Arc<dyn EnsembleProvider>) -> Self {
        self.subs.push(ensemble);
        self
    }

    /// Replace the tracing span operations run under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Intersect the reference's OK realizations with those of every term
    pub fn recompute_combined(&mut self) -> Result<()> {
        let _enter = self.span.enter();
        let mut combined = self.reference.eligible()?;
        for term in self.subs.iter().chain(&self.adds) {
            let eligible = term.eligible()?;
            combined.retain(|index| eligible.contains(index));
        }
        debug!(realizations = combined.len(), "Computed combined realizations");
        self.combined = combined;
        Ok(())
    }

    /// Realizations OK in every participating ensemble, as last computed
    pub fn combined(&self) -> &BTreeSet<RealizationId> {
        &self.combined
    }

    pub fn reference(&self) -> &Arc<dyn EnsembleProvider> {
        &self.reference
    }

    pub fn adds(&self) -> &[Arc<dyn EnsembleProvider>] {
        &self.adds
    }

    pub fn subs(&self) -> &[Arc<dyn EnsembleProvider>] {
        &self.subs
    }

    /// Evaluate the combination for the summary vectors matching `column_keys`.
    ///
    /// All ensembles are resampled onto the reference's daily index and
    /// restricted to the combined set. Every operand row must carry the same
    /// (REAL, DATE) key as the reference row at that position; a mismatch is
    /// a [`EnsembleError::DataIntegrity`] error. The result has DATE and REAL
    /// followed by the reference's value columns.
    pub fn evaluate(&self, column_keys: &[String]) -> Result<Table> {
        let _enter = self.span.enter();
        let time_index = self.reference.smry_dates(Frequency::Daily)?;

        let reference = self.restrict(self.reference.smry(Some(&time_index), column_keys)?);
        let value_columns: Vec<String> = reference
            .columns()
            .iter()
            .filter(|c| ![DATE, REAL, ENSEMBLE].contains(&c.as_str()))
            .cloned()
            .collect();
        let keys = row_keys(&reference);
        let mut accumulator = numeric_values(&reference, &value_columns);

        let terms = self
            .subs
            .iter()
            .map(|term| (Operation::Subtract, term))
            .chain(self.adds.iter().map(|term| (Operation::Add, term)));

        for (operation, term) in terms {
            let operand = self.restrict(term.smry(Some(&time_index), column_keys)?);
            check_alignment(&keys, &operand)?;
            let values = numeric_values(&operand, &value_columns);
            debug!(ensemble = %term.name(), ?operation, rows = operand.len(), "Applying term");
            accumulator = fold(values, accumulator, operation);
        }

        let mut result = Table::new(
            [DATE.to_string(), REAL.to_string()]
                .into_iter()
                .chain(value_columns.iter().cloned()),
        );
        for ((date, real), values) in keys.into_iter().zip(accumulator) {
            let mut row = Vec::with_capacity(values.len() + 2);
            row.push(date);
            row.push(real);
            row.extend(values.into_iter().map(|v| v.map_or(Value::Null, Value::Float)));
            result.push_row(row)?;
        }
        Ok(result)
    }

    fn restrict(&self, table: Table) -> Table {
        let Some(real) = table.column_index(REAL) else {
            return table.filter_rows(|_| false);
        };
        table.filter_rows(|row| {
            row[real]
                .as_realization()
                .is_some_and(|index| self.combined.contains(&index))
        })
    }
}

impl std::fmt::Debug for EnsembleCombination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |terms: &[Arc<dyn EnsembleProvider>]| {
            terms.iter().map(|t| t.name().to_string()).collect::<Vec<_>>()
        };
        f.debug_struct("EnsembleCombination")
            .field("reference", &self.reference.name())
            .field("adds", &names(&self.adds))
            .field("subs", &names(&self.subs))
            .field("combined", &self.combined)
            .finish()
    }
}

type RowKey = (Value, Value);

fn row_keys(table: &Table) -> Vec<RowKey> {
    let date = table.column_index(DATE);
    let real = table.column_index(REAL);
    table
        .rows()
        .iter()
        .map(|row| {
            (
                date.map_or(Value::Null, |i| row[i].clone()),
                real.map_or(Value::Null, |i| row[i].clone()),
            )
        })
        .collect()
}

fn numeric_values(table: &Table, columns: &[String]) -> Vec<Vec<Option<f64>>> {
    let indices: Vec<Option<usize>> = columns.iter().map(|c| table.column_index(c)).collect();
    table
        .rows()
        .iter()
        .map(|row| {
            indices
                .iter()
                .map(|idx| idx.and_then(|i| row[i].as_f64()))
                .collect()
        })
        .collect()
}

fn check_alignment(expected: &[RowKey], operand: &Table) -> Result<()> {
    if operand.len() != expected.len() {
        return Err(EnsembleError::DataIntegrity {
            row: expected.len().min(operand.len()),
            expected: format!("{} rows", expected.len()),
            found: format!("{} rows", operand.len()),
        });
    }

    for (row, (want, got)) in expected.iter().zip(row_keys(operand)).enumerate() {
        if *want != got {
            return Err(EnsembleError::DataIntegrity {
                row,
                expected: format!("REAL {} at {}", want.1, want.0),
                found: format!("REAL {} at {}", got.1, got.0),
            });
        }
    }
    Ok(())
}

fn fold(
    term: Vec<Vec<Option<f64>>>,
    accumulator: Vec<Vec<Option<f64>>>,
    operation: Operation,
) -> Vec<Vec<Option<f64>>> {
    term.into_iter()
        .zip(accumulator)
        .map(|(term_row, acc_row)| {
            term_row
                .into_iter()
                .zip(acc_row)
                .map(|(t, a)| match (t, a, operation) {
                    (Some(t), Some(a), Operation::Subtract) => Some(t - a),
                    (Some(t), Some(a), Operation::Add) => Some(t + a),
                    _ => None,
                })
                .collect()
        })
        .collect()
}
