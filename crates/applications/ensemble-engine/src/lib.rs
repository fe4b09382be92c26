//! Ensemble Engine
//!
//! Aggregates results from ensembles of simulation realizations and derives
//! new data by arithmetic between ensembles.
//!
//! ## Components
//!
//! - [`ensemble::Ensemble`]: realizations of one iteration, stacked with a REAL column
//! - [`ensemble_set::EnsembleSet`]: ensembles keyed by name, stacked with an ENSEMBLE column,
//!   and the time-index reconciliation across them
//! - [`combination::EnsembleCombination`]: reference ensemble plus add/subtract terms
//!   restricted to realizations that are OK everywhere
//!
//! Realization data comes in through the providers in [`realization`]; the
//! on-disk `realization-*/iter-*` layout is classified by [`paths`].

pub mod combination;
pub mod ensemble;
pub mod ensemble_set;
pub mod paths;
pub mod realization;

pub use combination::EnsembleCombination;
pub use ensemble::Ensemble;
pub use ensemble_set::EnsembleSet;
pub use realization::{DirectoryLoader, DirectoryRealization, MemoryRealization};
