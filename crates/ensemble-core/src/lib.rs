//! Ensemble Core - Shared types and traits
//!
//! This crate defines the abstractions used by the ensemble engine:
//! - Stacked tables (`Table`, `Value`)
//! - Date resolution for summary time indices
//! - The realization and ensemble provider contracts
//! - Error types

pub mod dates;
pub mod error;
pub mod table;
pub mod traits;
pub mod types;

pub use dates::*;
pub use error::*;
pub use table::*;
pub use traits::*;
pub use types::*;
