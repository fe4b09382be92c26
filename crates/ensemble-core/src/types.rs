//! Core types shared across ensemble components

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, Result};

/// Realization index column
pub const REAL: &str = "REAL";
/// Ensemble name column
pub const ENSEMBLE: &str = "ENSEMBLE";
/// Date column of summary tables
pub const DATE: &str = "DATE";
/// Status column of OK tables
pub const OK: &str = "OK";

/// Unique identifier for a realization within an ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RealizationId(pub u32);

impl RealizationId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RealizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RealizationId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Resampling frequency for date resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Exact union of observed report dates
    Report,
    Daily,
    Monthly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "report" => Ok(Frequency::Report),
            "daily" => Ok(Frequency::Daily),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(EnsembleError::invalid_argument(format!(
                "Requested frequency {other} not supported"
            ))),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Report => write!(f, "report"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

/// Time index requested for summary aggregation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimeIndex {
    /// No resampling, every realization keeps its native report times
    #[default]
    Native,
    /// Resolve a concrete index from the frequency first
    Frequency(Frequency),
    /// Caller-supplied dates, used as given
    Dates(Vec<NaiveDate>),
}

impl TimeIndex {
    /// Parse a frequency keyword or a comma-separated list of ISO dates.
    ///
    /// Explicit dates are sorted and deduplicated.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TimeIndex::Native);
        }
        if let Ok(freq) = text.parse::<Frequency>() {
            return Ok(TimeIndex::Frequency(freq));
        }

        let mut dates = text
            .split(',')
            .map(|item| {
                NaiveDate::parse_from_str(item.trim(), "%Y-%m-%d").map_err(|_| {
                    EnsembleError::invalid_argument(format!(
                        "Time index {text} is neither a frequency nor a list of dates"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        dates.sort();
        dates.dedup();
        Ok(TimeIndex::Dates(dates))
    }
}

impl From<Frequency> for TimeIndex {
    fn from(freq: Frequency) -> Self {
        TimeIndex::Frequency(freq)
    }
}

impl From<Vec<NaiveDate>> for TimeIndex {
    fn from(dates: Vec<NaiveDate>) -> Self {
        TimeIndex::Dates(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_keywords() {
        assert_eq!("report".parse::<Frequency>().unwrap(), Frequency::Report);
        assert_eq!("yearly".parse::<Frequency>().unwrap(), Frequency::Yearly);
        assert_eq!(Frequency::Monthly.to_string(), "monthly");
    }

    #[test]
    fn test_unknown_frequency_names_value() {
        let err = "weekly".parse::<Frequency>().unwrap_err();
        assert!(matches!(err, EnsembleError::InvalidArgument(_)));
        assert!(err.to_string().contains("weekly"));
    }

    #[test]
    fn test_time_index_parse() {
        assert_eq!(TimeIndex::parse("").unwrap(), TimeIndex::Native);
        assert_eq!(
            TimeIndex::parse("daily").unwrap(),
            TimeIndex::Frequency(Frequency::Daily)
        );

        let parsed = TimeIndex::parse("2001-02-01, 2000-01-01,2001-02-01").unwrap();
        assert_eq!(
            parsed,
            TimeIndex::Dates(vec![
                NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2001, 2, 1).unwrap(),
            ])
        );

        assert!(TimeIndex::parse("fortnightly").is_err());
    }
}
