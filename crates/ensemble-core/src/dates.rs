//! Date resolution for summary time indices
//!
//! Reconciles the irregular report dates of many realizations into one
//! strictly increasing index:
//! - `report`: the sorted, duplicate-free union of the raw dates
//! - `daily`: every calendar day between the earliest and latest raw date
//! - `monthly` / `yearly`: period starts, from the start of the period holding
//!   the earliest raw date to the start of the period holding the latest;
//!   no date past the latest raw date is produced

use std::collections::BTreeSet;

use chrono::{Datelike, Months, NaiveDate};

use crate::types::Frequency;

/// Resolve raw report dates into a time index at the requested frequency.
///
/// An empty input yields an empty index for every frequency.
pub fn resolve_dates<I>(raw: I, freq: Frequency) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let rawdates: Vec<NaiveDate> = raw.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

    let (Some(&start), Some(&end)) = (rawdates.first(), rawdates.last()) else {
        return rawdates;
    };

    match freq {
        Frequency::Report => rawdates,
        Frequency::Daily => start.iter_days().take_while(|day| *day <= end).collect(),
        Frequency::Monthly => step_months(month_start(start), month_start(end), 1),
        Frequency::Yearly => step_months(year_start(start), year_start(end), 12),
    }
}

/// First day of the month holding `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the year holding `date`
pub fn year_start(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}

fn step_months(first: NaiveDate, last: NaiveDate, months: u32) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = Some(first);
    while let Some(date) = current {
        if date > last {
            break;
        }
        dates.push(date);
        current = date.checked_add_months(Months::new(months));
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw() -> Vec<NaiveDate> {
        vec![ymd(2001, 3, 15), ymd(2000, 1, 1), ymd(2000, 11, 20), ymd(2000, 1, 1)]
    }

    #[test]
    fn test_report_is_sorted_union() {
        let dates = resolve_dates(raw(), Frequency::Report);
        assert_eq!(dates, vec![ymd(2000, 1, 1), ymd(2000, 11, 20), ymd(2001, 3, 15)]);
    }

    #[test]
    fn test_daily_spans_extremes() {
        let dates = resolve_dates(vec![ymd(2000, 2, 27), ymd(2000, 3, 2)], Frequency::Daily);
        assert_eq!(dates.len(), 5);
        assert_eq!(dates[2], ymd(2000, 2, 29));
        assert_eq!(dates.last(), Some(&ymd(2000, 3, 2)));
    }

    #[test]
    fn test_monthly_covers_raw_range() {
        let dates = resolve_dates(raw(), Frequency::Monthly);

        assert_eq!(dates.first(), Some(&ymd(2000, 1, 1)));
        assert_eq!(dates.last(), Some(&ymd(2001, 3, 1)));
        assert_eq!(dates.len(), 15);
        for pair in dates.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].checked_add_months(Months::new(1)), Some(pair[1]));
        }
        assert!(dates.iter().all(|d| d.day() == 1));
    }

    #[test]
    fn test_monthly_floors_start() {
        let dates = resolve_dates(vec![ymd(2000, 1, 20), ymd(2000, 3, 1)], Frequency::Monthly);
        assert_eq!(dates, vec![ymd(2000, 1, 1), ymd(2000, 2, 1), ymd(2000, 3, 1)]);
    }

    #[test]
    fn test_yearly() {
        let dates = resolve_dates(raw(), Frequency::Yearly);
        assert_eq!(dates, vec![ymd(2000, 1, 1), ymd(2001, 1, 1)]);
    }

    #[test]
    fn test_no_date_after_latest_raw_date() {
        let raw = vec![ymd(2000, 1, 1), ymd(2000, 3, 15)];
        let monthly = resolve_dates(raw, Frequency::Monthly);
        assert_eq!(monthly, vec![ymd(2000, 1, 1), ymd(2000, 2, 1), ymd(2000, 3, 1)]);

        let raw = vec![ymd(2000, 1, 1), ymd(2001, 3, 15)];
        let yearly = resolve_dates(raw, Frequency::Yearly);
        assert!(yearly.iter().all(|d| *d <= ymd(2001, 3, 15)));
        assert_eq!(yearly.last(), Some(&ymd(2001, 1, 1)));
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve_dates(Vec::new(), Frequency::Monthly).is_empty());
        assert!(resolve_dates(Vec::new(), Frequency::Report).is_empty());
    }
}
