//! End-to-end scenarios on `realization-*/iter-*` trees

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ensemble_core::{
    EnsembleProvider, Frequency, RealizationId, TimeIndex, Value, DATE, ENSEMBLE, REAL,
};
use ensemble_engine::{DirectoryLoader, EnsembleCombination, EnsembleSet};
use tempfile::TempDir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Write one realization directory; returns its path
fn write_realization(case: &Path, real: u32, iter: u32, ok: bool, level: f64) -> PathBuf {
    let dir = case.join(format!("realization-{real}")).join(format!("iter-{iter}"));
    fs::create_dir_all(&dir).unwrap();
    if ok {
        fs::write(dir.join("OK"), "").unwrap();
    }
    fs::write(dir.join("parameters.txt"), format!("MULTZ {real}\nFACIES channel\n")).unwrap();
    fs::write(
        dir.join("summary.csv"),
        format!(
            "DATE,FOPT,FGPT\n2000-01-01,{a},0\n2000-01-05,{b},1\n",
            a = level,
            b = level + 4.0
        ),
    )
    .unwrap();
    dir
}

/// iter-0 has realizations 0,1,2 with 1 failed; iter-1 has 0,1,2 all OK
fn two_iteration_case() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    for real in 0..3 {
        write_realization(tmp.path(), real, 0, real != 1, 0.0);
        write_realization(tmp.path(), real, 1, true, 10.0);
    }
    tmp
}

fn load(case: &TempDir) -> EnsembleSet {
    let mut set = EnsembleSet::new("case", Vec::new());
    let added = set.add_ensembles_from_path(case.path().to_str().unwrap(), &DirectoryLoader);
    assert_eq!(added, 2);
    set
}

#[test]
fn test_single_realization_path() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = write_realization(&tmp.path().join("data/case"), 3, 2, true, 0.0);

    let mut set = EnsembleSet::new("single", Vec::new());
    let added = set.add_ensembles_from_paths(&[dir.to_str().unwrap()], &DirectoryLoader);

    assert_eq!(added, 1);
    assert_eq!(set.names(), vec!["iter-2"]);
    let ok = set.get("iter-2").unwrap().ok_table().unwrap();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok.get(0, REAL), Some(&Value::Int(3)));
}

#[test]
fn test_bare_directory_expands_to_iterations() {
    let case = two_iteration_case();
    let set = load(&case);

    assert_eq!(set.names(), vec!["iter-0", "iter-1"]);
    let ok = set.ok_table().unwrap();
    assert_eq!(ok.columns(), &[ENSEMBLE, REAL, "OK"]);
    assert_eq!(ok.len(), 6);
}

#[test]
fn test_paths_without_iteration_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let pred = tmp.path().join("realization-0/pred");
    fs::create_dir_all(&pred).unwrap();
    write_realization(tmp.path(), 0, 0, true, 0.0);

    let pattern = format!("{}/realization-*/*", tmp.path().display());
    let mut set = EnsembleSet::new("case", Vec::new());
    set.add_ensembles_from_paths(&[pattern], &DirectoryLoader);

    assert_eq!(set.names(), vec!["iter-0"]);
}

#[test]
fn test_combined_set_across_iterations() {
    let case = two_iteration_case();
    let set = load(&case);

    let combination = EnsembleCombination::new(
        set.get("iter-0").unwrap().clone(),
        Some(set.get("iter-1").unwrap().clone()),
        None,
    )
    .unwrap();

    let combined: Vec<RealizationId> = combination.combined().iter().copied().collect();
    assert_eq!(combined, vec![RealizationId(0), RealizationId(2)]);
}

#[test]
fn test_csv_skips_realization_without_file() {
    let case = two_iteration_case();
    for real in 0..3 {
        for iter in 0..2 {
            if (real, iter) == (1, 1) {
                continue;
            }
            let dir = case
                .path()
                .join(format!("realization-{real}"))
                .join(format!("iter-{iter}"));
            fs::write(dir.join("params.csv"), format!("KEY,VALUE\nA,{real}\n")).unwrap();
        }
    }
    let set = load(&case);

    let table = set.csv("params.csv").unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(table.columns(), &[REAL, "KEY", "VALUE", ENSEMBLE]);

    let missing = table.rows().iter().any(|row| {
        row[0] == Value::Int(1) && row[3] == Value::from("iter-1")
    });
    assert!(!missing);
}

#[test]
fn test_parameters_convert_numeric() {
    let case = two_iteration_case();
    let set = load(&case);

    let numeric = set.parameters(true).unwrap();
    assert_eq!(numeric.columns(), &[ENSEMBLE, REAL, "MULTZ", "FACIES"]);
    assert_eq!(numeric.get(1, "MULTZ"), Some(&Value::Int(1)));
    assert_eq!(numeric.get(1, "FACIES"), Some(&Value::from("channel")));

    let raw = set.parameters(false).unwrap();
    assert_eq!(raw.get(1, "MULTZ"), Some(&Value::from("1")));
}

#[test]
fn test_summary_resampled_across_set() {
    let case = two_iteration_case();
    let set = load(&case);

    let dates = set.smry_dates(Frequency::Daily).unwrap();
    assert_eq!(dates.len(), 5);

    let smry = set
        .smry(&TimeIndex::Frequency(Frequency::Daily), &["FOP*".to_string()])
        .unwrap();
    assert_eq!(smry.columns(), &[DATE, REAL, "FOPT", ENSEMBLE]);
    assert_eq!(smry.len(), 5 * 3 * 2);
    assert_eq!(smry.get(2, "FOPT"), Some(&Value::Float(2.0)));

    let explicit = set
        .smry(&TimeIndex::Dates(vec![ymd(2000, 1, 3)]), &[])
        .unwrap();
    assert_eq!(explicit.len(), 6);
}

#[test]
fn test_combination_difference() {
    let case = two_iteration_case();
    let set = load(&case);

    let result = EnsembleCombination::new(
        set.get("iter-0").unwrap().clone(),
        None,
        Some(set.get("iter-1").unwrap().clone()),
    )
    .unwrap()
    .evaluate(&["FOPT".to_string()])
    .unwrap();

    // iter-1 - iter-0 on realizations 0 and 2, five days each
    assert_eq!(result.len(), 10);
    assert_eq!(result.columns(), &[DATE, REAL, "FOPT"]);
    assert!(result
        .column("FOPT")
        .unwrap()
        .iter()
        .all(|v| v.as_f64() == Some(10.0)));
}

#[test]
fn test_malformed_realization_files_are_skipped() {
    let case = two_iteration_case();
    for real in 0..3 {
        let dir = case.path().join(format!("realization-{real}/iter-0"));
        let body = if real == 1 {
            "KEY,VALUE\nA,1,extra\n".to_string()
        } else {
            format!("KEY,VALUE\nA,{real}\n")
        };
        fs::write(dir.join("params.csv"), body).unwrap();
    }
    fs::write(
        case.path().join("realization-2/iter-1/summary.csv"),
        "DATE,FOPT,FGPT\n2000-13-01,0,0\n",
    )
    .unwrap();
    let set = load(&case);

    let table = set.csv("params.csv").unwrap();
    assert_eq!(table.len(), 2);
    let reals: Vec<&Value> = table.column(REAL).unwrap();
    assert_eq!(reals, vec![&Value::Int(0), &Value::Int(2)]);

    // realization-2 of iter-1 contributes no dates and no rows
    assert_eq!(set.smry_dates(Frequency::Daily).unwrap().len(), 5);
    let smry = set
        .smry(&TimeIndex::Frequency(Frequency::Daily), &["FOPT".to_string()])
        .unwrap();
    assert_eq!(smry.len(), 5 * 3 + 5 * 2);
}
