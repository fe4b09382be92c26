//! Ensemble aggregation CLI
//!
//! ```bash
//! # Parameters of every iteration under a case directory
//! ensemble-agg --path /scratch/case parameters
//!
//! # Monthly summary vectors for two iterations
//! ensemble-agg --path '/scratch/case/realization-*/iter-0' \
//!              --path '/scratch/case/realization-*/iter-1' \
//!              summary --time-index monthly --key 'FOP*'
//!
//! # iter-1 minus iter-0, on realizations OK in both
//! ensemble-agg --path /scratch/case combine --reference iter-0 --subtract iter-1
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ensemble_core::{EnsembleProvider, Frequency, Table, TimeIndex, Value, DATE};
use ensemble_engine::{DirectoryLoader, EnsembleCombination, EnsembleSet};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Aggregate results from ensembles of simulation realizations
#[derive(Parser, Debug)]
#[command(name = "ensemble-agg")]
#[command(about = "Aggregate and combine ensembles of simulation realizations", long_about = None)]
struct Cli {
    /// Ensemble set name
    #[arg(long, global = true, default_value = "ensembleset")]
    name: String,

    /// Case directory or realization path pattern (repeatable)
    #[arg(short, long = "path", global = true)]
    paths: Vec<String>,

    /// Output file (stdout when absent)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Csv)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Realization status per ensemble
    Ok,

    /// Parameters of every realization
    Parameters {
        /// Keep parameter values as text
        #[arg(long)]
        raw: bool,
    },

    /// A per-realization CSV file aggregated over the set
    Csv {
        /// File name relative to each realization directory
        filename: String,
    },

    /// Summary vectors
    Summary {
        /// Frequency keyword (report, daily, monthly, yearly) or comma-separated dates
        #[arg(long, default_value = "")]
        time_index: String,

        /// Column key wildcards (repeatable)
        #[arg(short, long = "key")]
        keys: Vec<String>,
    },

    /// Resolved dates across the set
    Dates {
        /// Frequency keyword (report, daily, monthly, yearly)
        #[arg(long, default_value = "monthly")]
        freq: String,
    },

    /// Arithmetic between ensembles of the set
    Combine {
        /// Reference ensemble name
        #[arg(long)]
        reference: String,

        /// Ensembles to add (repeatable, applied in order)
        #[arg(long = "add")]
        adds: Vec<String>,

        /// Ensembles to subtract (repeatable, applied in order before adds)
        #[arg(long = "subtract")]
        subs: Vec<String>,

        /// Column key wildcards (repeatable)
        #[arg(short, long = "key")]
        keys: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ensemble_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut set = EnsembleSet::new(cli.name.clone(), Vec::<Arc<dyn EnsembleProvider>>::new());
    let added = match cli.paths.as_slice() {
        [] => anyhow::bail!("at least one --path is required"),
        [single] => set.add_ensembles_from_path(single, &DirectoryLoader),
        many => set.add_ensembles_from_paths(many, &DirectoryLoader),
    };
    if added == 0 {
        warn!("No ensembles found for the given paths");
    }
    info!(ensembles = ?set.names(), "Loaded ensemble set {}", set.name());

    let table = match cli.command {
        Commands::Ok => set.ok_table()?,
        Commands::Parameters { raw } => set.parameters(!raw)?,
        Commands::Csv { filename } => set.csv(&filename)?,
        Commands::Summary { time_index, keys } => {
            let time_index = TimeIndex::parse(&time_index)?;
            set.smry(&time_index, &keys)?
        }
        Commands::Dates { freq } => {
            let freq: Frequency = freq.parse()?;
            let mut table = Table::new([DATE]);
            for date in set.smry_dates(freq)? {
                table.push_row(vec![Value::Date(date)])?;
            }
            table
        }
        Commands::Combine {
            reference,
            adds,
            subs,
            keys,
        } => {
            let lookup = |name: &str| {
                set.get(name)
                    .cloned()
                    .with_context(|| format!("ensemble {name} not in set {}", set.name()))
            };

            let mut combination = EnsembleCombination::new(lookup(&reference)?, None, None)?;
            for name in &subs {
                combination = combination.with_subtract(lookup(name)?);
            }
            for name in &adds {
                combination = combination.with_add(lookup(name)?);
            }
            combination.recompute_combined()?;
            info!(
                realizations = combination.combined().len(),
                "Combining ensembles"
            );
            combination.evaluate(&keys)?
        }
    };

    let rendered = match cli.format {
        Format::Csv => table.to_csv(),
        Format::Json => table.to_json_records()?,
    };

    match cli.output {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(rows = table.len(), "Results saved to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
