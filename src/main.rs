//! # Analyze a results file with a flat 2% risk-free rate
//! dca-analytics analyze --results results.csv
//!
//! # Use the T-bill history and export monthly cashflows
//! dca-analytics analyze --results results.csv --historical-rates --rates TB3MS.csv --export cashflows.csv
//!
//! # Check a results file before analysis
//! dca-analytics validate --results results.csv

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dca_analytics::data::{export_monthly_cashflows, ResultsLoader};
use dca_analytics::metrics::{analyze_risk_adjusted_returns, benchmark_drawdown, strategy_drawdown, AnalysisConfig};
use dca_analytics::validation::ResultsIntegrityValidator;

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "dca-analytics")]
#[command(about = "Sharpe ratio and IRR for DCA vs. dynamic DCA results")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute risk-adjusted metrics for a daily results file
    Analyze {
        /// Path to the daily results CSV
        #[arg(short, long)]
        results: PathBuf,

        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use historical T-bill rates instead of the flat rate
        #[arg(long)]
        historical_rates: bool,

        /// Path to the TB3MS CSV
        #[arg(long)]
        rates: Option<PathBuf>,

        /// Flat annual risk-free rate (decimal, e.g. 0.02)
        #[arg(long)]
        flat_rate: Option<f64>,

        /// Print metrics as JSON
        #[arg(long)]
        json: bool,

        /// Write monthly cashflows to this CSV
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Run integrity checks on a daily results file
    Validate {
        /// Path to the daily results CSV
        #[arg(short, long)]
        results: PathBuf,
    },
}

fn load_config(
    path: Option<PathBuf>,
    historical_rates: bool,
    rates: Option<PathBuf>,
    flat_rate: Option<f64>,
) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(path) => AnalysisConfig::from_toml_file(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if historical_rates {
        config.risk_free.use_historical_rates = true;
    }
    if let Some(rates) = rates {
        config.risk_free.rates_path = rates;
    }
    if let Some(flat_rate) = flat_rate {
        config.risk_free.flat_rate = flat_rate;
    }
    Ok(config)
}

fn cmd_analyze(
    results_path: PathBuf,
    config: AnalysisConfig,
    json: bool,
    export: Option<PathBuf>,
) -> Result<()> {
    let results = ResultsLoader::new(&results_path)
        .load()
        .with_context(|| format!("Failed to load {}", results_path.display()))?;

    let (metrics, rows) = analyze_risk_adjusted_returns(&results, &config);

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        let bench_dd = benchmark_drawdown(&results);
        let strat_dd = strategy_drawdown(&results);

        println!("{}", SEPARATOR);
        println!("{}", metrics.summary());
        println!();
        println!("Max Drawdown (Total Value)");
        println!("  Benchmark: {:.2}%", bench_dd.max_drawdown_pct);
        println!("  Strategy:  {:.2}%", strat_dd.max_drawdown_pct);
        println!("{}", SEPARATOR);
    }

    if let Some(path) = export {
        export_monthly_cashflows(&metrics, &rows, &path)
            .with_context(|| format!("Could not save {}", path.display()))?;
    }

    Ok(())
}

fn cmd_validate(results_path: PathBuf) -> Result<()> {
    let report = ResultsIntegrityValidator::validate_file(&results_path)
        .with_context(|| format!("Failed to load {}", results_path.display()))?;

    println!("{}", report.summary());
    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!("  [{}] {}: {}", status, check.name, check.message);
        if let Some(details) = &check.details {
            println!("         {}", details);
        }
    }

    if !report.all_passed() {
        anyhow::bail!("{} checks failed", report.failed_checks().len());
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dca_analytics=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            results,
            config,
            historical_rates,
            rates,
            flat_rate,
            json,
            export,
        } => {
            let config = load_config(config, historical_rates, rates, flat_rate)?;
            cmd_analyze(results, config, json, export)?;
        }
        Commands::Validate { results } => {
            cmd_validate(results)?;
        }
    }

    Ok(())
}
