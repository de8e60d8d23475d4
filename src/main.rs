//! Bank Projection CLI
//!
//! Projects a CSV balance sheet under the scenarios of a JSON file and writes
//! one metric row per scenario and period.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use bank_projection::balance_sheet::load_balance_sheet;
use bank_projection::market::load_scenarios;
use bank_projection::metrics::ProfitabilitySummary;
use bank_projection::{ProjectionConfig, ProjectionRun, Scenario, ScenarioRunner};
use chrono::NaiveDate;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "bank-projection", version, about = "Project a bank balance sheet under scenarios")]
struct Args {
    /// Balance sheet CSV
    #[arg(long)]
    balance_sheet: PathBuf,

    /// Scenario JSON; a single empty "base" scenario when omitted
    #[arg(long)]
    scenarios: Option<PathBuf>,

    /// Projection config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Projection start date, overrides the config
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Monthly steps, overrides the config
    #[arg(long)]
    months: Option<u32>,

    /// Yearly steps after the monthly ones, overrides the config
    #[arg(long)]
    years: Option<u32>,

    /// Metric CSV output
    #[arg(long, default_value = "projection_metrics.csv")]
    output: PathBuf,

    /// Run scenarios one after another
    #[arg(long)]
    sequential: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config: ProjectionConfig = match &args.config {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
            serde_json::from_reader(file).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ProjectionConfig::default(),
    };
    if let Some(start) = args.start {
        config.horizon.start_date = start;
    }
    if let Some(months) = args.months {
        config.horizon.number_of_months = months;
    }
    if let Some(years) = args.years {
        config.horizon.number_of_years = years;
    }
    if args.sequential {
        config.parallel = false;
    }

    let balance_sheet = load_balance_sheet(&args.balance_sheet, config.horizon.start_date)
        .with_context(|| format!("loading balance sheet {}", args.balance_sheet.display()))?;
    balance_sheet
        .validate_input()
        .context("balance sheet violates the coupon schedule or balance invariants")?;
    let scenarios = match &args.scenarios {
        Some(path) => load_scenarios(path).with_context(|| format!("loading scenarios {}", path.display()))?,
        None => vec![Scenario::new("base")],
    };

    let runner = ScenarioRunner::new();
    let run = runner.run(&balance_sheet, &scenarios, &config)?;
    for outcome in &run.outcomes {
        if let Some(failure) = &outcome.failure {
            eprintln!("{:?} {}", outcome.state, failure);
        }
    }

    write_metrics(&args.output, &run, &config.metrics)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Wrote {}", args.output.display());

    for summary in runner.profitability(&run)? {
        print_summary(&summary);
    }

    if !run.all_completed() {
        bail!("{} of {} scenarios did not complete", run.failures().count(), run.outcomes.len());
    }
    Ok(())
}

fn write_metrics(path: &Path, run: &ProjectionRun, metrics: &[String]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["scenario".to_string(), "date".to_string()];
    header.extend(metrics.iter().cloned());
    writer.write_record(&header)?;

    for result in run.completed() {
        result.validate_completeness()?;
        for record in &result.periods {
            let mut row = vec![result.scenario.clone(), record.period.end.to_string()];
            row.extend(metrics.iter().map(|m| format!("{:.2}", record.metrics.get(m).copied().unwrap_or(f64::NAN))));
            writer.write_record(&row)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(summary: &ProfitabilitySummary) {
    let pct = |value: Option<f64>| value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0));
    println!("\nScenario {} ({:.2} years)", summary.scenario, summary.years);
    println!("  Avg total assets:    {:>16.2}", summary.average_total_assets);
    println!("  Net interest income: {:>16.2}", summary.net_interest_income);
    println!("  Net income:          {:>16.2}", summary.net_income);
    println!("  Return on assets:    {:>16}", pct(summary.return_on_assets));
    println!("  Return on equity:    {:>16}", pct(summary.return_on_equity));
    println!("  Net interest margin: {:>16}", pct(summary.net_interest_margin));
}
