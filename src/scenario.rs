//! Scenario runner for repeated projections of one balance sheet
//!
//! Builds the registries once, then runs any number of scenario sets or
//! horizon configurations against them without rebuilding handlers.

use std::sync::Arc;

use crate::balance_sheet::BalanceSheet;
use crate::error::Result;
use crate::market::Scenario;
use crate::metrics::ProfitabilitySummary;
use crate::projection::{CancellationToken, Projection, ProjectionConfig, ProjectionRun};
use crate::registry::Registries;

/// Pre-built registries plus a cancellation token shared by every run
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new();
/// let run = runner.run(&balance_sheet, &scenarios, &ProjectionConfig::default())?;
/// for result in run.completed() {
///     println!("{}: {:?}", result.scenario, result.metric_series("netincome"));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    registries: Arc<Registries>,
    cancel: CancellationToken,
}

impl ScenarioRunner {
    /// Runner with the built-in handlers
    pub fn new() -> Self {
        Self::with_registries(Registries::standard())
    }

    /// Runner with custom handlers
    pub fn with_registries(registries: Registries) -> Self {
        Self {
            registries: Arc::new(registries),
            cancel: CancellationToken::new(),
        }
    }

    /// Run every scenario under one configuration
    pub fn run(&self, balance_sheet: &BalanceSheet, scenarios: &[Scenario], config: &ProjectionConfig) -> Result<ProjectionRun> {
        let projection = Projection::from_config(config, Arc::clone(&self.registries))?;
        projection.run(balance_sheet, scenarios, &self.cancel)
    }

    /// Run the same scenarios under several configurations
    pub fn run_configs(
        &self,
        balance_sheet: &BalanceSheet,
        scenarios: &[Scenario],
        configs: &[ProjectionConfig],
    ) -> Result<Vec<ProjectionRun>> {
        configs
            .iter()
            .map(|config| self.run(balance_sheet, scenarios, config))
            .collect()
    }

    /// Profitability of every completed scenario of a run
    pub fn profitability(&self, run: &ProjectionRun) -> Result<Vec<ProfitabilitySummary>> {
        run.completed()
            .filter(|result| !result.periods.is_empty())
            .map(|result| ProfitabilitySummary::from_result(result, &self.registries))
            .collect()
    }

    /// Token that aborts in-flight runs between periods
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance_sheet::BalanceSheetItem;
    use crate::calendar::HorizonConfig;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config(months: u32) -> ProjectionConfig {
        ProjectionConfig {
            horizon: HorizonConfig {
                start_date: d(2024, 12, 31),
                number_of_months: months,
                ..HorizonConfig::default()
            },
            ..ProjectionConfig::default()
        }
    }

    #[test]
    fn test_runner_configs() {
        let runner = ScenarioRunner::new();
        let loan = BalanceSheetItem::new(
            "L1",
            "annuity",
            "monthly",
            12_000.0,
            0.06,
            d(2024, 12, 31),
            d(2025, 12, 31),
            Some(d(2024, 12, 31)),
        );
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![loan]).unwrap();
        let scenarios = [Scenario::new("base")];

        let runs = runner.run_configs(&sheet, &scenarios, &[config(6), config(12)]).unwrap();
        assert_eq!(runs[0].result("base").unwrap().periods.len(), 6);
        let full = runs[1].result("base").unwrap();
        assert_eq!(full.periods.len(), 12);
        assert!(full.final_balance_sheet().nominal()[0].abs() < 1e-9);

        let summaries = runner.profitability(&runs[1]).unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].net_income > 0.0);
    }
}
