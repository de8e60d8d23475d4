//! Projection output: per-period snapshots, flows and metric values

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::state::RunState;
use crate::balance_sheet::BalanceSheet;
use crate::calendar::Period;
use crate::error::{ProjectionError, Result};
use crate::rules::PeriodFlows;

/// Everything recorded at the end of one period
#[derive(Debug, Clone)]
pub struct PeriodRecord {
    pub period: Period,
    pub balance_sheet: BalanceSheet,
    pub flows: PeriodFlows,
    /// Values keyed by the metric identifiers requested for the run
    pub metrics: BTreeMap<String, f64>,
}

/// Append-only, period-ordered result of one scenario
#[derive(Debug, Clone)]
pub struct ProjectionResult {
    pub scenario: String,
    /// Period-0 snapshot
    pub initial: BalanceSheet,
    pub requested_metrics: Vec<String>,
    pub periods: Vec<PeriodRecord>,
}

impl ProjectionResult {
    pub fn new(scenario: &str, initial: BalanceSheet, requested_metrics: Vec<String>) -> Self {
        Self {
            scenario: scenario.to_string(),
            initial,
            requested_metrics,
            periods: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, record: PeriodRecord) {
        self.periods.push(record);
    }

    /// Snapshot at the end of the last period, or the initial one if there were none
    pub fn final_balance_sheet(&self) -> &BalanceSheet {
        self.periods
            .last()
            .map(|record| &record.balance_sheet)
            .unwrap_or(&self.initial)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.periods.iter().map(|record| record.period.end).collect()
    }

    /// One metric over all periods; `None` if it was not recorded
    pub fn metric_series(&self, metric: &str) -> Option<Vec<f64>> {
        self.periods
            .iter()
            .map(|record| record.metrics.get(metric).copied())
            .collect()
    }

    /// Every requested metric is present in every period
    pub fn validate_completeness(&self) -> Result<()> {
        for record in &self.periods {
            if let Some(missing) = self
                .requested_metrics
                .iter()
                .find(|metric| !record.metrics.contains_key(*metric))
            {
                return Err(ProjectionError::InvalidInput(format!(
                    "scenario '{}' is missing metric '{}' at {}",
                    self.scenario, missing, record.period.end
                )));
            }
        }
        Ok(())
    }
}

/// Period and item a scenario failed at
#[derive(Debug)]
pub struct ScenarioFailure {
    pub scenario: String,
    pub period_end: Option<NaiveDate>,
    pub item: Option<String>,
    pub error: ProjectionError,
}

impl std::fmt::Display for ScenarioFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scenario '{}'", self.scenario)?;
        if let Some(date) = self.period_end {
            write!(f, " at {}", date)?;
        }
        if let Some(item) = &self.item {
            write!(f, " item '{}'", item)?;
        }
        write!(f, ": {}", self.error)
    }
}

/// Final state of one scenario run
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub state: RunState,
    pub result: Option<ProjectionResult>,
    pub failure: Option<ScenarioFailure>,
}

impl ScenarioOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// Outcomes of every scenario, in input order
#[derive(Debug)]
pub struct ProjectionRun {
    pub outcomes: Vec<ScenarioOutcome>,
}

impl ProjectionRun {
    pub fn outcome(&self, scenario: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|outcome| outcome.scenario == scenario)
    }

    /// Result of a completed scenario
    pub fn result(&self, scenario: &str) -> Option<&ProjectionResult> {
        self.outcome(scenario).and_then(|outcome| outcome.result.as_ref())
    }

    pub fn completed(&self) -> impl Iterator<Item = &ProjectionResult> {
        self.outcomes.iter().filter_map(|outcome| outcome.result.as_ref())
    }

    /// Failed and cancelled scenarios
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioFailure> {
        self.outcomes.iter().filter_map(|outcome| outcome.failure.as_ref())
    }

    pub fn all_completed(&self) -> bool {
        self.outcomes.iter().all(ScenarioOutcome::is_completed)
    }
}
