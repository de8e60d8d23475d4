//! Projection orchestrator: rules over the horizon, once per scenario

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::result::{PeriodRecord, ProjectionResult, ProjectionRun, ScenarioFailure, ScenarioOutcome};
use super::state::{CancellationToken, RunState};
use crate::balance_sheet::{BalanceSheet, KeyColumn, Side};
use crate::calendar::{HorizonConfig, Period, TimeHorizon};
use crate::error::{ProjectionError, Result};
use crate::market::Scenario;
use crate::metrics::{row_sides, Metric, MetricContext};
use crate::registry::Registries;
use crate::rules::{default_rules, PeriodState, Rule, RuleContext};

/// Configuration for a projection run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    #[serde(flatten)]
    pub horizon: HorizonConfig,

    /// Metric identifiers evaluated every period
    pub metrics: Vec<String>,

    /// Run scenarios on the rayon thread pool
    pub parallel: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            horizon: HorizonConfig::default(),
            metrics: ["totalassets", "totalliabilities", "interestincome", "netincome"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            parallel: true,
        }
    }
}

/// Drives the rules across a time horizon for a set of scenarios
pub struct Projection {
    horizon: TimeHorizon,
    registries: Arc<Registries>,
    rules: Vec<Arc<dyn Rule>>,
    metrics: Vec<String>,
    parallel: bool,
}

impl Projection {
    pub fn new(horizon: TimeHorizon, registries: Arc<Registries>, rules: Vec<Arc<dyn Rule>>) -> Self {
        Self {
            horizon,
            registries,
            rules,
            metrics: Vec::new(),
            parallel: true,
        }
    }

    /// Runoff followed by revaluation
    pub fn with_default_rules(horizon: TimeHorizon, registries: Arc<Registries>) -> Self {
        Self::new(horizon, registries, default_rules())
    }

    pub fn from_config(config: &ProjectionConfig, registries: Arc<Registries>) -> Result<Self> {
        let horizon = TimeHorizon::from_config(&config.horizon)?;
        Ok(Self::with_default_rules(horizon, registries)
            .with_metrics(&config.metrics)
            .with_parallel(config.parallel))
    }

    pub fn with_metrics<S: AsRef<str>>(mut self, metrics: &[S]) -> Self {
        self.metrics = metrics.iter().map(|m| m.as_ref().to_string()).collect();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn horizon(&self) -> &TimeHorizon {
        &self.horizon
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Configuration checks that abort the whole run before any period executes
    pub fn validate(&self, initial: &BalanceSheet, scenarios: &[Scenario]) -> Result<()> {
        if initial.as_of() != self.horizon.start_date() {
            return Err(ProjectionError::InvalidPeriodBounds {
                start: initial.as_of(),
                end: self.horizon.start_date(),
                reason: "balance sheet date differs from the horizon start".to_string(),
            });
        }

        let registries = &self.registries;
        for column in KeyColumn::ALL {
            for group in initial.groups(column) {
                if !registries.contains(column, &group.key) {
                    return Err(ProjectionError::unknown_key(registries.registry_name(column), &group.key));
                }
            }
        }
        for metric in &self.metrics {
            registries.metric.resolve(metric)?;
        }

        let mut names = std::collections::HashSet::new();
        for scenario in scenarios {
            if !names.insert(scenario.name.as_str()) {
                return Err(ProjectionError::InvalidInput(format!(
                    "scenario '{}' appears more than once",
                    scenario.name
                )));
            }
            if let Some((key, value)) = scenario.parameters.iter().find(|(_, value)| !value.is_finite()) {
                return Err(ProjectionError::InvalidInput(format!(
                    "scenario '{}' parameter '{}' is not finite ({})",
                    scenario.name, key, value
                )));
            }
        }
        Ok(())
    }

    /// Run every scenario from the same initial balance sheet
    ///
    /// Configuration errors fail the whole call; anything that goes wrong
    /// inside a scenario only fails that scenario's outcome.
    pub fn run(&self, initial: &BalanceSheet, scenarios: &[Scenario], cancel: &CancellationToken) -> Result<ProjectionRun> {
        self.validate(initial, scenarios)?;
        info!(
            "Projecting {} rows over {} periods for {} scenarios",
            initial.len(),
            self.horizon.len(),
            scenarios.len()
        );

        let outcomes: Vec<ScenarioOutcome> = if self.parallel {
            scenarios
                .par_iter()
                .map(|scenario| self.run_scenario(initial, scenario, cancel))
                .collect()
        } else {
            scenarios
                .iter()
                .map(|scenario| self.run_scenario(initial, scenario, cancel))
                .collect()
        };
        Ok(ProjectionRun { outcomes })
    }

    /// Run one scenario through the whole horizon
    pub fn run_scenario(&self, initial: &BalanceSheet, scenario: &Scenario, cancel: &CancellationToken) -> ScenarioOutcome {
        let mut state = RunState::NotStarted;
        let name = scenario.name.clone();
        if cancel.is_cancelled() {
            warn!("Scenario '{}' cancelled before it started", name);
            return cancelled(name, state, None);
        }
        state = state.advance(RunState::Running);
        info!("Scenario '{}' started", name);

        let failed = |state: RunState, period: Option<Period>, error: ProjectionError| {
            error!("Scenario '{}' failed: {}", name, error);
            ScenarioOutcome {
                scenario: name.clone(),
                state: state.advance(RunState::Failed),
                result: None,
                failure: Some(ScenarioFailure {
                    scenario: name.clone(),
                    period_end: period.map(|p| p.end),
                    item: error.item().map(str::to_string),
                    error,
                }),
            }
        };

        let prepared = self.resolve_metrics().and_then(|metrics| {
            let sides = row_sides(initial, &self.registries.classification)?;
            Ok((metrics, sides))
        });
        let (metrics, sides) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => return failed(state, None, error),
        };

        let mut result = ProjectionResult::new(&name, initial.for_scenario(&name), self.metrics.clone());
        for period in self.horizon.periods() {
            if cancel.is_cancelled() {
                warn!("Scenario '{}' cancelled before {}", name, period.end);
                return cancelled(name.clone(), state, Some(period.end));
            }
            let record = self.step(result.final_balance_sheet(), period, scenario, &metrics, &sides);
            match record {
                Ok(record) => result.push(record),
                Err(error) => return failed(state, Some(period), error),
            }
        }

        info!("Scenario '{}' completed {} periods", name, result.periods.len());
        ScenarioOutcome {
            scenario: name.clone(),
            state: state.advance(RunState::Completed),
            result: Some(result),
            failure: None,
        }
    }

    fn resolve_metrics(&self) -> Result<Vec<(String, Arc<dyn Metric>)>> {
        self.metrics
            .iter()
            .map(|id| Ok((id.clone(), self.registries.metric.resolve(id)?)))
            .collect()
    }

    /// One period transition: every rule in order, then metrics on the result
    fn step(
        &self,
        opening: &BalanceSheet,
        period: Period,
        scenario: &Scenario,
        metrics: &[(String, Arc<dyn Metric>)],
        sides: &[Side],
    ) -> Result<PeriodRecord> {
        let context = RuleContext {
            period,
            scenario,
            registries: &self.registries,
        };
        let mut state = PeriodState::open(opening, period);
        for rule in &self.rules {
            state = rule.apply(opening, state, &context)?;
        }
        state.balance_sheet.validate()?;
        debug!("Scenario '{}' reached {}", scenario.name, period.end);

        let metric_context = MetricContext {
            balance_sheet: &state.balance_sheet,
            flows: &state.flows,
            sides,
        };
        let values: BTreeMap<String, f64> = metrics
            .iter()
            .map(|(id, metric)| (id.clone(), metric.evaluate(&metric_context)))
            .collect();

        Ok(PeriodRecord {
            period,
            balance_sheet: state.balance_sheet,
            flows: state.flows,
            metrics: values,
        })
    }
}

/// Outcome of a scenario stopped by its token; partial results are dropped
fn cancelled(scenario: String, state: RunState, period_end: Option<NaiveDate>) -> ScenarioOutcome {
    ScenarioOutcome {
        scenario: scenario.clone(),
        state: state.advance(RunState::Cancelled),
        result: None,
        failure: Some(ScenarioFailure {
            scenario,
            period_end,
            item: None,
            error: ProjectionError::Cancelled,
        }),
    }
}
