//! Profitability over the whole projection horizon

use serde::Serialize;

use super::{row_sides, BalanceAggregation, FlowAggregation, Measure, Metric, MetricContext};
use crate::balance_sheet::Side;
use crate::calendar::DayCount;
use crate::error::{ProjectionError, Result};
use crate::projection::ProjectionResult;
use crate::registry::Registries;
use crate::rules::{FlowColumn, PeriodFlows};

/// Convert a return over `years` into an annual rate
pub fn annualize(value: f64, years: f64) -> f64 {
    (1.0 + value).powf(1.0 / years) - 1.0
}

/// Average balances and income of one scenario's projection
#[derive(Debug, Clone, Serialize)]
pub struct ProfitabilitySummary {
    pub scenario: String,
    pub years: f64,
    /// Day-weighted averages of the opening balances of each period
    pub average_total_assets: f64,
    pub average_total_equity: f64,
    pub net_interest_income: f64,
    pub net_income: f64,
    pub return_on_assets: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub net_interest_margin: Option<f64>,
}

impl ProfitabilitySummary {
    pub fn from_result(result: &ProjectionResult, registries: &Registries) -> Result<Self> {
        if result.periods.is_empty() {
            return Err(ProjectionError::InvalidInput(format!(
                "scenario '{}' has no periods to measure profitability over",
                result.scenario
            )));
        }
        let sides = row_sides(&result.initial, &registries.classification)?;
        let assets = BalanceAggregation {
            measure: Measure::BookValue,
            side: Some(Side::Asset),
        };
        let equity = BalanceAggregation {
            measure: Measure::BookValue,
            side: Some(Side::Equity),
        };
        let interest = FlowAggregation::income(&[FlowColumn::Interest, FlowColumn::Accrual]);
        let income = FlowAggregation::income(&[
            FlowColumn::Interest,
            FlowColumn::Accrual,
            FlowColumn::PremiumAmortization,
            FlowColumn::ValuationIncome,
        ]);

        let start = result.initial.as_of();
        let end = result.final_balance_sheet().as_of();
        let total_days = (end - start).num_days() as f64;
        let no_flows = PeriodFlows::default();

        let mut average_total_assets = 0.0;
        let mut average_total_equity = 0.0;
        let mut net_interest_income = 0.0;
        let mut net_income = 0.0;
        let mut opening = &result.initial;
        for record in &result.periods {
            let weight = record.period.days() as f64 / total_days;
            let at_open = MetricContext {
                balance_sheet: opening,
                flows: &no_flows,
                sides: &sides,
            };
            average_total_assets += assets.evaluate(&at_open) * weight;
            average_total_equity += equity.evaluate(&at_open) * weight;

            let in_period = MetricContext {
                balance_sheet: &record.balance_sheet,
                flows: &record.flows,
                sides: &sides,
            };
            net_interest_income += interest.evaluate(&in_period);
            net_income += income.evaluate(&in_period);
            opening = &record.balance_sheet;
        }

        let years = DayCount::Actual36525.year_fraction(start, end);
        let ratio = |numerator: f64, denominator: f64| {
            (denominator != 0.0).then(|| annualize(numerator / denominator, years))
        };
        Ok(Self {
            scenario: result.scenario.clone(),
            years,
            average_total_assets,
            average_total_equity,
            net_interest_income,
            net_income,
            return_on_assets: ratio(net_income, average_total_assets),
            return_on_equity: ratio(net_income, average_total_equity),
            net_interest_margin: ratio(net_interest_income, average_total_assets),
        })
    }
}
