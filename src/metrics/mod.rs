//! Metrics evaluated on each period's balance sheet and flows

mod profitability;

use std::sync::Arc;

use crate::balance_sheet::{BalanceSheet, Classification, KeyColumn, Side};
use crate::error::Result;
use crate::registry::Registry;
use crate::rules::{Dispatch, FlowColumn, PeriodFlows};

pub use profitability::{annualize, ProfitabilitySummary};

/// Inputs of a metric for one period
#[derive(Debug, Clone, Copy)]
pub struct MetricContext<'a> {
    pub balance_sheet: &'a BalanceSheet,
    pub flows: &'a PeriodFlows,
    /// Balance sheet side of every row
    pub sides: &'a [Side],
}

/// Derived metric contract bound to a metric key
pub trait Metric: Send + Sync {
    fn evaluate(&self, context: &MetricContext<'_>) -> f64;
}

/// Resolve the side of every row through its metric group
pub fn row_sides(sheet: &BalanceSheet, classification: &Registry<Classification>) -> Result<Vec<Side>> {
    let dispatch = Dispatch::resolve(sheet, KeyColumn::MetricGroup, classification)?;
    Ok((0..sheet.len()).map(|row| dispatch.get(row).side).collect())
}

/// Stock measured on the balance sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    BookValue,
    Nominal,
    AccruedInterest,
}

/// Sum of a stock over the rows on one side (or all rows)
#[derive(Debug, Clone, Copy)]
pub struct BalanceAggregation {
    pub measure: Measure,
    pub side: Option<Side>,
}

impl Metric for BalanceAggregation {
    fn evaluate(&self, context: &MetricContext<'_>) -> f64 {
        let values = match self.measure {
            Measure::BookValue => context.balance_sheet.book_value(),
            Measure::Nominal => context.balance_sheet.nominal(),
            Measure::AccruedInterest => context.balance_sheet.accrued_interest(),
        };
        values
            .iter()
            .zip(context.sides)
            .filter(|(_, side)| self.side.map_or(true, |wanted| **side == wanted))
            .map(|(value, _)| value)
            .sum()
    }
}

/// Sum of a flow column, optionally signed as income of the bank
#[derive(Debug, Clone)]
pub struct FlowAggregation {
    pub columns: Vec<FlowColumn>,
    pub as_income: bool,
}

impl FlowAggregation {
    pub fn new(column: FlowColumn) -> Self {
        Self {
            columns: vec![column],
            as_income: false,
        }
    }

    pub fn income(columns: &[FlowColumn]) -> Self {
        Self {
            columns: columns.to_vec(),
            as_income: true,
        }
    }
}

impl Metric for FlowAggregation {
    fn evaluate(&self, context: &MetricContext<'_>) -> f64 {
        let mut total = 0.0;
        for column in &self.columns {
            let values = context.flows.column(*column);
            total += values
                .iter()
                .zip(context.sides)
                .map(|(value, side)| if self.as_income { value * side.income_sign() } else { *value })
                .sum::<f64>();
        }
        total
    }
}

pub(crate) fn register_defaults(registry: &mut Registry<dyn Metric>) {
    let balance = |measure, side| -> Arc<dyn Metric> { Arc::new(BalanceAggregation { measure, side }) };
    registry.register("totalassets", balance(Measure::BookValue, Some(Side::Asset)));
    registry.register("totalliabilities", balance(Measure::BookValue, Some(Side::Liability)));
    registry.register("totalequity", balance(Measure::BookValue, Some(Side::Equity)));
    registry.register("totalnominal", balance(Measure::Nominal, None));
    registry.register("totalaccruedinterest", balance(Measure::AccruedInterest, None));

    // Income is recognised on an accrual basis: coupons paid plus the change in accrued interest
    registry.register(
        "interestincome",
        Arc::new(FlowAggregation::income(&[FlowColumn::Interest, FlowColumn::Accrual])),
    );
    registry.register("scheduledprincipal", Arc::new(FlowAggregation::new(FlowColumn::ScheduledPrincipal)));
    registry.register("prepayments", Arc::new(FlowAggregation::new(FlowColumn::Prepayment)));
    registry.register(
        "premiumamortization",
        Arc::new(FlowAggregation::income(&[FlowColumn::PremiumAmortization])),
    );
    registry.register("valuationincome", Arc::new(FlowAggregation::income(&[FlowColumn::ValuationIncome])));
    registry.register("oci", Arc::new(FlowAggregation::income(&[FlowColumn::Oci])));
    registry.register(
        "netincome",
        Arc::new(FlowAggregation::income(&[
            FlowColumn::Interest,
            FlowColumn::Accrual,
            FlowColumn::PremiumAmortization,
            FlowColumn::ValuationIncome,
        ])),
    );
}
