//! Period rules and the handlers they dispatch to
//!
//! A rule turns the balance sheet at the start of a period into the balance
//! sheet at its end. Rows are grouped by classification key so each handler is
//! resolved once per group, then every row is evaluated independently.

pub mod accounting;
pub mod coupon;
mod flows;
pub mod redemption;
mod revaluation;
mod runoff;
pub mod valuation;

use std::sync::Arc;

use crate::balance_sheet::{BalanceSheet, KeyColumn};
use crate::calendar::Period;
use crate::error::Result;
use crate::market::Scenario;
use crate::registry::{Registries, Registry};

pub use accounting::{AccountingMethod, AccountingOutcome, AmortizedCost, FairValue, FairValueChannel};
pub use coupon::CouponType;
pub use flows::{FlowColumn, PeriodFlows};
pub use redemption::RedemptionMethod;
pub use revaluation::Revaluation;
pub use runoff::Runoff;
pub use valuation::{ValuationInput, ValuationMethod};

/// Read-only inputs shared by every rule of one period
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub period: Period,
    pub scenario: &'a Scenario,
    pub registries: &'a Registries,
}

/// Work in progress of one period transition
#[derive(Debug, Clone)]
pub struct PeriodState {
    /// Sheet dated at the period end, updated by each rule in turn
    pub balance_sheet: BalanceSheet,
    pub flows: PeriodFlows,
}

impl PeriodState {
    /// Starting point for a period: opening balances carried to the period end
    pub fn open(opening: &BalanceSheet, period: Period) -> Self {
        Self {
            balance_sheet: opening.at(period.end),
            flows: PeriodFlows::unchanged(opening.nominal()),
        }
    }
}

/// One step of a period transition
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    /// Apply the rule; `opening` is the sheet at the period start
    fn apply(&self, opening: &BalanceSheet, state: PeriodState, context: &RuleContext<'_>) -> Result<PeriodState>;
}

/// The rules applied when none are configured: redemption, then revaluation
pub fn default_rules() -> Vec<Arc<dyn Rule>> {
    vec![Arc::new(Runoff), Arc::new(Revaluation)]
}

/// Handlers resolved once per key group, addressable by row
pub(crate) struct Dispatch<H: ?Sized> {
    handlers: Vec<Arc<H>>,
    row_group: Vec<usize>,
}

impl<H: ?Sized> Dispatch<H> {
    pub(crate) fn resolve(sheet: &BalanceSheet, column: KeyColumn, registry: &Registry<H>) -> Result<Self> {
        let groups = sheet.groups(column);
        let mut handlers = Vec::with_capacity(groups.len());
        let mut row_group = vec![0; sheet.len()];
        for (at, group) in groups.iter().enumerate() {
            handlers.push(registry.resolve(&group.key)?);
            for &row in &group.rows {
                row_group[row] = at;
            }
        }
        Ok(Self { handlers, row_group })
    }

    pub(crate) fn get(&self, row: usize) -> &H {
        &self.handlers[self.row_group[row]]
    }
}
