//! Accounting methods: how book value and income react to valuation

use std::sync::Arc;

use chrono::NaiveDate;

use crate::calendar::date::days_between;
use crate::error::{ProjectionError, Result};
use crate::registry::Registry;

/// Row values an accounting method decides on at the end of a period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountingInput<'a> {
    pub id: &'a str,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub maturity: NaiveDate,
    pub opening_nominal: f64,
    pub opening_book_value: f64,
    pub ending_nominal: f64,
    /// Scheduled plus prepaid principal of the period
    pub principal_repaid: f64,
    pub market_value: Option<f64>,
}

/// New book value and where its change is recognised
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountingOutcome {
    pub book_value: f64,
    pub premium_amortization: f64,
    pub valuation_income: f64,
    pub oci: f64,
}

/// Accounting contract bound to an accounting-method key
pub trait AccountingMethod: Send + Sync {
    fn name(&self) -> &str;

    fn revalue(&self, input: &AccountingInput<'_>) -> Result<AccountingOutcome>;
}

/// Book value follows nominal; premium or discount is amortised linearly to maturity
#[derive(Debug, Clone, Copy, Default)]
pub struct AmortizedCost;

impl AccountingMethod for AmortizedCost {
    fn name(&self) -> &str {
        "amortized cost"
    }

    fn revalue(&self, input: &AccountingInput<'_>) -> Result<AccountingOutcome> {
        let opening_premium = input.opening_book_value - input.opening_nominal;
        let days_left = days_between(input.period_start, input.maturity);
        let ending_premium = if input.ending_nominal == 0.0 || input.period_end >= input.maturity || days_left <= 0 {
            0.0
        } else {
            opening_premium * days_between(input.period_end, input.maturity) as f64 / days_left as f64
        };
        Ok(AccountingOutcome {
            book_value: input.ending_nominal + ending_premium,
            premium_amortization: ending_premium - opening_premium,
            valuation_income: 0.0,
            oci: 0.0,
        })
    }
}

/// Where fair value changes are recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairValueChannel {
    ProfitOrLoss,
    OtherComprehensiveIncome,
}

/// Book value snapped to market value
#[derive(Debug, Clone, Copy)]
pub struct FairValue {
    pub channel: FairValueChannel,
}

impl AccountingMethod for FairValue {
    fn name(&self) -> &str {
        match self.channel {
            FairValueChannel::ProfitOrLoss => "fvtpl",
            FairValueChannel::OtherComprehensiveIncome => "fvoci",
        }
    }

    fn revalue(&self, input: &AccountingInput<'_>) -> Result<AccountingOutcome> {
        let market_value = input.market_value.ok_or_else(|| ProjectionError::MissingMarketValue {
            item: input.id.to_string(),
            method: self.name().to_string(),
        })?;
        let delta = market_value - (input.opening_book_value - input.principal_repaid);
        let mut outcome = AccountingOutcome {
            book_value: market_value,
            ..AccountingOutcome::default()
        };
        match self.channel {
            FairValueChannel::ProfitOrLoss => outcome.valuation_income = delta,
            FairValueChannel::OtherComprehensiveIncome => outcome.oci = delta,
        }
        Ok(outcome)
    }
}

pub(crate) fn register_defaults(registry: &mut Registry<dyn AccountingMethod>) {
    registry.register("amortizedcost", Arc::new(AmortizedCost));
    registry.register(
        "fvtpl",
        Arc::new(FairValue {
            channel: FairValueChannel::ProfitOrLoss,
        }),
    );
    registry.register(
        "fvoci",
        Arc::new(FairValue {
            channel: FairValueChannel::OtherComprehensiveIncome,
        }),
    );
}
