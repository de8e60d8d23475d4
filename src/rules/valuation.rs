//! Valuation handlers: market value of a row on a scenario curve

use std::sync::Arc;

use chrono::NaiveDate;

use super::redemption::{contractual_cash_flows, RedemptionMethod};
use crate::calendar::{CouponSchedule, DayCount};
use crate::error::{ProjectionError, Result};
use crate::market::ZeroCurve;
use crate::registry::Registry;

/// Everything a valuation handler may look at for one row
pub struct ValuationInput<'a> {
    pub id: &'a str,
    pub as_of: NaiveDate,
    pub nominal: f64,
    pub rate: f64,
    pub origination: NaiveDate,
    pub maturity: NaiveDate,
    /// Remaining coupon schedule; `None` once the row has matured
    pub schedule: Option<CouponSchedule<'a>>,
    pub coupon_index: u32,
    pub redemption: &'a dyn RedemptionMethod,
}

/// Market value contract bound to a valuation key
pub trait ValuationMethod: Send + Sync {
    /// Whether the handler needs the row's scenario curve
    fn needs_curve(&self) -> bool {
        false
    }

    /// Market value as of `input.as_of`, or `None` when the method produces none
    fn market_value(&self, input: &ValuationInput<'_>, curve: Option<&ZeroCurve>) -> Result<Option<f64>>;
}

/// No market value
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValuation;

impl ValuationMethod for NoValuation {
    fn market_value(&self, _input: &ValuationInput<'_>, _curve: Option<&ZeroCurve>) -> Result<Option<f64>> {
        Ok(None)
    }
}

/// Market value equal to nominal
#[derive(Debug, Clone, Copy, Default)]
pub struct Par;

impl ValuationMethod for Par {
    fn market_value(&self, input: &ValuationInput<'_>, _curve: Option<&ZeroCurve>) -> Result<Option<f64>> {
        Ok(Some(input.nominal))
    }
}

/// Present value of the remaining contractual cash flows
///
/// Continuous compounding on the curve's zero rates, time in Act/365.25 years.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discounted;

impl ValuationMethod for Discounted {
    fn needs_curve(&self) -> bool {
        true
    }

    fn market_value(&self, input: &ValuationInput<'_>, curve: Option<&ZeroCurve>) -> Result<Option<f64>> {
        if input.nominal == 0.0 || input.as_of >= input.maturity {
            return Ok(Some(0.0));
        }
        let curve = curve.ok_or_else(|| {
            ProjectionError::InvalidInput(format!("discounted valuation of '{}' called without a curve", input.id))
        })?;
        let schedule = input.schedule.as_ref().ok_or_else(|| ProjectionError::InconsistentSchedule {
            item: input.id.to_string(),
            reason: "live item without a coupon schedule".to_string(),
        })?;

        let payments = contractual_cash_flows(
            input.redemption,
            schedule,
            input.coupon_index,
            input.as_of,
            input.origination,
            input.nominal,
            input.rate,
        );
        let value = payments
            .iter()
            .map(|(date, amount)| {
                let t = DayCount::Actual36525.year_fraction(input.as_of, *date);
                amount * curve.discount_factor(t)
            })
            .sum();
        Ok(Some(value))
    }
}

pub(crate) fn register_defaults(registry: &mut Registry<dyn ValuationMethod>) {
    registry.register("none", Arc::new(NoValuation));
    registry.register("par", Arc::new(Par));
    registry.register("discounted", Arc::new(Discounted));
}
