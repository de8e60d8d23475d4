//! Redemption handlers: how principal is repaid over the coupon schedule

use std::sync::Arc;

use chrono::NaiveDate;

use crate::calendar::CouponSchedule;
use crate::error::{ProjectionError, Result};
use crate::registry::Registry;

/// Amortization contract bound to a redemption key
pub trait RedemptionMethod: Send + Sync {
    /// Fraction of the outstanding balance repaid at a scheduled event before maturity
    ///
    /// `remaining_events` counts the events left up to maturity including this
    /// one; `period_rate` is the interest rate for the event's accrual period.
    fn principal_factor(&self, remaining_events: u32, period_rate: f64) -> f64;

    /// Fraction of the balance prepaid over `year_fraction` at an annual prepayment rate
    fn prepayment_fraction(&self, annual_rate: f64, year_fraction: f64) -> f64 {
        constant_prepayment(annual_rate, year_fraction)
    }
}

/// Constant prepayment rate scaled to a fraction of a year
///
/// `annual_rate` must lie in `[0, 1]`; see [`check_prepayment_rate`].
pub fn constant_prepayment(annual_rate: f64, year_fraction: f64) -> f64 {
    if year_fraction <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - annual_rate).powf(year_fraction)
}

/// Accept an annual prepayment rate only when it is a fraction in `[0, 1]`
pub(crate) fn check_prepayment_rate(item: &str, parameter: &str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ProjectionError::InvalidRate {
            item: item.to_string(),
            parameter: parameter.to_string(),
            value,
        })
    }
}

/// Entire principal at maturity
#[derive(Debug, Clone, Copy, Default)]
pub struct Bullet;

impl RedemptionMethod for Bullet {
    fn principal_factor(&self, _remaining_events: u32, _period_rate: f64) -> f64 {
        0.0
    }
}

/// Equal principal at every event
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl RedemptionMethod for Linear {
    fn principal_factor(&self, remaining_events: u32, _period_rate: f64) -> f64 {
        1.0 / remaining_events.max(1) as f64
    }
}

/// Level installment of interest plus principal
#[derive(Debug, Clone, Copy, Default)]
pub struct Annuity;

impl RedemptionMethod for Annuity {
    fn principal_factor(&self, remaining_events: u32, period_rate: f64) -> f64 {
        let n = remaining_events.max(1) as i32;
        let growth = (1.0 + period_rate).powi(n) - 1.0;
        if period_rate == 0.0 || growth.abs() < 1e-14 {
            return 1.0 / n as f64;
        }
        period_rate / growth
    }
}

/// No scheduled repayment; only prepayments reduce the balance
#[derive(Debug, Clone, Copy, Default)]
pub struct Perpetual;

impl RedemptionMethod for Perpetual {
    fn principal_factor(&self, _remaining_events: u32, _period_rate: f64) -> f64 {
        0.0
    }
}

/// Off-balance notional: repaid at maturity, never prepaid
#[derive(Debug, Clone, Copy, Default)]
pub struct Notional;

impl RedemptionMethod for Notional {
    fn principal_factor(&self, _remaining_events: u32, _period_rate: f64) -> f64 {
        0.0
    }

    fn prepayment_fraction(&self, _annual_rate: f64, _year_fraction: f64) -> f64 {
        0.0
    }
}

pub(crate) fn register_defaults(registry: &mut Registry<dyn RedemptionMethod>) {
    let linear: Arc<dyn RedemptionMethod> = Arc::new(Linear);
    registry.register("bullet", Arc::new(Bullet));
    registry.register("linear", Arc::clone(&linear));
    registry.register("straightline", linear);
    registry.register("annuity", Arc::new(Annuity));
    registry.register("perpetual", Arc::new(Perpetual));
    registry.register("notional", Arc::new(Notional));
}

/// Interest and scheduled principal of one coupon event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventFlow {
    pub interest: f64,
    pub principal: f64,
}

/// Flows of a single event on an outstanding `balance`
///
/// The maturity event always repays the whole balance; otherwise principal is
/// floored at zero and capped at the balance.
pub fn event_flow(
    method: &dyn RedemptionMethod,
    balance: f64,
    rate: f64,
    year_fraction: f64,
    remaining_events: u32,
    at_maturity: bool,
) -> EventFlow {
    let period_rate = rate * year_fraction;
    let interest = balance * period_rate;
    let principal = if at_maturity {
        balance
    } else {
        (balance * method.principal_factor(remaining_events, period_rate)).clamp(0.0, balance)
    };
    EventFlow { interest, principal }
}

/// Remaining contractual payments (interest plus principal) after `as_of`, without prepayment
pub fn contractual_cash_flows(
    method: &dyn RedemptionMethod,
    schedule: &CouponSchedule<'_>,
    from_index: u32,
    as_of: NaiveDate,
    origination: NaiveDate,
    balance: f64,
    rate: f64,
) -> Vec<(NaiveDate, f64)> {
    let maturity = schedule.maturity();
    let events = schedule.due_in(from_index, as_of, maturity);
    let mut remaining = match events.first() {
        Some((index, _)) => schedule.remaining_from(*index),
        None => return Vec::new(),
    };

    let mut outstanding = balance;
    let mut payments = Vec::with_capacity(events.len());
    for (index, date) in events {
        if outstanding <= 0.0 {
            break;
        }
        let fraction = schedule
            .frequency()
            .portion_year(schedule.accrual_start(index, origination), date);
        let flow = event_flow(method, outstanding, rate, fraction, remaining, date >= maturity);
        outstanding -= flow.principal;
        payments.push((date, flow.interest + flow.principal));
        remaining = remaining.saturating_sub(1);
    }
    payments
}
