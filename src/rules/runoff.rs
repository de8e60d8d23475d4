//! Principal runoff, prepayment, coupon interest and accrual for one period

use chrono::NaiveDate;
use rayon::prelude::*;

use super::coupon::CouponType;
use super::redemption::{check_prepayment_rate, event_flow, RedemptionMethod};
use super::{Dispatch, PeriodState, Rule, RuleContext};
use crate::balance_sheet::{BalanceSheet, KeyColumn, RunoffColumns};
use crate::calendar::Frequency;
use crate::error::{ProjectionError, Result};
use crate::registry::clean_identifier;

/// Redemption rule: scheduled repayments, prepayments and coupons in `(t0, t1]`
///
/// The coupon rate is set at `t0` and applies to every event of the period.
/// Interest accrued since the last coupon date is carried on the sheet and
/// its change over the period is recorded as the accrual flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runoff;

/// Outcome for one row
#[derive(Debug, Clone, Copy, PartialEq)]
struct RowRunoff {
    interest: f64,
    accrual: f64,
    scheduled_principal: f64,
    prepayment: f64,
    ending_nominal: f64,
    interest_rate: f64,
    accrued_interest: f64,
    next_coupon_date: Option<NaiveDate>,
    coupon_index: u32,
}

/// Contractual inputs of one row
struct RowTerms<'a> {
    id: &'a str,
    nominal: f64,
    /// Coupon rate in force over the period
    rate: f64,
    accrued_interest: f64,
    prepayment_rate: f64,
    /// Where `prepayment_rate` came from, for error reporting
    prepayment_source: &'a str,
    origination: NaiveDate,
    maturity: NaiveDate,
    next_coupon_date: Option<NaiveDate>,
    anchor: Option<NaiveDate>,
    coupon_index: u32,
}

impl Rule for Runoff {
    fn name(&self) -> &str {
        "runoff"
    }

    fn apply(&self, opening: &BalanceSheet, state: PeriodState, context: &RuleContext<'_>) -> Result<PeriodState> {
        let registries = context.registries;
        let redemption = Dispatch::resolve(opening, KeyColumn::Redemption, &registries.redemption)?;
        let frequency = Dispatch::resolve(opening, KeyColumn::Frequency, &registries.frequency)?;
        let coupon_type = Dispatch::resolve(opening, KeyColumn::CouponType, &registries.coupon_type)?;

        // Scenario prepayment overrides, one lookup per redemption group
        let mut override_of_row: Vec<Option<(String, f64)>> = vec![None; opening.len()];
        for group in opening.groups(KeyColumn::Redemption) {
            if let Some(rate) = context.scenario.prepayment_rate(&group.key) {
                let parameter = format!("prepayment_rate.{}", clean_identifier(&group.key));
                for &row in &group.rows {
                    override_of_row[row] = Some((parameter.clone(), rate));
                }
            }
        }

        let (t0, t1) = (context.period.start, context.period.end);
        let current = &state.balance_sheet;
        let rows: Vec<RowRunoff> = (0..opening.len())
            .into_par_iter()
            .map(|row| {
                let nominal = current.nominal()[row];
                let maturity = opening.maturity_date()[row];
                let frequency = frequency.get(row);
                let rate = coupon_rate(
                    coupon_type.get(row),
                    opening,
                    row,
                    frequency,
                    nominal > 0.0 && t0 < maturity,
                    context,
                )?;
                let (prepayment_source, prepayment_rate) = match &override_of_row[row] {
                    Some((parameter, rate)) => (parameter.as_str(), *rate),
                    None => ("prepayment_rate", opening.prepayment_rate()[row]),
                };
                let terms = RowTerms {
                    id: opening.id(row),
                    nominal,
                    rate,
                    accrued_interest: current.accrued_interest()[row],
                    prepayment_rate,
                    prepayment_source,
                    origination: opening.origination_date()[row],
                    maturity,
                    next_coupon_date: current.next_coupon_date()[row],
                    anchor: opening.coupon_anchor(row),
                    coupon_index: current.coupon_index()[row],
                };
                run_off_row(&terms, redemption.get(row), frequency, t0, t1)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut flows = state.flows;
        let mut columns = RunoffColumns::with_capacity(rows.len());
        for (row, outcome) in rows.into_iter().enumerate() {
            flows.interest[row] += outcome.interest;
            flows.accrual[row] += outcome.accrual;
            flows.scheduled_principal[row] += outcome.scheduled_principal;
            flows.prepayment[row] += outcome.prepayment;
            flows.ending_nominal[row] = outcome.ending_nominal;
            columns.nominal.push(outcome.ending_nominal);
            columns.interest_rate.push(outcome.interest_rate);
            columns.accrued_interest.push(outcome.accrued_interest);
            columns.next_coupon_date.push(outcome.next_coupon_date);
            columns.coupon_index.push(outcome.coupon_index);
        }

        let balance_sheet = state.balance_sheet.with_runoff(t1, columns);
        Ok(PeriodState { balance_sheet, flows })
    }
}

/// Rate in force from the period start; floating rows fix off their curve at `t0`
fn coupon_rate(
    coupon_type: &dyn CouponType,
    opening: &BalanceSheet,
    row: usize,
    frequency: &Frequency,
    live: bool,
    context: &RuleContext<'_>,
) -> Result<f64> {
    let current_rate = opening.interest_rate()[row];
    let reference = if live && coupon_type.needs_reference() {
        let t0 = context.period.start;
        let curve = context.scenario.curve(opening.curve(row), t0)?;
        Some(curve.zero_rate(frequency.reset_tenor(t0, opening.maturity_date()[row])))
    } else {
        None
    };
    Ok(coupon_type.coupon_rate(current_rate, opening.spread()[row], reference))
}

fn run_off_row(
    terms: &RowTerms<'_>,
    method: &dyn RedemptionMethod,
    frequency: &Frequency,
    t0: NaiveDate,
    t1: NaiveDate,
) -> Result<RowRunoff> {
    if terms.nominal < 0.0 {
        return Err(ProjectionError::NegativeBalanceViolation {
            item: terms.id.to_string(),
            period_end: t1,
            nominal: terms.nominal,
        });
    }
    let inconsistent = |reason: String| ProjectionError::InconsistentSchedule {
        item: terms.id.to_string(),
        reason,
    };
    if terms.origination > t0 {
        return Err(inconsistent(format!(
            "originated {} after the period start {}",
            terms.origination, t0
        )));
    }
    let prepayment_rate = check_prepayment_rate(terms.id, terms.prepayment_source, terms.prepayment_rate)?;

    let matured = RowRunoff {
        interest: 0.0,
        accrual: -terms.accrued_interest,
        scheduled_principal: 0.0,
        prepayment: 0.0,
        ending_nominal: terms.nominal,
        interest_rate: terms.rate,
        accrued_interest: 0.0,
        next_coupon_date: None,
        coupon_index: terms.coupon_index,
    };
    if terms.nominal == 0.0 || t0 >= terms.maturity {
        return Ok(matured);
    }

    let (anchor, next_coupon_date) = match (terms.anchor, terms.next_coupon_date) {
        (Some(anchor), Some(date)) => (anchor, date),
        _ => return Err(inconsistent(format!("live at {} without a next coupon date", t0))),
    };
    if next_coupon_date < t0 || next_coupon_date > terms.maturity {
        return Err(inconsistent(format!(
            "next coupon date {} outside [{}, {}]",
            next_coupon_date, t0, terms.maturity
        )));
    }

    let schedule = frequency.schedule(anchor, terms.maturity);
    let end = t1.min(terms.maturity);
    let events = schedule.due_in(terms.coupon_index, t0, end);

    let mut balance = terms.nominal;
    let mut interest = 0.0;
    let mut scheduled_principal = 0.0;
    let mut repaid_at_maturity = false;
    if let Some((first, _)) = events.first() {
        let mut remaining = schedule.remaining_from(*first);
        for (index, date) in events {
            let at_maturity = date >= terms.maturity;
            let fraction = frequency.portion_year(schedule.accrual_start(index, terms.origination), date);
            let flow = event_flow(method, balance, terms.rate, fraction, remaining, at_maturity);
            interest += flow.interest;
            scheduled_principal += flow.principal;
            balance -= flow.principal;
            repaid_at_maturity |= at_maturity;
            remaining = remaining.saturating_sub(1);
        }
    }
    if end >= terms.maturity && !repaid_at_maturity {
        scheduled_principal += balance;
        balance = 0.0;
    }

    // The fraction lies in [0, 1] for a rate in [0, 1], so the balance stays non-negative
    let prepayment = if balance > 0.0 {
        balance * method.prepayment_fraction(prepayment_rate, frequency.portion_year(t0, end))
    } else {
        0.0
    };
    balance -= prepayment;

    let coupon_index = schedule.index_on_or_after(terms.coupon_index, t1);
    let next_coupon_date = if balance == 0.0 || t1 >= terms.maturity {
        None
    } else {
        Some(schedule.date(coupon_index))
    };

    // Interest earned since the last settled coupon date, unpaid at t1
    let accrued_interest = match next_coupon_date {
        Some(date) if date > t1 => {
            let start = schedule.accrual_start(coupon_index, terms.origination);
            if start < t1 {
                balance * terms.rate * frequency.portion_year(start, t1)
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    Ok(RowRunoff {
        interest,
        accrual: accrued_interest - terms.accrued_interest,
        scheduled_principal,
        prepayment,
        ending_nominal: balance,
        interest_rate: terms.rate,
        accrued_interest,
        next_coupon_date,
        coupon_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance_sheet::BalanceSheetItem;
    use crate::calendar::{Period, TimeHorizon};
    use crate::market::{MarketData, Scenario, ZeroCurve};
    use crate::registry::Registries;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn linear_loan() -> BalanceSheetItem {
        BalanceSheetItem::new(
            "L1",
            "linear",
            "quarterly",
            1000.0,
            0.04,
            d(2024, 12, 31),
            d(2026, 12, 31),
            Some(d(2024, 12, 31)),
        )
    }

    fn step(sheet: &BalanceSheet, period: Period, scenario: &Scenario, registries: &Registries) -> Result<PeriodState> {
        let context = RuleContext {
            period,
            scenario,
            registries,
        };
        Runoff.apply(sheet, PeriodState::open(sheet, period), &context)
    }

    #[test]
    fn test_first_quarter_of_linear_loan() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![linear_loan()]).unwrap();
        let state = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &scenario, &registries).unwrap();

        assert_abs_diff_eq!(state.flows.scheduled_principal[0], 125.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.flows.interest[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.flows.ending_nominal[0], 875.0, epsilon = 1e-9);
        assert_eq!(state.balance_sheet.nominal()[0], state.flows.ending_nominal[0]);
        assert_eq!(state.balance_sheet.next_coupon_date()[0], Some(d(2025, 3, 31)));
        assert_eq!(state.balance_sheet.as_of(), d(2025, 3, 31));
        // Coupon paid on the period end leaves nothing accrued
        assert_eq!(state.balance_sheet.accrued_interest()[0], 0.0);
        assert_eq!(state.flows.accrual[0], 0.0);
        assert_eq!(state.balance_sheet.interest_rate()[0], 0.04);
        // Opening sheet is untouched
        assert_eq!(sheet.nominal()[0], 1000.0);
    }

    #[test]
    fn test_linear_loan_runs_off_in_eight_quarters() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let mut sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![linear_loan()]).unwrap();
        let horizon = TimeHorizon::every_months(d(2024, 12, 31), 3, 8).unwrap();
        for (n, period) in horizon.periods().enumerate() {
            let state = step(&sheet, period, &scenario, &registries).unwrap();
            let flows = &state.flows;
            assert!(flows.ending_nominal[0] >= 0.0);
            assert_abs_diff_eq!(
                flows.beginning_nominal[0],
                flows.ending_nominal[0] + flows.scheduled_principal[0],
                epsilon = 1e-9
            );
            assert_abs_diff_eq!(flows.scheduled_principal[0], 125.0, epsilon = 1e-9);
            sheet = state.balance_sheet;
            sheet.validate().unwrap();
            if n < 7 {
                assert!(sheet.next_coupon_date()[0].is_some());
            }
        }
        assert_abs_diff_eq!(sheet.nominal()[0], 0.0, epsilon = 1e-9);
        assert_eq!(sheet.next_coupon_date()[0], None);
    }

    #[test]
    fn test_monthly_periods_on_quarterly_coupons() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![linear_loan()]).unwrap();

        let january = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 1, 31)).unwrap(), &scenario, &registries).unwrap();
        assert_eq!(january.flows.interest[0], 0.0);
        assert_eq!(january.flows.scheduled_principal[0], 0.0);
        assert_eq!(january.balance_sheet.next_coupon_date()[0], Some(d(2025, 3, 31)));

        let february = step(
            &january.balance_sheet,
            Period::new(d(2025, 1, 31), d(2025, 2, 28)).unwrap(),
            &scenario,
            &registries,
        )
        .unwrap();
        let march = step(
            &february.balance_sheet,
            Period::new(d(2025, 2, 28), d(2025, 3, 31)).unwrap(),
            &scenario,
            &registries,
        )
        .unwrap();
        assert_abs_diff_eq!(march.flows.interest[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(march.flows.scheduled_principal[0], 125.0, epsilon = 1e-9);
    }

    #[test]
    fn test_interest_accrues_between_coupon_dates() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![linear_loan()]).unwrap();

        let january = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 1, 31)).unwrap(), &scenario, &registries).unwrap();
        let accrued_january = 1000.0 * 0.04 * 30.0 / 360.0;
        assert_abs_diff_eq!(january.balance_sheet.accrued_interest()[0], accrued_january, epsilon = 1e-9);
        assert_abs_diff_eq!(january.flows.accrual[0], accrued_january, epsilon = 1e-9);

        let february = step(
            &january.balance_sheet,
            Period::new(d(2025, 1, 31), d(2025, 2, 28)).unwrap(),
            &scenario,
            &registries,
        )
        .unwrap();
        let accrued_february = 1000.0 * 0.04 * 58.0 / 360.0;
        assert_abs_diff_eq!(february.balance_sheet.accrued_interest()[0], accrued_february, epsilon = 1e-9);
        assert_abs_diff_eq!(february.flows.accrual[0], accrued_february - accrued_january, epsilon = 1e-9);

        let march = step(
            &february.balance_sheet,
            Period::new(d(2025, 2, 28), d(2025, 3, 31)).unwrap(),
            &scenario,
            &registries,
        )
        .unwrap();
        assert_eq!(march.balance_sheet.accrued_interest()[0], 0.0);
        assert_abs_diff_eq!(march.flows.accrual[0], -accrued_february, epsilon = 1e-9);

        // Over a full coupon period the accrual basis income equals the coupon
        let earned: f64 = [&january, &february, &march]
            .iter()
            .map(|state| state.flows.interest[0] + state.flows.accrual[0])
            .sum();
        assert_abs_diff_eq!(earned, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_floating_coupon_follows_curve_plus_spread() {
        let registries = Registries::standard();
        let market = MarketData::new()
            .with_curve("EURIBOR", d(2024, 12, 31), ZeroCurve::flat(0.02))
            .with_curve("EURIBOR", d(2025, 3, 31), ZeroCurve::flat(0.03));
        let scenario = Scenario::new("base").with_market(market);
        let item = linear_loan().with_floating_coupon("EURIBOR", 0.005);
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![item]).unwrap();

        let first = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &scenario, &registries).unwrap();
        assert_abs_diff_eq!(first.balance_sheet.interest_rate()[0], 0.025, epsilon = 1e-12);
        assert_abs_diff_eq!(first.flows.interest[0], 1000.0 * 0.025 * 0.25, epsilon = 1e-9);

        let second = step(
            &first.balance_sheet,
            Period::new(d(2025, 3, 31), d(2025, 6, 30)).unwrap(),
            &scenario,
            &registries,
        )
        .unwrap();
        assert_abs_diff_eq!(second.balance_sheet.interest_rate()[0], 0.035, epsilon = 1e-12);
        assert_abs_diff_eq!(second.flows.interest[0], 875.0 * 0.035 * 0.25, epsilon = 1e-9);

        let missing = Scenario::new("bare");
        let result = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &missing, &registries);
        assert!(matches!(result, Err(ProjectionError::CurveResolutionError { .. })));
    }

    #[test]
    fn test_zero_coupon_pays_no_interest() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let item = linear_loan().with_coupon_type("zero");
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![item]).unwrap();
        let state = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 2, 28)).unwrap(), &scenario, &registries).unwrap();
        assert_eq!(state.flows.interest[0], 0.0);
        assert_eq!(state.flows.accrual[0], 0.0);
        assert_eq!(state.balance_sheet.interest_rate()[0], 0.0);
        assert_eq!(state.balance_sheet.accrued_interest()[0], 0.0);
    }

    #[test]
    fn test_out_of_range_prepayment_override_fails() {
        let registries = Registries::standard();
        let stress = Scenario::new("stress").with_parameter("prepayment_rate.linear", 1.7);
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![linear_loan()]).unwrap();
        let result = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &stress, &registries);
        match result {
            Err(ProjectionError::InvalidRate { item, parameter, value }) => {
                assert_eq!(item, "L1");
                assert_eq!(parameter, "prepayment_rate.linear");
                assert_eq!(value, 1.7);
            }
            other => panic!("expected InvalidRate, got {:?}", other.map(|_| ())),
        }

        let negative = Scenario::new("negative").with_parameter("prepayment_rate.linear", -0.5);
        let result = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &negative, &registries);
        assert!(matches!(result, Err(ProjectionError::InvalidRate { .. })));
    }

    #[test]
    fn test_item_originating_after_period_start_fails() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let mut item = linear_loan();
        item.origination_date = d(2025, 2, 15);
        item.next_coupon_date = Some(d(2025, 5, 15));
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![item]).unwrap();
        let result = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &scenario, &registries);
        match result {
            Err(ProjectionError::InconsistentSchedule { item, reason }) => {
                assert_eq!(item, "L1");
                assert!(reason.contains("2025-02-15"));
            }
            other => panic!("expected InconsistentSchedule, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_maturity_between_steps_is_clamped() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let item = BalanceSheetItem::new(
            "B1",
            "bullet",
            "quarterly",
            500.0,
            0.02,
            d(2024, 12, 31),
            d(2025, 5, 15),
            Some(d(2024, 12, 31)),
        );
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![item]).unwrap();
        let state = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &scenario, &registries).unwrap();
        assert_eq!(state.balance_sheet.next_coupon_date()[0], Some(d(2025, 3, 31)));

        let april = step(
            &state.balance_sheet,
            Period::new(d(2025, 3, 31), d(2025, 4, 30)).unwrap(),
            &scenario,
            &registries,
        )
        .unwrap();
        assert_eq!(april.balance_sheet.next_coupon_date()[0], Some(d(2025, 5, 15)));
        assert_eq!(april.flows.scheduled_principal[0], 0.0);

        let may = step(
            &april.balance_sheet,
            Period::new(d(2025, 4, 30), d(2025, 5, 31)).unwrap(),
            &scenario,
            &registries,
        )
        .unwrap();
        assert_abs_diff_eq!(may.flows.scheduled_principal[0], 500.0, epsilon = 1e-9);
        assert_eq!(may.balance_sheet.nominal()[0], 0.0);
        assert_eq!(may.balance_sheet.next_coupon_date()[0], None);
    }

    #[test]
    fn test_maturity_on_period_boundary() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let item = BalanceSheetItem::new(
            "D1",
            "bullet",
            "never",
            800.0,
            0.01,
            d(2024, 3, 31),
            d(2025, 3, 31),
            Some(d(2025, 3, 31)),
        )
        .with_metric_group("deposits");
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![item]).unwrap();
        let state = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &scenario, &registries).unwrap();
        assert_abs_diff_eq!(state.flows.scheduled_principal[0], 800.0, epsilon = 1e-9);
        // One coupon over the whole life, accrued from origination
        assert_abs_diff_eq!(state.flows.interest[0], 800.0 * 0.01 * 365.0 / 365.25, epsilon = 1e-9);
        assert_eq!(state.balance_sheet.next_coupon_date()[0], None);

        // Next period produces nothing
        let after = step(
            &state.balance_sheet,
            Period::new(d(2025, 3, 31), d(2025, 6, 30)).unwrap(),
            &scenario,
            &registries,
        )
        .unwrap();
        assert_eq!(after.flows.interest[0], 0.0);
        assert_eq!(after.flows.scheduled_principal[0], 0.0);
        assert_eq!(after.balance_sheet.next_coupon_date()[0], None);
    }

    #[test]
    fn test_zero_nominal_and_negative_rate() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let mut empty = linear_loan();
        empty.id = "Z".to_string();
        empty.nominal = 0.0;
        empty.next_coupon_date = None;
        let mut negative = linear_loan();
        negative.id = "N".to_string();
        negative.interest_rate = -0.01;
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![empty, negative]).unwrap();
        let state = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &scenario, &registries).unwrap();

        assert_eq!(state.flows.interest[0], 0.0);
        assert_eq!(state.flows.ending_nominal[0], 0.0);
        assert_eq!(state.balance_sheet.next_coupon_date()[0], None);
        assert_abs_diff_eq!(state.flows.interest[1], -2.5, epsilon = 1e-9);
        assert_abs_diff_eq!(state.flows.ending_nominal[1], 875.0, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_nominal_fails() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let mut item = linear_loan();
        item.nominal = -10.0;
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![item]).unwrap();
        let result = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &scenario, &registries);
        match result {
            Err(ProjectionError::NegativeBalanceViolation { item, period_end, .. }) => {
                assert_eq!(item, "L1");
                assert_eq!(period_end, d(2025, 3, 31));
            }
            other => panic!("expected NegativeBalanceViolation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_prepayment_override_caps_at_balance() {
        let registries = Registries::standard();
        let base = Scenario::new("base");
        let stress = Scenario::new("stress").with_parameter("prepayment_rate.linear", 1.0);
        let item = linear_loan().with_prepayment_rate(0.1);
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![item]).unwrap();
        let period = Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap();

        let state = step(&sheet, period, &base, &registries).unwrap();
        let fraction = 1.0 - 0.9f64.powf(0.25);
        assert_abs_diff_eq!(state.flows.prepayment[0], 875.0 * fraction, epsilon = 1e-9);
        assert_abs_diff_eq!(state.flows.ending_nominal[0], 875.0 * (1.0 - fraction), epsilon = 1e-9);

        let state = step(&sheet, period, &stress, &registries).unwrap();
        assert_abs_diff_eq!(state.flows.prepayment[0], 875.0, epsilon = 1e-9);
        assert_eq!(state.balance_sheet.nominal()[0], 0.0);
        assert_eq!(state.balance_sheet.next_coupon_date()[0], None);
    }

    #[test]
    fn test_unknown_redemption_key() {
        let registries = Registries::standard();
        let scenario = Scenario::new("base");
        let mut item = linear_loan();
        item.redemption = "balloon".to_string();
        let sheet = BalanceSheet::from_items(d(2024, 12, 31), vec![item]).unwrap();
        let result = step(&sheet, Period::new(d(2024, 12, 31), d(2025, 3, 31)).unwrap(), &scenario, &registries);
        assert!(matches!(result, Err(ProjectionError::UnknownRegistryKey { .. })));
    }
}
