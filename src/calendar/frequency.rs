//! Payment frequencies and coupon date stepping

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::date::{add_days, add_months, is_end_of_month};
use super::daycount::DayCount;
use crate::registry::Registry;

/// Distance between two scheduled payment events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Periodicity {
    Months(u32),
    Days(u32),
    /// No intermediate payments; only the maturity event
    Never,
}

/// Immutable periodicity descriptor with its accrual day count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    pub periodicity: Periodicity,
    pub day_count: DayCount,
}

impl Frequency {
    pub fn months(months: u32) -> Self {
        Self {
            periodicity: Periodicity::Months(months.max(1)),
            day_count: DayCount::Thirty360European,
        }
    }

    pub fn days(days: u32) -> Self {
        Self {
            periodicity: Periodicity::Days(days.max(1)),
            day_count: DayCount::Actual36525,
        }
    }

    pub fn monthly() -> Self {
        Self::months(1)
    }

    pub fn quarterly() -> Self {
        Self::months(3)
    }

    pub fn semi_annual() -> Self {
        Self::months(6)
    }

    pub fn annual() -> Self {
        Self::months(12)
    }

    pub fn daily() -> Self {
        Self::days(1)
    }

    pub fn weekly() -> Self {
        Self::days(7)
    }

    pub fn never() -> Self {
        Self {
            periodicity: Periodicity::Never,
            day_count: DayCount::Actual36525,
        }
    }

    /// Same periodicity accrued under a different day count
    pub fn with_day_count(mut self, day_count: DayCount) -> Self {
        self.day_count = day_count;
        self
    }

    pub(crate) fn register_defaults(registry: &mut Registry<Frequency>) {
        registry.register("daily", Arc::new(Self::daily()));
        registry.register("weekly", Arc::new(Self::weekly()));
        registry.register("monthly", Arc::new(Self::monthly()));
        registry.register("quarterly", Arc::new(Self::quarterly()));
        registry.register("semiannual", Arc::new(Self::semi_annual()));
        registry.register("annual", Arc::new(Self::annual()));
        registry.register("never", Arc::new(Self::never()));
    }

    /// The `n`-th scheduled date counted from `anchor` (negative `n` steps back)
    ///
    /// Month based schedules anchored on a month end stay on month ends.
    pub fn nth_date(&self, anchor: NaiveDate, n: i32) -> NaiveDate {
        match self.periodicity {
            Periodicity::Months(months) => add_months(anchor, n * months as i32, is_end_of_month(anchor)),
            Periodicity::Days(days) => add_days(anchor, n as i64 * days as i64),
            Periodicity::Never => anchor,
        }
    }

    /// Advance one payment date forward
    pub fn step_coupon_date(&self, date: NaiveDate) -> NaiveDate {
        self.nth_date(date, 1)
    }

    /// Move one payment date backward
    pub fn step_back(&self, date: NaiveDate) -> NaiveDate {
        self.nth_date(date, -1)
    }

    pub fn has_payments(&self) -> bool {
        !matches!(self.periodicity, Periodicity::Never)
    }

    /// Payment schedule rooted at `anchor` and ending at `maturity`
    pub fn schedule(&self, anchor: NaiveDate, maturity: NaiveDate) -> CouponSchedule<'_> {
        CouponSchedule {
            frequency: self,
            anchor,
            maturity,
        }
    }

    /// Number of scheduled payment events in `(start, end]` for a schedule rooted at `anchor`
    pub fn number_due(&self, anchor: NaiveDate, start: NaiveDate, end: NaiveDate, maturity: NaiveDate) -> u32 {
        self.schedule(anchor, maturity).number_due(0, start, end)
    }

    /// Year fraction of the interval under this frequency's day count
    pub fn portion_year(&self, start: NaiveDate, end: NaiveDate) -> f64 {
        self.day_count.year_fraction(start, end)
    }

    /// Tenor in years a floating coupon fixed on `start` refers to
    ///
    /// One payment period, or the time left to maturity for a `never` schedule.
    pub fn reset_tenor(&self, start: NaiveDate, maturity: NaiveDate) -> f64 {
        match self.periodicity {
            Periodicity::Months(months) => months as f64 / 12.0,
            Periodicity::Days(days) => days as f64 / 365.25,
            Periodicity::Never => self.portion_year(start, maturity).max(0.0),
        }
    }

    /// Smallest `n >= 0` with `nth_date(anchor, n) >= date`
    fn first_index_on_or_after(&self, anchor: NaiveDate, date: NaiveDate) -> u32 {
        let (elapsed, step) = match self.periodicity {
            Periodicity::Months(months) => {
                let elapsed = (date.year() - anchor.year()) as i64 * 12 + date.month() as i64 - anchor.month() as i64;
                (elapsed, months as i64)
            }
            Periodicity::Days(days) => ((date - anchor).num_days(), days as i64),
            Periodicity::Never => return 0,
        };
        if elapsed <= 0 && anchor >= date {
            return 0;
        }
        // Estimate from whole steps, then settle the month-end and day-of-month offsets
        let mut index = elapsed.max(0).div_euclid(step) as i32;
        while index > 0 && self.nth_date(anchor, index - 1) >= date {
            index -= 1;
        }
        while self.nth_date(anchor, index) < date {
            index += 1;
        }
        index as u32
    }
}

/// Coupon dates `anchor, step(anchor), ...` of one item, clamped to maturity
///
/// Dates are always computed from the anchor rather than from the previous
/// date, so a schedule on the 30th does not drift after February. A date on
/// the start of an interval counts as settled at that boundary. A `never`
/// schedule has a single event, at maturity.
#[derive(Debug, Clone, Copy)]
pub struct CouponSchedule<'a> {
    frequency: &'a Frequency,
    anchor: NaiveDate,
    maturity: NaiveDate,
}

impl CouponSchedule<'_> {
    /// The `index`-th scheduled date
    pub fn date(&self, index: u32) -> NaiveDate {
        if !self.frequency.has_payments() {
            return self.maturity;
        }
        self.frequency.nth_date(self.anchor, index as i32).min(self.maturity)
    }

    /// Accrual start of the event at `index`, floored at `origination`
    pub fn accrual_start(&self, index: u32, origination: NaiveDate) -> NaiveDate {
        if !self.frequency.has_payments() {
            return origination;
        }
        let previous = if index == 0 {
            self.frequency.step_back(self.anchor)
        } else {
            self.date(index - 1)
        };
        previous.max(origination)
    }

    /// `(index, date)` of the events from `from_index` on that fall in `(start, end]`
    pub fn due_in(&self, from_index: u32, start: NaiveDate, end: NaiveDate) -> Vec<(u32, NaiveDate)> {
        let mut events = Vec::new();
        self.walk(from_index, start, end, |index, date| events.push((index, date)));
        events
    }

    pub fn number_due(&self, from_index: u32, start: NaiveDate, end: NaiveDate) -> u32 {
        let mut count = 0;
        self.walk(from_index, start, end, |_, _| count += 1);
        count
    }

    /// Index of the first scheduled date on or after `date`, at least `from_index`
    pub fn index_on_or_after(&self, from_index: u32, date: NaiveDate) -> u32 {
        if !self.frequency.has_payments() {
            return from_index;
        }
        self.frequency
            .first_index_on_or_after(self.anchor, date)
            .min(self.last_index())
            .max(from_index)
    }

    /// Index of the maturity event
    pub fn last_index(&self) -> u32 {
        if !self.frequency.has_payments() {
            return 0;
        }
        self.frequency.first_index_on_or_after(self.anchor, self.maturity)
    }

    pub fn frequency(&self) -> &Frequency {
        self.frequency
    }

    pub fn maturity(&self) -> NaiveDate {
        self.maturity
    }

    /// Events left from `index` up to and including maturity
    pub fn remaining_from(&self, index: u32) -> u32 {
        if !self.frequency.has_payments() {
            return 1;
        }
        self.last_index().saturating_sub(index) + 1
    }

    fn walk<F: FnMut(u32, NaiveDate)>(&self, from_index: u32, start: NaiveDate, end: NaiveDate, mut visit: F) {
        let mut index = self.index_on_or_after(from_index, start);
        loop {
            let date = self.date(index);
            if date > end {
                break;
            }
            if date > start {
                visit(index, date);
            }
            if date >= self.maturity {
                break;
            }
            index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn far() -> NaiveDate {
        d(2060, 1, 1)
    }

    #[test]
    fn test_step_keeps_month_end() {
        let q = Frequency::quarterly();
        assert_eq!(q.step_coupon_date(d(2024, 12, 31)), d(2025, 3, 31));
        assert_eq!(q.step_coupon_date(d(2025, 3, 31)), d(2025, 6, 30));
        assert_eq!(q.nth_date(d(2025, 6, 30), 2), d(2025, 12, 31));
        assert_eq!(q.step_back(d(2025, 3, 31)), d(2024, 12, 31));
    }

    #[test]
    fn test_step_mid_month_does_not_drift() {
        let m = Frequency::monthly();
        let anchor = d(2025, 1, 28);
        assert_eq!(m.nth_date(anchor, 1), d(2025, 2, 28));
        assert_eq!(m.nth_date(anchor, 2), d(2025, 3, 28));
    }

    #[test]
    fn test_number_due_monthly() {
        let m = Frequency::monthly();
        // Coupons on 15 Jan, Feb, Mar and Apr fall in the interval
        assert_eq!(m.number_due(d(2025, 1, 15), d(2025, 1, 1), d(2025, 4, 20), far()), 4);
        // An anchor on the period start was settled in the prior period
        assert_eq!(m.number_due(d(2025, 1, 15), d(2025, 1, 15), d(2025, 4, 20), far()), 3);
    }

    #[test]
    fn test_number_due_other_frequencies() {
        assert_eq!(Frequency::quarterly().number_due(d(2025, 1, 15), d(2025, 1, 1), d(2025, 7, 20), far()), 3);
        assert_eq!(Frequency::semi_annual().number_due(d(2025, 1, 15), d(2025, 1, 1), d(2025, 12, 20), far()), 2);
        assert_eq!(Frequency::annual().number_due(d(2024, 1, 15), d(2024, 1, 1), d(2026, 2, 20), far()), 3);
        assert_eq!(Frequency::daily().number_due(d(2025, 1, 15), d(2025, 1, 14), d(2025, 1, 20), far()), 6);
        assert_eq!(Frequency::never().number_due(d(2025, 1, 15), d(2025, 1, 1), d(2030, 1, 1), far()), 0);
        // The only event of a `never` schedule is the maturity date
        assert_eq!(Frequency::never().number_due(d(2027, 6, 30), d(2025, 1, 1), d(2030, 1, 1), d(2027, 6, 30)), 1);
        let bullet = Frequency::never();
        let schedule = bullet.schedule(d(2027, 6, 30), d(2027, 6, 30));
        assert_eq!(schedule.accrual_start(0, d(2024, 6, 30)), d(2024, 6, 30));
    }

    #[test]
    fn test_schedule_clamps_to_maturity() {
        let q = Frequency::quarterly();
        let maturity = d(2025, 5, 15);
        let schedule = q.schedule(d(2024, 12, 31), maturity);
        let dates = schedule.due_in(0, d(2024, 12, 31), d(2025, 6, 30));
        assert_eq!(dates, vec![(1, d(2025, 3, 31)), (2, maturity)]);
        assert_eq!(schedule.index_on_or_after(0, d(2025, 4, 30)), 2);
        assert_eq!(schedule.date(2), maturity);
        assert_eq!(schedule.remaining_from(1), 2);
    }

    #[test]
    fn test_schedule_from_anchor_does_not_drift() {
        let m = Frequency::monthly();
        let schedule = m.schedule(d(2025, 1, 30), d(2026, 1, 30));
        assert_eq!(schedule.date(1), d(2025, 2, 28));
        assert_eq!(schedule.date(2), d(2025, 3, 30));
        assert_eq!(schedule.remaining_from(0), 13);
        assert_eq!(schedule.accrual_start(2, d(2024, 1, 1)), d(2025, 2, 28));
        assert_eq!(schedule.accrual_start(0, d(2025, 1, 15)), d(2025, 1, 15));
    }

    #[test]
    fn test_portion_year_sums_to_one() {
        for freq in [Frequency::monthly(), Frequency::quarterly(), Frequency::semi_annual(), Frequency::annual()] {
            let start = d(2024, 12, 31);
            let dates = freq.schedule(start, far()).due_in(0, start, d(2025, 12, 31));
            let mut prev = start;
            let mut total = 0.0;
            for (_, date) in dates {
                total += freq.portion_year(prev, date);
                prev = date;
            }
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        }

        let weekly = Frequency::weekly();
        let start = d(2025, 1, 1);
        let end = d(2026, 1, 1);
        let mut prev = start;
        let mut total = 0.0;
        for (_, date) in weekly.schedule(start, end).due_in(0, start, end) {
            total += weekly.portion_year(prev, date);
            prev = date;
        }
        assert_abs_diff_eq!(total, 1.0, epsilon = 1.0 / 365.0);
    }

    #[test]
    fn test_long_daily_schedule_indexes_directly() {
        let daily = Frequency::daily();
        let anchor = d(2000, 1, 1);
        let schedule = daily.schedule(anchor, d(2099, 12, 31));
        let last = schedule.last_index();
        assert_eq!(schedule.date(last), d(2099, 12, 31));
        assert_eq!(schedule.date(last - 1), d(2099, 12, 30));
        assert_eq!(schedule.remaining_from(0), last + 1);
        assert_eq!(schedule.remaining_from(last + 10), 1);

        let index = schedule.index_on_or_after(0, d(2080, 6, 15));
        assert_eq!(schedule.date(index), d(2080, 6, 15));
        assert_eq!(schedule.index_on_or_after(index + 5, d(2080, 6, 15)), index + 5);
        assert_eq!(schedule.index_on_or_after(0, d(2150, 1, 1)), last);
        assert_eq!(schedule.number_due(0, d(2080, 6, 14), d(2080, 6, 20)), 6);
    }

    #[test]
    fn test_month_end_indexing() {
        let q = Frequency::quarterly();
        let schedule = q.schedule(d(2024, 11, 30), d(2049, 11, 30));
        assert_eq!(schedule.index_on_or_after(0, d(2025, 2, 28)), 1);
        assert_eq!(schedule.index_on_or_after(0, d(2025, 3, 1)), 2);
        assert_eq!(schedule.index_on_or_after(0, d(2024, 1, 1)), 0);
        assert_eq!(schedule.remaining_from(0), 101);

        let m = Frequency::monthly();
        let mid = m.schedule(d(2025, 1, 30), d(2026, 1, 30));
        assert_eq!(mid.index_on_or_after(0, d(2025, 2, 28)), 1);
        assert_eq!(mid.index_on_or_after(0, d(2025, 3, 1)), 2);
    }

    #[test]
    fn test_reset_tenor() {
        assert_abs_diff_eq!(Frequency::quarterly().reset_tenor(d(2025, 1, 1), far()), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(Frequency::weekly().reset_tenor(d(2025, 1, 1), far()), 7.0 / 365.25, epsilon = 1e-12);
        assert_abs_diff_eq!(
            Frequency::never().reset_tenor(d(2025, 1, 1), d(2027, 1, 1)),
            731.0 / 365.25,
            epsilon = 1e-12
        );
    }
}
