//! Day count conventions for accrual year fractions

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::date::{days_between, is_end_of_month, is_leap_year};

/// Convention used to turn a date interval into a fraction of a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayCount {
    /// Actual days / 360
    Actual360,
    /// Actual days / 365
    Actual365Fixed,
    /// Actual days / 365.25
    Actual36525,
    /// Days in leap years / 366 plus days in other years / 365
    ActualActualIsda,
    /// 30/360 US bond basis
    Thirty360,
    /// 30E/360 Eurobond basis
    Thirty360European,
}

impl DayCount {
    /// Year fraction between `start` and `end`; negative if `end < start`
    pub fn year_fraction(&self, start: NaiveDate, end: NaiveDate) -> f64 {
        if start == end {
            return 0.0;
        }
        if end < start {
            return -self.year_fraction(end, start);
        }

        match self {
            DayCount::Actual360 => days_between(start, end) as f64 / 360.0,
            DayCount::Actual365Fixed => days_between(start, end) as f64 / 365.0,
            DayCount::Actual36525 => days_between(start, end) as f64 / 365.25,
            DayCount::ActualActualIsda => actual_actual_isda(start, end),
            DayCount::Thirty360 => thirty_360_us(start, end),
            DayCount::Thirty360European => thirty_360_european(start, end),
        }
    }
}

fn actual_actual_isda(start: NaiveDate, end: NaiveDate) -> f64 {
    let days_in_year = |year: i32| if is_leap_year(year) { 366.0 } else { 365.0 };

    if start.year() == end.year() {
        return days_between(start, end) as f64 / days_in_year(start.year());
    }

    let mut fraction = 0.0;
    if let Some(next_year) = NaiveDate::from_ymd_opt(start.year() + 1, 1, 1) {
        fraction += days_between(start, next_year) as f64 / days_in_year(start.year());
    }
    fraction += (end.year() - start.year() - 1) as f64;
    if let Some(end_year) = NaiveDate::from_ymd_opt(end.year(), 1, 1) {
        fraction += days_between(end_year, end) as f64 / days_in_year(end.year());
    }
    fraction
}

fn thirty_360_days(start: NaiveDate, end: NaiveDate, d1: i32, d2: i32) -> f64 {
    let years = end.year() - start.year();
    let months = end.month() as i32 - start.month() as i32;
    (360 * years + 30 * months + (d2 - d1)) as f64 / 360.0
}

fn thirty_360_us(start: NaiveDate, end: NaiveDate) -> f64 {
    let is_last_of_feb = |date: NaiveDate| date.month() == 2 && is_end_of_month(date);

    let mut d1 = start.day() as i32;
    let mut d2 = end.day() as i32;
    if is_last_of_feb(start) && is_last_of_feb(end) {
        d2 = 30;
    }
    if is_last_of_feb(start) || d1 == 31 {
        d1 = 30;
    }
    if d2 == 31 && d1 >= 30 {
        d2 = 30;
    }
    thirty_360_days(start, end, d1, d2)
}

fn thirty_360_european(start: NaiveDate, end: NaiveDate) -> f64 {
    let d1 = (start.day() as i32).min(30);
    let d2 = (end.day() as i32).min(30);
    thirty_360_days(start, end, d1, d2)
}
