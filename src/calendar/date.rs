//! Calendar helpers

use chrono::{Datelike, Days, Months, NaiveDate};

/// Last day of the month containing `date`
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.checked_sub_days(Days::new(1)))
        .unwrap_or(date)
}

pub fn is_end_of_month(date: NaiveDate) -> bool {
    end_of_month(date) == date
}

/// Add (or subtract) calendar months, clamping the day to the target month
///
/// With `make_end_of_month` the result is moved to the last day of the target month.
pub fn add_months(date: NaiveDate, months: i32, make_end_of_month: bool) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
    .unwrap_or(date);

    if make_end_of_month {
        end_of_month(shifted)
    } else {
        shifted
    }
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
    .unwrap_or(date)
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}
