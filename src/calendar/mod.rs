//! Date arithmetic: day counts, payment frequencies and the projection horizon

pub mod date;
mod daycount;
mod frequency;
mod horizon;

pub use daycount::DayCount;
pub use frequency::{CouponSchedule, Frequency, Periodicity};
pub use horizon::{HorizonConfig, Period, TimeHorizon};
