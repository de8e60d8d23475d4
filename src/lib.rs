//! Bank Projection - registry-dispatched, time-stepped balance sheet projections
//!
//! This library provides:
//! - Key-based registries binding balance sheet classifications to handlers
//! - Coupon scheduling, day counts and time horizons
//! - Runoff (redemption, prepayment, coupons) and revaluation rules
//! - Parallel multi-scenario orchestration with per-period metrics

pub mod balance_sheet;
pub mod calendar;
pub mod error;
pub mod market;
pub mod metrics;
pub mod projection;
pub mod registry;
pub mod rules;
pub mod scenario;

// Re-export commonly used types
pub use balance_sheet::{BalanceSheet, BalanceSheetItem};
pub use calendar::{Frequency, TimeHorizon};
pub use error::{ProjectionError, Result};
pub use market::{MarketData, Scenario, ZeroCurve};
pub use projection::{CancellationToken, Projection, ProjectionConfig, ProjectionResult, ProjectionRun, RunState};
pub use registry::{Registries, Registry};
pub use scenario::ScenarioRunner;
