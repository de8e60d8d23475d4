//! Market data and scenario definitions

mod curve;
pub mod loader;
mod scenario;

pub use curve::{parse_tenor, CurvePoint, ZeroCurve};
pub use loader::{load_scenarios, load_scenarios_from_reader};
pub use scenario::{CurveSnapshot, MarketData, Scenario};
