//! Projection orchestration across the time horizon and scenarios

mod engine;
mod result;
mod state;

pub use engine::{Projection, ProjectionConfig};
pub use result::{PeriodRecord, ProjectionResult, ProjectionRun, ScenarioFailure, ScenarioOutcome};
pub use state::{CancellationToken, RunState};
