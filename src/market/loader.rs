//! Load scenarios from JSON

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::Scenario;
use crate::error::{ProjectionError, Result};

/// Load a JSON array of scenarios from a file
pub fn load_scenarios<P: AsRef<Path>>(path: P) -> Result<Vec<Scenario>> {
    let file = File::open(path)?;
    load_scenarios_from_reader(BufReader::new(file))
}

/// Load a JSON array of scenarios from any reader
pub fn load_scenarios_from_reader<R: Read>(reader: R) -> Result<Vec<Scenario>> {
    let scenarios: Vec<Scenario> = serde_json::from_reader(reader)?;
    let mut names = std::collections::HashSet::new();
    for scenario in &scenarios {
        if !names.insert(scenario.name.as_str()) {
            return Err(ProjectionError::InvalidInput(format!(
                "duplicate scenario name '{}'",
                scenario.name
            )));
        }
    }
    log::info!("Loaded {} scenarios", scenarios.len());
    Ok(scenarios.into_iter().map(Scenario::normalised).collect())
}
