//! Validate a scenario without running it.

use crate::scenario::Scenario;
use anyhow::{Context, Result};
use std::path::Path;

/// Load the scenario, build its object tree and check rules and step paths.
pub fn check_scenario(path: &Path, json: bool) -> Result<()> {
    let scenario = Scenario::from_file(path).context("Failed to load scenario")?;
    let summary = scenario.validate().context("Scenario is invalid")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Scenario OK: {} members, {} methods, {} rules, {} steps",
            summary.members.len(),
            summary.methods,
            summary.rules,
            summary.steps
        );
    }

    Ok(())
}
