pub mod graph;
pub mod solve;

use std::path::Path;

use anyhow::{ensure, Context, Result};
use districtor::{config::ScenarioConfig, io::csv, AdjacencyGraph, UnitRegistry};

use crate::cli::InputArgs;

/// Read both input tables and build the registry and graph for a scenario.
pub fn load_inputs(inputs: &InputArgs, scenario: &ScenarioConfig) -> Result<(UnitRegistry, AdjacencyGraph)> {
    tracing::info!(units = %inputs.units.display(), adjacency = %inputs.adjacency.display(), "reading inputs");

    let records = csv::read_unit_records(&inputs.units, &scenario.units)?;
    let registry = UnitRegistry::build(records, &scenario.exclusions())
        .context("[districtor] Failed to build unit registry")?;

    let rows = csv::read_adjacency_table(&inputs.adjacency)?;
    let graph = scenario.adjacency_builder().build(&rows, &registry)
        .context("[districtor] Failed to build adjacency graph")?;

    Ok((registry, graph))
}

/// Refuse stdout and existing files unless `force` is set.
pub fn check_output(path: &Path, force: bool) -> Result<()> {
    ensure!(path != Path::new("-"), "[districtor] Writing to stdout is not supported: {}", path.display());
    ensure!(force || !path.exists(), "[districtor] Output file exists (use --force to overwrite): {}", path.display());
    Ok(())
}
