use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{map::UnitId, plan::{DistrictStats, Plan}, solve::SolveStatus};

/// JSON document written by [`Plan::write_stats_json`].
#[derive(Serialize)]
struct StatsReport<'a> {
    status: SolveStatus,
    target: f64,
    objective_value: f64,
    cut_edges: &'a [(UnitId, UnitId)],
    warnings: Vec<String>,
    districts: &'a [DistrictStats],
}

impl Plan {
    /// Unit assignments as (unit id, district) rows; unassigned units get an empty district.
    fn assignment_rows(&self) -> Vec<(UnitId, Option<u32>)> {
        self.assignment().iter()
            .map(|(unit, label)| (unit.clone(), label.district()))
            .collect()
    }

    /// Write the unit → district mapping to a CSV file.
    pub fn write_assignments_csv(&self, path: &Path) -> Result<()> {
        crate::io::csv::write_plan_assignments(&self.assignment_rows(), path)
    }

    /// Generate the unit → district mapping as a CSV string.
    pub fn assignments_csv(&self) -> Result<String> {
        crate::io::csv::write_plan_assignments_string(&self.assignment_rows())
    }

    /// Per-district statistics as a JSON string.
    pub fn stats_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.stats_report())
            .context("[plan::io] Failed to serialize district statistics")
    }

    /// Write per-district statistics to a JSON file.
    pub fn write_stats_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("[plan::io] Failed to create JSON file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.stats_report())
            .with_context(|| format!("[plan::io] Failed to write JSON to {:?}", path))
    }

    fn stats_report(&self) -> StatsReport<'_> {
        StatsReport {
            status: self.status(),
            target: self.target(),
            objective_value: self.objective_value(),
            cut_edges: self.cut_edges(),
            warnings: self.warnings().iter().map(|w| w.to_string()).collect(),
            districts: self.stats(),
        }
    }
}
