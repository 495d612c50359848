use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    map::{UnitId, UnitRegistry},
    plan::{DistrictAssignment, DistrictLabel},
};

/// Aggregate figures for one district. Recomputed from an assignment, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictStats {
    pub district: u32,
    pub units: usize,
    pub population: u64,
    /// Population minus the equal-share target.
    pub deviation: f64,
    /// Population over the target, minus one.
    pub relative_deviation: f64,
    pub subpopulations: BTreeMap<String, u64>,
    /// Sub-population over district population (0 for an empty district).
    pub ratios: BTreeMap<String, f64>,
    /// Bounded sub-population over the optimized region's population.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_share: Option<f64>,
    /// Cut edges with at least one endpoint in this district.
    pub cut_edges: usize,
}

impl DistrictStats {
    /// Tally the units of `district` from the assignment.
    pub(crate) fn compute(
        district: u32,
        assignment: &DistrictAssignment,
        registry: &UnitRegistry,
        cut_edges: &[(UnitId, UnitId)],
        target: f64,
        bounded: Option<(&str, u64)>,
    ) -> Self {
        let members = assignment.units_in(district)
            .filter_map(|id| registry.get(id))
            .collect::<Vec<_>>();

        let population = members.iter().map(|u| u.population()).sum::<u64>();
        let subpopulations = registry.series().iter()
            .map(|series| (series.clone(), members.iter().filter_map(|u| u.series(series)).sum::<u64>()))
            .collect::<BTreeMap<_, _>>();
        let ratios = subpopulations.iter()
            .map(|(series, &count)| (series.clone(), ratio(count, population)))
            .collect();
        let regional_share = bounded.map(|(series, region)| {
            ratio(subpopulations.get(series).copied().unwrap_or(0), region)
        });

        let label = DistrictLabel::District(district);
        let cut_edges = cut_edges.iter()
            .filter(|(a, b)| assignment.label(a) == label || assignment.label(b) == label)
            .count();

        Self {
            district,
            units: members.len(),
            population,
            deviation: population as f64 - target,
            relative_deviation: if target > 0.0 { population as f64 / target - 1.0 } else { 0.0 },
            subpopulations,
            ratios,
            regional_share,
            cut_edges,
        }
    }
}

#[inline]
fn ratio(count: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}
