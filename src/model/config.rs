use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ensure_data, Result},
    map::{UnitId, UnitRegistry},
};

/// Allowed district population range, as multiples of the equal-share target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceBand {
    pub lower: f64,
    pub upper: f64,
}

impl ToleranceBand {
    pub fn new(lower: f64, upper: f64) -> Self { Self { lower, upper } }

    /// A band of `±fraction` around the target, e.g. `symmetric(0.1)` is 0.90–1.10.
    pub fn symmetric(fraction: f64) -> Self { Self::new(1.0 - fraction, 1.0 + fraction) }

    /// Lowest and highest allowed population for a given target.
    #[inline] pub fn bounds(&self, target: f64) -> (f64, f64) { (self.lower * target, self.upper * target) }

    /// Check a population against the band, allowing for solver round-off.
    pub fn contains(&self, population: f64, target: f64) -> bool {
        let (lo, hi) = self.bounds(target);
        let slack = 1e-6 * target.abs().max(1.0);
        population >= lo - slack && population <= hi + slack
    }
}

impl Default for ToleranceBand {
    fn default() -> Self { Self::symmetric(0.10) }
}

/// Secondary objective minimized within the balance band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    /// Minimize the sum of absolute district deviations from the target.
    #[default]
    MinimizeTotalDeviation,
    /// Minimize the number of adjacent pairs split across districts.
    MinimizeCutEdges,
}

/// Upper bound on a sub-population's share of the region, per district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicBound {
    pub series: String,
    pub upper: f64,
}

/// What to do with optimized units that have no neighbors when contiguity support is on.
///
/// The faithful choices for an island are to pin it or to accept an infeasible
/// model, so `Enforce` is the default. `Exempt` is an opt-in relaxation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolatedUnitPolicy {
    /// Keep the constraint, which makes the model infeasible (and warn).
    #[default]
    Enforce,
    /// Leave the unit out of the contiguity-support constraint (and warn).
    /// This relaxes the model beyond the two choices above.
    Exempt,
}

/// Parameters of one districting model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub districts: u32,
    pub tolerance: ToleranceBand,
    pub objective: ObjectiveMode,
    pub track_cut_edges: bool,
    pub contiguity_support: bool,
    pub isolated_units: IsolatedUnitPolicy,
    pub demographic_bound: Option<DemographicBound>,
    pub pinned: BTreeMap<UnitId, u32>,
    pub held_out: BTreeSet<UnitId>,
}

impl ModelConfig {
    /// Default model for `districts` districts: ±10% band, total-deviation objective,
    /// contiguity support on.
    pub fn new(districts: u32) -> Self {
        Self {
            districts,
            tolerance: ToleranceBand::default(),
            objective: ObjectiveMode::default(),
            track_cut_edges: false,
            contiguity_support: true,
            isolated_units: IsolatedUnitPolicy::default(),
            demographic_bound: None,
            pinned: BTreeMap::new(),
            held_out: BTreeSet::new(),
        }
    }

    pub fn tolerance(mut self, band: ToleranceBand) -> Self { self.tolerance = band; self }

    pub fn objective(mut self, objective: ObjectiveMode) -> Self { self.objective = objective; self }

    /// Add cut-edge variables and linkage even in total-deviation mode.
    pub fn track_cut_edges(mut self, track: bool) -> Self { self.track_cut_edges = track; self }

    pub fn contiguity_support(mut self, enabled: bool) -> Self { self.contiguity_support = enabled; self }

    pub fn isolated_units(mut self, policy: IsolatedUnitPolicy) -> Self { self.isolated_units = policy; self }

    pub fn demographic_bound(mut self, series: impl Into<String>, upper: f64) -> Self {
        self.demographic_bound = Some(DemographicBound { series: series.into(), upper });
        self
    }

    /// Force a unit into a district.
    pub fn pin(mut self, unit: impl Into<UnitId>, district: u32) -> Self {
        self.pinned.insert(unit.into(), district);
        self
    }

    /// Leave a unit out of optimization entirely; it is reported as unassigned.
    pub fn hold_out(mut self, unit: impl Into<UnitId>) -> Self {
        self.held_out.insert(unit.into());
        self
    }

    /// Whether the model needs cut-edge variables.
    #[inline]
    pub fn needs_cut_edges(&self) -> bool {
        self.objective == ObjectiveMode::MinimizeCutEdges || self.track_cut_edges
    }

    /// Reject configurations that cannot describe a model over `registry`.
    pub fn validate(&self, registry: &UnitRegistry) -> Result<()> {
        ensure_data!(self.districts >= 1, "[model::config] District count must be at least 1");

        let ToleranceBand { lower, upper } = self.tolerance;
        ensure_data!(lower.is_finite() && upper.is_finite(), "[model::config] Tolerance band must be finite");
        ensure_data!(0.0 <= lower && lower <= upper, "[model::config] Tolerance band must satisfy 0 <= lower <= upper (got {lower}..{upper})");

        for (unit, &district) in &self.pinned {
            ensure_data!(registry.contains(unit), "[model::config] Pinned unit {unit} not found in registry");
            ensure_data!(district < self.districts, "[model::config] Unit {unit} pinned to district {district}, but only {} districts exist", self.districts);
            ensure_data!(!self.held_out.contains(unit), "[model::config] Unit {unit} cannot be both pinned and held out");
        }
        for unit in &self.held_out {
            ensure_data!(registry.contains(unit), "[model::config] Held-out unit {unit} not found in registry");
        }

        if let Some(bound) = &self.demographic_bound {
            ensure_data!(registry.has_series(&bound.series), "[model::config] Sub-population '{}' not found in registry", bound.series);
            ensure_data!((0.0..=1.0).contains(&bound.upper), "[model::config] Demographic bound must lie in [0, 1] (got {})", bound.upper);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::DistrictError, map::{Exclusions, UnitRecord}};

    fn registry() -> UnitRegistry {
        UnitRegistry::build(
            ["A", "B", "C"].map(|id| UnitRecord::new(id, id, 100).with_subpopulation("minority", 10)),
            &Exclusions::new(),
        ).unwrap()
    }

    #[test]
    fn band_contains_with_round_off() {
        let band = ToleranceBand::new(0.8, 1.2);
        assert_eq!(band.bounds(250.0), (200.0, 300.0));
        assert!(band.contains(200.0, 250.0));
        assert!(band.contains(300.0000001, 250.0));
        assert!(!band.contains(301.0, 250.0));
        assert!(!band.contains(199.0, 250.0));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ModelConfig::new(2).validate(&registry()).is_ok());
        assert!(!ModelConfig::new(2).needs_cut_edges());
        assert!(ModelConfig::new(2).objective(ObjectiveMode::MinimizeCutEdges).needs_cut_edges());
        assert!(ModelConfig::new(2).track_cut_edges(true).needs_cut_edges());
    }

    #[test]
    fn rejects_bad_parameters() {
        let registry = registry();
        let invalid = [
            ModelConfig::new(0),
            ModelConfig::new(2).tolerance(ToleranceBand::new(1.2, 0.8)),
            ModelConfig::new(2).tolerance(ToleranceBand::new(-0.1, 1.1)),
            ModelConfig::new(2).tolerance(ToleranceBand::new(0.9, f64::INFINITY)),
            ModelConfig::new(2).pin("Z", 0),
            ModelConfig::new(2).pin("A", 2),
            ModelConfig::new(2).pin("A", 0).hold_out("A"),
            ModelConfig::new(2).hold_out("Z"),
            ModelConfig::new(2).demographic_bound("asian", 0.5),
            ModelConfig::new(2).demographic_bound("minority", 1.5),
        ];
        for config in invalid {
            assert!(matches!(config.validate(&registry), Err(DistrictError::Data(_))), "{config:?}");
        }
    }

    #[test]
    fn objective_mode_uses_snake_case_names() {
        let mode: ObjectiveMode = serde_json::from_str("\"minimize_cut_edges\"").unwrap();
        assert_eq!(mode, ObjectiveMode::MinimizeCutEdges);
    }
}
