use std::{collections::BTreeMap, fmt};

use tracing::{debug, info};

use crate::{
    error::{ensure_data, DistrictError, Result},
    graph::AdjacencyGraph,
    map::{UnitId, UnitRegistry},
    model::{AssignKey, ModelWarning, ToleranceBand},
    plan::{DistrictAssignment, DistrictLabel, DistrictStats},
    solve::{SolveOutcome, SolveStatus, INTEGRALITY_TOLERANCE},
};

/// A solved districting plan: the unit assignment plus per-district statistics.
#[derive(Debug, Clone)]
pub struct Plan {
    status: SolveStatus,
    assignment: DistrictAssignment,
    stats: Vec<DistrictStats>,
    cut_edges: Vec<(UnitId, UnitId)>,
    target: f64,
    tolerance: ToleranceBand,
    objective_value: f64,
    warnings: Vec<ModelWarning>,
}

impl Plan {
    /// Turn a solver outcome into a plan.
    ///
    /// Returns `Ok(None)` when the solve produced no solution (infeasible,
    /// unbounded or stopped); the caller decides whether to relax and retry.
    pub fn extract(outcome: &SolveOutcome, registry: &UnitRegistry, graph: &AdjacencyGraph) -> Result<Option<Self>> {
        let Some(values) = outcome.values.as_ref().filter(|_| outcome.status.has_solution()) else {
            return Ok(None);
        };
        let context = &outcome.context;
        ensure_data!(
            registry.len() == context.free.len() + context.pinned.len() + context.held_out.len(),
            "[plan] Unit registry does not match the solved model"
        );

        let mut labels = BTreeMap::new();

        // Free units: exactly one assign value at 1, the rest at 0.
        for unit in &context.free {
            let mut chosen = None;
            for d in 0..context.districts {
                let value = *values.assign.get(&AssignKey::new(unit.clone(), d))
                    .ok_or_else(|| inconsistent(unit, format!("no value for district {d}")))?;

                if (value - 1.0).abs() <= INTEGRALITY_TOLERANCE {
                    if let Some(previous) = chosen.replace(d) {
                        return Err(inconsistent(unit, format!("assigned to both district {previous} and district {d}")));
                    }
                } else if value.abs() > INTEGRALITY_TOLERANCE {
                    return Err(inconsistent(unit, format!("fractional value {value} for district {d}")));
                }
            }
            let district = chosen.ok_or_else(|| inconsistent(unit, "not assigned to any district".to_string()))?;
            labels.insert(unit.clone(), DistrictLabel::District(district));
        }

        // Pinned units keep their fixed district whatever the solver reported.
        for (unit, &district) in &context.pinned {
            labels.insert(unit.clone(), DistrictLabel::District(district));
        }
        for unit in &context.held_out {
            labels.insert(unit.clone(), DistrictLabel::Unassigned);
        }

        for id in registry.ids() {
            ensure_data!(labels.contains_key(id), "[plan] Unit {id} is missing from the solved model");
        }
        let assignment = DistrictAssignment::new(labels);

        // Recount cut edges from the graph rather than trusting the cut variables.
        let cut_edges = graph.cut_edges(|id| assignment.label(id));
        let bounded = context.bounded_series.as_deref().map(|series| (series, context.region_population));
        let stats = (0..context.districts)
            .map(|d| DistrictStats::compute(d, &assignment, registry, &cut_edges, context.target, bounded))
            .collect::<Vec<_>>();

        let plan = Self {
            status: outcome.status,
            assignment,
            stats,
            cut_edges,
            target: context.target,
            tolerance: context.tolerance,
            objective_value: values.objective,
            warnings: outcome.warnings.clone(),
        };

        info!(event = "plan_extracted", status = ?plan.status, cut_edges = plan.cut_edges.len(), balanced = plan.is_balanced());
        if let Some(modelled) = (!values.cut.is_empty()).then(|| values.cut.values().filter(|&&v| v > 0.5).count()) {
            debug!(modelled, recounted = plan.cut_edges.len(), "cut edge counts");
        }

        Ok(Some(plan))
    }

    #[inline] pub fn status(&self) -> SolveStatus { self.status }

    /// The unit → district mapping, suitable for joining against geometry.
    #[inline] pub fn assignment(&self) -> &DistrictAssignment { &self.assignment }

    /// Per-district statistics, indexed by district.
    #[inline] pub fn stats(&self) -> &[DistrictStats] { &self.stats }

    #[inline] pub fn num_districts(&self) -> u32 { self.stats.len() as u32 }

    /// Adjacent pairs split across districts, recounted from the graph.
    #[inline] pub fn cut_edges(&self) -> &[(UnitId, UnitId)] { &self.cut_edges }

    #[inline] pub fn target(&self) -> f64 { self.target }

    #[inline] pub fn objective_value(&self) -> f64 { self.objective_value }

    #[inline] pub fn warnings(&self) -> &[ModelWarning] { &self.warnings }

    /// Districts whose population falls outside the tolerance band.
    #[inline] pub fn unbalanced(&self) -> Vec<u32> { self.check_balance(self.tolerance) }

    #[inline] pub fn is_balanced(&self) -> bool { self.unbalanced().is_empty() }

    /// Districts whose population falls outside `band` (which may differ from the solved band).
    pub fn check_balance(&self, band: ToleranceBand) -> Vec<u32> {
        self.stats.iter()
            .filter(|s| !band.contains(s.population as f64, self.target))
            .map(|s| s.district)
            .collect()
    }

    /// Console report, one line per district.
    #[inline] pub fn report(&self) -> String { self.to_string() }
}

fn inconsistent(unit: &UnitId, detail: String) -> DistrictError {
    DistrictError::InconsistentSolution { unit: unit.clone(), detail }
}

/// Console report. Districts are numbered from 1.
impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {:?}", self.status)?;
        writeln!(f, "Target population: {:.1}", self.target)?;
        for s in &self.stats {
            write!(
                f,
                "District {} population: {} ({:+.2}%), units: {}, cut edges: {}",
                s.district + 1, s.population, 100.0 * s.relative_deviation, s.units, s.cut_edges,
            )?;
            for (series, ratio) in &s.ratios {
                write!(f, ", {series}: {:.2}%", 100.0 * ratio)?;
            }
            writeln!(f)?;
        }
        write!(f, "Total cut edges: {}", self.cut_edges.len())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, time::Duration};

    use super::*;
    use crate::{
        graph::{AdjacencyBuilder, AdjacencyRow},
        map::{Exclusions, UnitRecord},
        model::{ModelContext, ObjectiveMode},
        solve::SolvedValues,
    };

    fn fixture() -> (UnitRegistry, AdjacencyGraph) {
        let registry = UnitRegistry::build(
            ["A", "B", "C", "D", "E"].map(|id| UnitRecord::new(id, id, 100)),
            &Exclusions::new(),
        ).unwrap();
        let rows = ["A", "B", "C", "D"].iter().zip(["B", "C", "D", "E"])
            .map(|(&a, b)| AdjacencyRow::primary(a, a, b, b))
            .collect::<Vec<_>>();
        let graph = AdjacencyBuilder::new().build(&rows, &registry).unwrap();
        (registry, graph)
    }

    fn outcome(free: &[&str], pinned: &[(&str, u32)], assign: &[(&str, u32, f64)]) -> SolveOutcome {
        SolveOutcome {
            status: SolveStatus::Optimal,
            values: Some(SolvedValues {
                assign: assign.iter().map(|&(u, d, v)| (AssignKey::new(UnitId::new(u), d), v)).collect(),
                ..SolvedValues::default()
            }),
            context: ModelContext {
                districts: 2,
                tolerance: ToleranceBand::new(0.8, 1.2),
                objective: ObjectiveMode::MinimizeCutEdges,
                target: 250.0,
                region_population: 500,
                free: free.iter().map(|&u| UnitId::new(u)).collect(),
                pinned: pinned.iter().map(|&(u, d)| (UnitId::new(u), d)).collect(),
                held_out: BTreeSet::new(),
                bounded_series: None,
            },
            warnings: vec![],
            elapsed: Duration::ZERO,
        }
    }

    /// A, B in district 0; C (pinned), D, E in district 1 unless overridden.
    fn split_values(c_pinned_to: u32) -> SolveOutcome {
        outcome(
            &["A", "B", "D", "E"],
            &[("C", c_pinned_to)],
            &[
                ("A", 0, 1.0), ("A", 1, 0.0),
                ("B", 0, 1.0), ("B", 1, 0.0),
                ("D", 0, 0.0), ("D", 1, 1.0),
                ("E", 0, 0.0), ("E", 1, 1.0),
            ],
        )
    }

    #[test]
    fn extract_merges_pinned_units_and_recounts_cuts() {
        let (registry, graph) = fixture();
        let plan = Plan::extract(&split_values(1), &registry, &graph).unwrap().unwrap();

        assert_eq!(plan.assignment().len(), 5);
        assert_eq!(plan.assignment().label(&UnitId::new("C")), DistrictLabel::District(1));
        assert_eq!(plan.stats()[0].population, 200);
        assert_eq!(plan.stats()[1].population, 300);
        assert_eq!(plan.cut_edges(), &[(UnitId::new("B"), UnitId::new("C"))]);
        assert!(plan.is_balanced());
    }

    #[test]
    fn pinned_label_wins_over_solver_values() {
        let (registry, graph) = fixture();
        let plan = Plan::extract(&split_values(0), &registry, &graph).unwrap().unwrap();

        assert_eq!(plan.assignment().label(&UnitId::new("C")), DistrictLabel::District(0));
        assert_eq!(plan.stats()[0].population, 300);
        assert_eq!(plan.cut_edges().len(), 1);
    }

    #[test]
    fn within_tolerance_values_are_accepted() {
        let (registry, graph) = fixture();
        let mut outcome = split_values(1);
        let values = outcome.values.as_mut().unwrap();
        values.assign.insert(AssignKey::new(UnitId::new("A"), 0), 1.0 - 1e-9);
        values.assign.insert(AssignKey::new(UnitId::new("A"), 1), 1e-9);
        assert!(Plan::extract(&outcome, &registry, &graph).unwrap().is_some());
    }

    #[test]
    fn fractional_values_are_inconsistent() {
        let (registry, graph) = fixture();
        let mut outcome = split_values(1);
        let values = outcome.values.as_mut().unwrap();
        values.assign.insert(AssignKey::new(UnitId::new("A"), 0), 0.5);
        values.assign.insert(AssignKey::new(UnitId::new("A"), 1), 0.5);

        let err = Plan::extract(&outcome, &registry, &graph).unwrap_err();
        assert!(matches!(err, DistrictError::InconsistentSolution { unit, .. } if unit.as_str() == "A"));
    }

    #[test]
    fn double_assignment_is_inconsistent() {
        let (registry, graph) = fixture();
        let mut outcome = split_values(1);
        outcome.values.as_mut().unwrap().assign.insert(AssignKey::new(UnitId::new("B"), 1), 1.0);

        let err = Plan::extract(&outcome, &registry, &graph).unwrap_err();
        assert!(matches!(err, DistrictError::InconsistentSolution { unit, .. } if unit.as_str() == "B"));
    }

    #[test]
    fn unassigned_unit_is_inconsistent() {
        let (registry, graph) = fixture();
        let mut outcome = split_values(1);
        outcome.values.as_mut().unwrap().assign.insert(AssignKey::new(UnitId::new("E"), 1), 0.0);
        assert!(matches!(
            Plan::extract(&outcome, &registry, &graph),
            Err(DistrictError::InconsistentSolution { .. })
        ));
    }

    #[test]
    fn no_plan_without_a_solution() {
        let (registry, graph) = fixture();
        let mut outcome = split_values(1);
        outcome.status = SolveStatus::Infeasible;
        outcome.values = None;
        assert!(Plan::extract(&outcome, &registry, &graph).unwrap().is_none());
    }

    #[test]
    fn single_district_has_no_cut_edges() {
        let (registry, graph) = fixture();
        let mut outcome = outcome(
            &["A", "B", "C", "D", "E"],
            &[],
            &[("A", 0, 1.0), ("B", 0, 1.0), ("C", 0, 1.0), ("D", 0, 1.0), ("E", 0, 1.0)],
        );
        outcome.context.districts = 1;
        outcome.context.target = 500.0;

        let plan = Plan::extract(&outcome, &registry, &graph).unwrap().unwrap();
        assert!(plan.cut_edges().is_empty());
        assert_eq!(plan.stats()[0].cut_edges, 0);
        assert!(plan.cut_edges().len() <= graph.edge_count());
    }

    #[test]
    fn check_balance_against_a_tighter_band() {
        let (registry, graph) = fixture();
        let plan = Plan::extract(&split_values(1), &registry, &graph).unwrap().unwrap();
        assert!(plan.check_balance(ToleranceBand::new(0.8, 1.2)).is_empty());
        assert_eq!(plan.check_balance(ToleranceBand::symmetric(0.1)), vec![0, 1]);
    }

    #[test]
    fn report_numbers_districts_from_one() {
        let (registry, graph) = fixture();
        let plan = Plan::extract(&split_values(1), &registry, &graph).unwrap().unwrap();
        let report = plan.to_string();
        assert!(report.contains("District 1 population: 200"));
        assert!(report.contains("District 2 population: 300"));
        assert!(report.ends_with("Total cut edges: 1"));
    }
}
