use std::collections::{BTreeMap, BTreeSet};

use good_lp::{variable, Constraint, Expression, IntoAffineExpression, ProblemVariables, Variable};
use tracing::{debug, info, warn};

use crate::{
    error::{ensure_data, Result},
    graph::AdjacencyGraph,
    map::{UnitId, UnitRegistry},
    model::{
        AssignKey, EdgeKey, IsolatedUnitPolicy, ModelConfig, ModelIndex, ModelWarning,
        ObjectiveMode, ToleranceBand,
    },
};

/// How a unit takes part in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Free,
    Pinned(u32),
    HeldOut,
}

/// Everything the result extractor needs to know about a model once its
/// variables are gone.
#[derive(Debug, Clone)]
pub struct ModelContext {
    pub districts: u32,
    pub tolerance: ToleranceBand,
    pub objective: ObjectiveMode,
    /// Equal-share population target (optimized population / districts).
    pub target: f64,
    /// Total population of the optimized units (free and pinned).
    pub region_population: u64,
    pub free: Vec<UnitId>,
    pub pinned: BTreeMap<UnitId, u32>,
    pub held_out: BTreeSet<UnitId>,
    pub bounded_series: Option<String>,
}

/// A districting integer program, ready to hand to a solver.
///
/// The weak contiguity-support constraint only forbids a unit from having no
/// same-district neighbor. It approximates contiguity; it does not guarantee
/// that each district is connected.
pub struct DistrictingModel {
    pub(crate) vars: ProblemVariables,
    pub(crate) objective: Expression,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) index: ModelIndex,
    pub(crate) context: ModelContext,
    pub(crate) warnings: Vec<ModelWarning>,
}

impl DistrictingModel {
    /// Declare variables, objective and constraints for `config` over the registry and graph.
    /// All input validation happens before the first variable is created.
    pub fn build(registry: &UnitRegistry, graph: &AdjacencyGraph, config: &ModelConfig) -> Result<Self> {
        config.validate(registry)?;
        ensure_data!(
            graph.node_count() == registry.len() && graph.ids().iter().zip(registry.ids()).all(|(a, b)| a == b),
            "[model] Adjacency graph was not built from this unit registry"
        );

        let roles = registry.ids()
            .map(|id| match (config.pinned.get(id), config.held_out.contains(id)) {
                (Some(&d), _) => Role::Pinned(d),
                (None, true) => Role::HeldOut,
                (None, false) => Role::Free,
            })
            .collect::<Vec<_>>();
        let units = registry.units();
        let districts = config.districts;

        let region_population = units.iter().zip(&roles)
            .filter(|(_, role)| **role != Role::HeldOut)
            .map(|(unit, _)| unit.population())
            .sum::<u64>();
        ensure_data!(region_population > 0, "[model] Optimized units have zero total population");
        let target = region_population as f64 / districts as f64;

        let mut warnings = Vec::new();
        let fillable = roles.iter().filter(|role| **role != Role::HeldOut).count();
        if (districts as usize) > fillable {
            warnings.push(ModelWarning::MoreDistrictsThanUnits { districts, units: fillable });
        }
        if (config.contiguity_support || config.needs_cut_edges()) && graph.edge_count() == 0 && fillable > 1 {
            warnings.push(ModelWarning::EmptyGraph);
        }

        let mut vars = ProblemVariables::new();
        let mut index = ModelIndex::default();
        let mut constraints = Vec::new();

        // Per-node assign variables (empty for pinned and held-out units).
        let mut assign_vars: Vec<Vec<Variable>> = vec![Vec::new(); units.len()];
        for (node, unit) in units.iter().enumerate().filter(|&(n, _)| roles[n] == Role::Free) {
            for d in 0..districts {
                let var = vars.add(variable().binary().name(format!("assign_{}_{d}", unit.id())));
                index.assign.insert(AssignKey::new(unit.id().clone(), d), var);
                assign_vars[node].push(var);
            }
        }

        // assign[u, d] as an expression: a variable for free units, a constant otherwise.
        let assign = |node: usize, d: u32| -> Expression {
            match roles[node] {
                Role::Free => assign_vars[node][d as usize].into_expression(),
                Role::Pinned(p) => Expression::from_other_affine(if p == d { 1.0 } else { 0.0 }),
                Role::HeldOut => Expression::from_other_affine(0.0),
            }
        };

        // Exactly one district per free unit.
        for node in (0..units.len()).filter(|&n| roles[n] == Role::Free) {
            let total = (0..districts).fold(Expression::default(), |acc, d| acc + assign(node, d));
            constraints.push(total.eq(1.0));
        }

        // District populations, with pinned units contributing constants.
        let populations = (0..districts)
            .map(|d| {
                let mut total = Expression::default();
                for node in 0..units.len() {
                    total.add_mul(units[node].population() as f64, assign(node, d));
                }
                total
            })
            .collect::<Vec<_>>();

        // Balance band.
        let (lo, hi) = config.tolerance.bounds(target);
        for population in &populations {
            constraints.push(population.clone().geq(lo));
            constraints.push(population.clone().leq(hi));
        }

        let mut objective = Expression::default();

        // Absolute deviation from the target.
        if config.objective == ObjectiveMode::MinimizeTotalDeviation {
            for (d, population) in (0..districts).zip(&populations) {
                let deviation = vars.add(variable().min(0.0).name(format!("deviation_{d}")));
                index.deviation.insert(d, deviation);
                constraints.push((population.clone() - target).leq(deviation));
                constraints.push((Expression::from_other_affine(target) - population.clone()).leq(deviation));
                objective.add_mul(1.0, deviation);
            }
        }

        // Cut-edge indicators, one per undirected pair of optimized units.
        if config.needs_cut_edges() {
            for (u, v) in graph.node_pairs() {
                if roles[u] == Role::HeldOut || roles[v] == Role::HeldOut { continue }
                let key = EdgeKey::new(graph.id(u).clone(), graph.id(v).clone());
                let (a, b) = key.endpoints();
                let cut = vars.add(variable().binary().name(format!("cut_{a}_{b}")));
                for d in 0..districts {
                    constraints.push((assign(u, d) - assign(v, d)).leq(cut));
                    constraints.push((assign(v, d) - assign(u, d)).leq(cut));
                }
                if config.objective == ObjectiveMode::MinimizeCutEdges {
                    objective.add_mul(1.0, cut);
                }
                index.cut.insert(key, cut);
            }
        }

        // Weak contiguity support: every optimized unit needs a same-district neighbor.
        // A pinned unit only constrains its own district; the others hold trivially.
        if config.contiguity_support {
            let adjacency = graph.undirected_adjacency();
            for node in (0..units.len()).filter(|&n| roles[n] != Role::HeldOut) {
                let neighbors = adjacency[node].iter()
                    .copied()
                    .filter(|&v| roles[v] != Role::HeldOut)
                    .collect::<Vec<_>>();

                if neighbors.is_empty() {
                    let exempted = config.isolated_units == IsolatedUnitPolicy::Exempt;
                    warnings.push(ModelWarning::IsolatedUnit { unit: units[node].id().clone(), exempted });
                    if exempted { continue }
                }

                let checked = match roles[node] {
                    // A neighbor pinned to the same district already supports it.
                    Role::Pinned(p) if neighbors.iter().any(|&v| roles[v] == Role::Pinned(p)) => continue,
                    Role::Pinned(p) => p..p + 1,
                    _ => 0..districts,
                };
                for d in checked {
                    let support = neighbors.iter().fold(Expression::default(), |acc, &v| acc + assign(v, d));
                    constraints.push(support.geq(assign(node, d)));
                }
            }
        }

        // Demographic bound, as a share of the optimized region's population.
        if let Some(bound) = &config.demographic_bound {
            for d in 0..districts {
                let ratio = vars.add(variable().min(0.0).max(1.0).name(format!("ratio_{d}")));
                let mut share = Expression::default();
                for node in 0..units.len() {
                    let count = units[node].series(&bound.series).unwrap_or(0);
                    share.add_mul(count as f64 / region_population as f64, assign(node, d));
                }
                constraints.push(share.eq(ratio));
                constraints.push(ratio.into_expression().leq(bound.upper));
                index.ratio.insert(d, ratio);
            }
        }

        for warning in &warnings { warn!("{warning}") }
        info!(
            event = "model_built",
            districts,
            target,
            variables = index.len(),
            constraints = constraints.len(),
            objective = ?config.objective,
        );
        debug!(
            assign = index.assign_count(),
            cut = index.cut_count(),
            deviation = index.deviation_count(),
            ratio = index.ratio_count(),
            "model variable counts"
        );

        let context = ModelContext {
            districts,
            tolerance: config.tolerance,
            objective: config.objective,
            target,
            region_population,
            free: units.iter().zip(&roles)
                .filter(|(_, role)| **role == Role::Free)
                .map(|(unit, _)| unit.id().clone())
                .collect(),
            pinned: config.pinned.clone(),
            held_out: config.held_out.clone(),
            bounded_series: config.demographic_bound.as_ref().map(|b| b.series.clone()),
        };

        Ok(Self { vars, objective, constraints, index, context, warnings })
    }

    /// The keyed variable containers.
    #[inline] pub fn index(&self) -> &ModelIndex { &self.index }

    #[inline] pub fn context(&self) -> &ModelContext { &self.context }

    /// Non-fatal conditions found while building.
    #[inline] pub fn warnings(&self) -> &[ModelWarning] { &self.warnings }

    #[inline] pub fn constraint_count(&self) -> usize { self.constraints.len() }

    /// Equal-share population target.
    #[inline] pub fn target(&self) -> f64 { self.context.target }
}
