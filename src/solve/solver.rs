use std::{
    collections::BTreeMap,
    panic::{catch_unwind, AssertUnwindSafe},
    time::{Duration, Instant},
};

use good_lp::{solvers::coin_cbc::coin_cbc, ResolutionError, Solution, SolutionStatus, SolverModel};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{DistrictError, Result},
    model::{AssignKey, DistrictingModel, EdgeKey, ModelContext, ModelIndex, ModelWarning},
    solve::StoppingPolicy,
};

/// Values within this distance of 0 or 1 count as integral.
pub const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Terminal outcome of a solve. Infeasible and unbounded models are reported here, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    FeasibleSuboptimal,
    Infeasible,
    Unbounded,
    NotSolved,
}

impl SolveStatus {
    /// Whether variable values are available.
    #[inline]
    pub fn has_solution(&self) -> bool {
        matches!(self, Self::Optimal | Self::FeasibleSuboptimal)
    }
}

/// Solved variable values, keyed the same way as the model's variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolvedValues {
    pub assign: BTreeMap<AssignKey, f64>,
    pub cut: BTreeMap<EdgeKey, f64>,
    pub deviation: BTreeMap<u32, f64>,
    pub ratio: BTreeMap<u32, f64>,
    pub objective: f64,
}

impl SolvedValues {
    fn read(index: &ModelIndex, solution: &impl Solution) -> Self {
        Self {
            assign: index.assign.iter().map(|(k, &v)| (k.clone(), solution.value(v))).collect(),
            cut: index.cut.iter().map(|(k, &v)| (k.clone(), solution.value(v))).collect(),
            deviation: index.deviation.iter().map(|(&d, &v)| (d, solution.value(v))).collect(),
            ratio: index.ratio.iter().map(|(&d, &v)| (d, solution.value(v))).collect(),
            objective: 0.0,
        }
    }

    /// Whether every free unit sits in exactly one district (within tolerance).
    pub fn is_integral_assignment(&self, context: &ModelContext) -> bool {
        let near = |value: f64, target: f64| (value - target).abs() <= INTEGRALITY_TOLERANCE;
        self.assign.values().all(|&v| near(v, 0.0) || near(v, 1.0))
            && context.free.iter().all(|unit| {
                let total = (0..context.districts)
                    .filter_map(|d| self.assign.get(&AssignKey::new(unit.clone(), d)))
                    .sum::<f64>();
                near(total, 1.0)
            })
    }
}

/// Result of handing one model to the solver.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Present only when `status.has_solution()`.
    pub values: Option<SolvedValues>,
    pub context: ModelContext,
    pub warnings: Vec<ModelWarning>,
    pub elapsed: Duration,
}

/// Runs a districting model through the CBC backend.
#[derive(Debug, Clone, Default)]
pub struct Solver {
    policy: StoppingPolicy,
    verbose: bool,
    threads: Option<u32>,
}

impl Solver {
    pub fn new(policy: StoppingPolicy) -> Self { Self { policy, ..Self::default() } }

    /// Let the backend print its own log.
    pub fn verbose(mut self, verbose: bool) -> Self { self.verbose = verbose; self }

    pub fn threads(mut self, threads: u32) -> Self { self.threads = Some(threads); self }

    #[inline] pub fn policy(&self) -> &StoppingPolicy { &self.policy }

    /// Solve a model, blocking until the backend finishes or the stopping policy fires.
    /// The model is consumed; its variables cannot be reused by another solve.
    pub fn solve(&self, model: DistrictingModel) -> Result<SolveOutcome> {
        let DistrictingModel { vars, objective, constraints, index, context, warnings } = model;

        let mut problem = vars.minimise(objective.clone()).using(coin_cbc);
        if !self.verbose { problem.set_parameter("log", "0") }
        if let Some(limit) = self.policy.time_limit {
            problem.set_parameter("seconds", &limit.as_secs_f64().to_string());
        }
        if let Some(gap) = self.policy.relative_gap {
            problem.set_parameter("ratioGap", &gap.to_string());
        }
        if let Some(threads) = self.threads {
            problem.set_parameter("threads", &threads.to_string());
        }
        for constraint in constraints {
            problem = problem.with(constraint);
        }

        info!(event = "solve_start", variables = index.len(), time_limit = ?self.policy.time_limit, gap = ?self.policy.relative_gap);
        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| problem.solve()))
            .map_err(|_| DistrictError::SolverUnavailable("[solve] CBC backend panicked".to_string()))?;
        let elapsed = started.elapsed();

        let (status, values) = match result {
            Ok(solution) => {
                let mut values = SolvedValues::read(&index, &solution);
                values.objective = solution.eval(objective);
                match solution.status() {
                    SolutionStatus::Optimal => (SolveStatus::Optimal, Some(values)),
                    // Stopped early: only a complete incumbent counts as a solution.
                    _ if values.is_integral_assignment(&context) => (SolveStatus::FeasibleSuboptimal, Some(values)),
                    _ => (SolveStatus::NotSolved, None),
                }
            }
            Err(ResolutionError::Infeasible) => (SolveStatus::Infeasible, None),
            Err(ResolutionError::Unbounded) => (SolveStatus::Unbounded, None),
            Err(ResolutionError::Other(reason)) if is_stop(reason) => (SolveStatus::NotSolved, None),
            Err(ResolutionError::Str(reason)) if is_stop(&reason) => (SolveStatus::NotSolved, None),
            Err(err) => return Err(DistrictError::SolverUnavailable(format!("[solve] {err}"))),
        };

        info!(event = "solve_end", status = ?status, elapsed_ms = elapsed.as_millis() as u64);
        if let Some(values) = &values { debug!(objective = values.objective, "objective value") }

        Ok(SolveOutcome { status, values, context, warnings, elapsed })
    }
}

/// Backend messages that mean "stopped by the policy without a solution".
fn is_stop(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    reason.contains("stopped") || reason.contains("time") || reason.contains("limit")
}
