use std::time::Duration;

use anyhow::{bail, Context, Result};
use districtor::{config::ScenarioConfig, DistrictingModel, ObjectiveMode, Plan, Solver};

use crate::cli::{Objective, SolveArgs};

/// Command-line flags take precedence over the scenario file.
fn apply_overrides(scenario: &mut ScenarioConfig, args: &SolveArgs) -> Result<()> {
    if let Some(k) = args.districts { scenario.districts = k }
    if let Some(objective) = args.objective {
        scenario.objective = match objective {
            Objective::Deviation => ObjectiveMode::MinimizeTotalDeviation,
            Objective::CutEdges => ObjectiveMode::MinimizeCutEdges,
        };
    }
    if let Some(lower) = args.lower { scenario.tolerance.lower = lower }
    if let Some(upper) = args.upper { scenario.tolerance.upper = upper }

    if args.time_limit.is_some() || args.gap.is_some() {
        let mut policy = scenario.stopping_policy();
        if let Some(secs) = args.time_limit {
            let limit = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("[districtor] Invalid time limit: {secs}"))?;
            policy = policy.with_time_limit(limit);
        }
        if let Some(gap) = args.gap { policy = policy.with_relative_gap(gap) }
        scenario.stopping = Some(policy);
    }
    Ok(())
}

pub fn run(cli: &crate::cli::Cli, args: &SolveArgs) -> Result<()> {
    for path in args.assignments.iter().chain(&args.stats) {
        super::check_output(path, args.force)?;
    }

    let mut scenario = ScenarioConfig::load_or_default(args.inputs.config.as_deref())?;
    apply_overrides(&mut scenario, args)?;

    let (registry, graph) = super::load_inputs(&args.inputs, &scenario)?;

    let model = DistrictingModel::build(&registry, &graph, &scenario.model_config())
        .context("[districtor] Failed to build districting model")?;
    for warning in model.warnings() {
        eprintln!("warning: {warning}");
    }

    let solver = Solver::new(scenario.stopping_policy()).verbose(cli.verbose > 1);
    let outcome = solver.solve(model)?;

    let Some(plan) = Plan::extract(&outcome, &registry, &graph)? else {
        bail!("[districtor] No plan found: solver status {:?}", outcome.status);
    };

    println!("{}", plan.report());

    if let Some(path) = &args.assignments {
        tracing::info!(path = %path.display(), "writing assignments");
        plan.write_assignments_csv(path)?;
    }
    if let Some(path) = &args.stats {
        tracing::info!(path = %path.display(), "writing district statistics");
        plan.write_stats_json(path)?;
    }

    Ok(())
}
