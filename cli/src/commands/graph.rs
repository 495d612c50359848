use anyhow::Result;
use districtor::config::ScenarioConfig;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::GraphArgs) -> Result<()> {
    let scenario = ScenarioConfig::load_or_default(args.inputs.config.as_deref())?;
    let (registry, graph) = super::load_inputs(&args.inputs, &scenario)?;

    println!("Units: {}", registry.len());
    println!("Excluded: {}", registry.excluded().len());
    for exclusion in registry.excluded().iter() {
        println!("  {} ({})", exclusion.id, exclusion.reason);
    }
    println!("Adjacent pairs: {}", graph.edge_count());

    let isolated = graph.isolated().collect::<Vec<_>>();
    println!("Isolated units: {}", isolated.len());
    for id in isolated {
        let name = registry.get(id).map(|u| u.name()).unwrap_or_default();
        println!("  {id} {name}");
    }

    let asymmetric = graph.asymmetric_pairs();
    println!("Asymmetric pairs: {}", asymmetric.len());
    for (a, b) in asymmetric {
        println!("  {a} -> {b}");
    }

    Ok(())
}
