use std::path::PathBuf;

/// County districting CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "districtor", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build and solve the districting model, then report the plan
    Solve(SolveArgs),

    /// Print adjacency graph diagnostics (isolated units, asymmetric pairs)
    Graph(GraphArgs),
}

#[derive(clap::Args, Debug)]
pub struct InputArgs {
    /// Unit records CSV (geo_id or state/county codes, name, population, ...)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub units: PathBuf,

    /// Tab-separated county adjacency table
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub adjacency: PathBuf,

    /// Scenario TOML; defaults apply when omitted or missing
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Objective {
    /// Minimize total population deviation from the target
    Deviation,
    /// Minimize the number of adjacent pairs split across districts
    CutEdges,
}

#[derive(clap::Args, Debug)]
pub struct SolveArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Number of districts
    #[arg(short = 'k', long)]
    pub districts: Option<u32>,

    /// Secondary objective
    #[arg(long, value_enum)]
    pub objective: Option<Objective>,

    /// Lower edge of the balance band, as a multiple of the target
    #[arg(long)]
    pub lower: Option<f64>,

    /// Upper edge of the balance band, as a multiple of the target
    #[arg(long)]
    pub upper: Option<f64>,

    /// Solver time limit in seconds
    #[arg(long)]
    pub time_limit: Option<f64>,

    /// Relative optimality gap at which the solver may stop, e.g. 0.02
    #[arg(long)]
    pub gap: Option<f64>,

    /// Output unit → district CSV
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub assignments: Option<PathBuf>,

    /// Output per-district statistics JSON
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub stats: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
}
