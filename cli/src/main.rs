mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{graph, solve};
use tracing_subscriber::EnvFilter;

/// Log level from `-v` count, unless RUST_LOG says otherwise.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("districtor={level},districtor_cli={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match &cli.command {
        Commands::Solve(args) => solve::run(&cli, args),
        Commands::Graph(args) => graph::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
