//! graph-search-agent binary entry point.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use graph_search_agent::cli::{Cli, execute};

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("graph_search_agent=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

#[allow(clippy::print_stdout)]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = execute(&cli).context("graph-search-agent failed")?;
    print!("{output}");
    Ok(())
}
