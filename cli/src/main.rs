mod cli;
mod commands;
mod logging;

use cli::{Cli, Commands};
use commands::{basemaps, bounds, query, style, tables};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    logging::init(cli.verbose);
    match &cli.command {
        Commands::Tables(args) => tables::run(&cli, args),
        Commands::Query(args) => query::run(&cli, args),
        Commands::Bounds(args) => bounds::run(&cli, args),
        Commands::Style(args) => style::run(&cli, args),
        Commands::Basemaps(args) => basemaps::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
