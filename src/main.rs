// src/main.rs

use clap::Parser;
use log::LevelFilter;

use tracksplit::Cli;
use tracksplit::config::Task;
use tracksplit::{analyser, cutter};

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Info } else { LevelFilter::Warn };
    pretty_env_logger::formatted_builder().filter_level(level).init();

    let config = cli.into_config()?;
    match config.task {
        Task::Cut => cutter::run(&config),
        Task::Analyse => analyser::run(&config),
    }
}
