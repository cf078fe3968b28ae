//! chromapipe - per-character highlighting through an external coprocess.

mod cli;

use anyhow::Result;
use chromapipe::logger;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match &cli.command {
        Commands::Classify { faults } => cli::classify::run_classify(*faults),
        Commands::Render {
            file,
            wait,
            coprocess,
        } => {
            let config = cli::load_config(&cli, coprocess)?;
            cli::render::run_render(config, file.as_deref(), Duration::from_millis(*wait))
        }
        Commands::Edit { coprocess } => {
            let config = cli::load_config(&cli, coprocess)?;
            cli::edit::run_edit(config)
        }
    }
}
