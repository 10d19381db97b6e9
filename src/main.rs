//! Binaural CLI - Binaural-Beat Session Engine
//!
//! Command-line interface for parsing, playing and exporting sessions.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use binaural::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; `log` records from the library are captured too
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Binaural v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_config(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Some(cmd) => handle_command(cmd, config),
        None => {
            println!("Binaural v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: binaural::SessionConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Parse { instructions, json } => {
            commands::parse_instructions(&instructions, json).context("parsing instructions")
        }
        Commands::Play {
            instructions,
            speed,
            base_tone,
        } => commands::play(config, &instructions, speed, base_tone).context("playback failed"),
        Commands::Export {
            instructions,
            output_dir,
            base_tone,
        } => commands::export(config, &instructions, &output_dir, base_tone)
            .with_context(|| format!("export to {} failed", output_dir.display())),
    }
}
