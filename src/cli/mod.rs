//! CLI Module
//!
//! Command-line interface for parsing, playing and exporting sessions.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Binaural beat session player and exporter
#[derive(Parser, Debug)]
#[command(name = "binaural")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON session configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse instructions and show the resulting segments
    #[command(name = "parse")]
    Parse {
        /// Instructions, e.g. "10 to 7hz 1 hr, 4hz 30min"
        instructions: String,

        /// Print the timeline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a session on the software engine, printing live events
    #[command(name = "play")]
    Play {
        /// Instructions, e.g. "10 to 7hz 1 hr, 4hz 30min"
        instructions: String,

        /// Run the session clock this many times faster than realtime
        #[arg(short, long, default_value_t = 1.0)]
        speed: f64,

        /// Carrier tone in Hz
        #[arg(short, long)]
        base_tone: Option<f64>,
    },

    /// Export a session as WAV file(s)
    #[command(name = "export")]
    Export {
        /// Instructions, e.g. "10 to 7hz 1 hr, 4hz 30min"
        instructions: String,

        /// Directory the WAV files are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Carrier tone in Hz
        #[arg(short, long)]
        base_tone: Option<f64>,
    },
}
