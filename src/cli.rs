//! Command-line interface for CoreSim
//!
//! Scenario runs are always headless; rendering lives outside this crate.

use clap::Parser;
use std::path::PathBuf;

/// Dual-health combat core simulator
#[derive(Parser, Debug)]
#[command(name = "coresim")]
#[command(about = "Dual-health combat core simulator")]
#[command(version)]
pub struct Args {
    /// JSON scenario file to run
    #[arg(long, value_name = "SCENARIO_FILE")]
    pub scenario: PathBuf,

    /// Output path for the encounter log
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Override the scenario's maximum duration in seconds
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Override the scenario's random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn parse_args() -> Args {
    Args::parse()
}
