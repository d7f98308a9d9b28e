//! CoreSim - Dual-Health Action Combat Core
//!
//! Runs a scripted encounter scenario headlessly and prints the result.

use std::process::ExitCode;

use coresim::cli;
use coresim::headless::{run_scenario, ScenarioConfig};

fn main() -> ExitCode {
    let args = cli::parse_args();

    let mut config = match ScenarioConfig::load_from_file(&args.scenario) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading scenario: {}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Some(output) = &args.output {
        config.output_path = Some(output.display().to_string());
    }
    if let Some(max_duration) = args.max_duration {
        config.max_duration_secs = max_duration;
    }
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }

    println!("Running scenario {:?}...", config.name);
    println!("  Enemies: {}", config.enemies.len());
    println!("  Max duration: {:.0}s", config.max_duration_secs);
    if let Some(seed) = config.random_seed {
        println!("  Seed: {}", seed);
    }

    match run_scenario(config) {
        Ok(result) => {
            println!(
                "Scenario finished after {:.2}s: {}",
                result.elapsed,
                result.outcome.name()
            );
            println!(
                "  Player: {} ({:.1}/{:.1} physical, {:.1}/{:.1} mental)",
                result.player_state,
                result.player.current_physical,
                result.player.max_physical,
                result.player.current_mental,
                result.player.max_mental
            );
            for enemy in &result.enemies {
                println!(
                    "  Enemy {}: {} ({:.1} physical, {:.1} mental)",
                    enemy.id, enemy.state, enemy.final_physical, enemy.final_mental
                );
            }
            println!("  Log entries: {}", result.log_entries);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Scenario failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
