//! Headless scenario execution
//!
//! Runs scripted combat encounters without any graphical output, suitable
//! for automated testing and tuning work.
//!
//! ## Usage
//!
//! ```bash
//! # Run a scenario
//! cargo run --release -- --scenario scenario.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "name": "revive_drill",
//!   "player": { "stats": { "max_physical": 100.0, "max_mental": 100.0, "slot_value": 30.0 } },
//!   "enemies": [],
//!   "script": [
//!     { "at": 1.0, "action": { "type": "damage_player", "amount": 100.0 } }
//!   ],
//!   "max_duration_secs": 30
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::ScenarioConfig;
pub use runner::{run_scenario, EnemyResult, ScenarioOutcome, ScenarioResult};
