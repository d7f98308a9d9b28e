//! CoreSim - Dual-Health Action Combat Core
//!
//! A simulation core for an action game built around a dual health model:
//! a physical pool whose depletion downs an entity recoverably, and a
//! mental pool whose depletion is final. Downed entities revive over time
//! with their core exposed; the player can channel into a downed enemy's
//! core to destroy it outright.
//!
//! This library exposes the combat core and the headless scenario runner
//! for testing and reuse.

pub mod cli;
pub mod combat;
pub mod headless;

// Re-export commonly used types
pub use combat::log::{EncounterLog, LogEventType};
pub use combat::CombatPlugin;
pub use headless::{run_scenario, ScenarioConfig, ScenarioResult};
