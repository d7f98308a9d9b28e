//! Data-driven combat tuning
//!
//! Tuning values for actions, damage scaling, revival, and destruction are
//! loaded from `assets/config/actions.ron` so balance changes do not require
//! recompilation. The file ships with the crate and is also embedded as a
//! fallback for environments that run without an assets directory.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::health::DamageTuning;

const DEFAULT_CONFIG_PATH: &str = "assets/config/actions.ron";
const EMBEDDED_CONFIG: &str = include_str!("../../assets/config/actions.ron");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoverTuning {
    /// Seconds between slot consumptions while the action is held.
    pub tick_interval: f32,
    /// Physical health restored per consumed slot.
    pub heal_per_slot: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResonanceTuning {
    /// Floor below which a flickering target cannot end the action.
    pub min_duration: f32,
    /// Safety timeout; completing the full duration finishes off the target.
    pub max_duration: f32,
    /// Range within which a downed enemy qualifies as a target.
    pub range: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InteractTuning {
    /// Range within which world objects can be interacted with.
    pub range: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevivalTuning {
    /// Physical health restored per second while downed and mentally alive.
    pub restore_rate: f32,
    /// Physical-damage grace window granted on revival completion.
    pub invulnerability_duration: f32,
}

/// All tunable combat values. Present as a resource before any combat system
/// runs.
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
pub struct ActionTuning {
    pub recover: RecoverTuning,
    pub resonance: ResonanceTuning,
    pub interact: InteractTuning,
    pub damage: DamageTuning,
    pub revival: RevivalTuning,
    /// Delay between an enemy's true death and its removal from the world.
    pub destruction_delay: f32,
}

impl Default for ActionTuning {
    fn default() -> Self {
        ron::from_str(EMBEDDED_CONFIG).expect("embedded actions.ron must parse")
    }
}

impl ActionTuning {
    /// Load tuning from a RON file.
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read tuning file: {}", e))?;
        let tuning: ActionTuning =
            ron::from_str(&contents).map_err(|e| format!("Failed to parse RON: {}", e))?;
        tuning.validate()?;
        Ok(tuning)
    }

    fn validate(&self) -> Result<(), String> {
        if self.recover.tick_interval <= 0.0 {
            return Err("recover.tick_interval must be positive".to_string());
        }
        if self.recover.heal_per_slot <= 0.0 {
            return Err("recover.heal_per_slot must be positive".to_string());
        }
        if self.resonance.min_duration < 0.0 {
            return Err("resonance.min_duration must not be negative".to_string());
        }
        if self.resonance.max_duration <= self.resonance.min_duration {
            return Err("resonance.max_duration must exceed min_duration".to_string());
        }
        if self.resonance.range <= 0.0 || self.interact.range <= 0.0 {
            return Err("action ranges must be positive".to_string());
        }
        if self.damage.low_mental_multiplier < 1.0 || self.damage.empty_mental_multiplier < 1.0 {
            return Err("exposed-core multipliers must be at least 1.0".to_string());
        }
        if self.revival.restore_rate <= 0.0 {
            return Err("revival.restore_rate must be positive".to_string());
        }
        if self.destruction_delay < 0.0 {
            return Err("destruction_delay must not be negative".to_string());
        }
        Ok(())
    }
}

/// Plugin that loads [`ActionTuning`] into the app.
///
/// Tries the on-disk config first and falls back to the embedded copy, so a
/// missing assets directory degrades with a warning instead of failing.
pub struct ActionConfigPlugin {
    pub config_path: Option<PathBuf>,
}

impl Default for ActionConfigPlugin {
    fn default() -> Self {
        Self { config_path: None }
    }
}

impl Plugin for ActionConfigPlugin {
    fn build(&self, app: &mut App) {
        if app.world().contains_resource::<ActionTuning>() {
            warn!("ActionTuning already loaded; skipping duplicate config init");
            return;
        }
        let path = self
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let tuning = match ActionTuning::load_from_file(&path) {
            Ok(tuning) => {
                info!("Loaded combat tuning from {}", path.display());
                tuning
            }
            Err(err) => {
                warn!(
                    "Could not load {} ({}); using embedded tuning",
                    path.display(),
                    err
                );
                ActionTuning::default()
            }
        };
        app.insert_resource(tuning);
    }
}
