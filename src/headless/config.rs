//! JSON scenario parsing for headless runs
//!
//! Parses JSON scenario definitions: the player build, enemy placements,
//! interactable placements, and a timed script of injected damage and
//! intents standing in for the out-of-scope input and detection layers.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::combat::actions::ActionKind;
use crate::combat::health::HealthStats;

/// A scripted event injected at a fixed scenario time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Physical damage delivered to the player from an external source.
    DamagePlayer { amount: f32 },
    /// Mental damage delivered to the player.
    MentalDamagePlayer { amount: f32 },
    /// Physical damage delivered to an enemy by index.
    DamageEnemy { index: usize, amount: f32 },
    /// Mental damage delivered to an enemy by index.
    MentalDamageEnemy { index: usize, amount: f32 },
    /// Decoded movement intent; persists until replaced. Zero stops.
    MoveIntent { direction: [f32; 3] },
    /// Enter or leave weapon aiming.
    Aim { enabled: bool },
    /// Fire the equipped weapon.
    Attack,
    /// Explicit action start request (by name).
    StartAction { action: String },
    /// Release a held action (by name).
    StopAction { action: String },
}

/// One script step: what happens, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Scenario time in seconds at which the action fires.
    pub at: f32,
    pub action: ScriptAction,
}

/// Player definition for a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub position: [f32; 3],
    pub stats: HealthStats,
    #[serde(default = "default_attack_damage")]
    pub attack_damage: f32,
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
    #[serde(default = "default_player_speed")]
    pub move_speed: f32,
    /// Whether the player starts with a weapon already equipped.
    #[serde(default)]
    pub has_weapon: bool,
    /// Action kinds registered at spawn (default: all three).
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
}

/// Enemy definition for a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyConfig {
    #[serde(default)]
    pub position: [f32; 3],
    pub stats: HealthStats,
    /// Patrol waypoints; empty holds position.
    #[serde(default)]
    pub patrol: Vec<[f32; 3]>,
    #[serde(default = "default_detection_range")]
    pub detection_range: f32,
    #[serde(default = "default_enemy_attack_range")]
    pub attack_range: f32,
    #[serde(default = "default_enemy_attack_damage")]
    pub attack_damage: f32,
    #[serde(default = "default_enemy_attack_interval")]
    pub attack_interval: f32,
    #[serde(default = "default_enemy_speed")]
    pub move_speed: f32,
}

/// Interactable placement for a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractableConfig {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "default_interact_duration")]
    pub duration: f32,
    /// Effect name; currently only "weapon_pickup".
    #[serde(default = "default_effect")]
    pub effect: String,
}

/// Scenario configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub player: PlayerConfig,
    #[serde(default)]
    pub enemies: Vec<EnemyConfig>,
    #[serde(default)]
    pub interactables: Vec<InteractableConfig>,
    /// Timed injected facts and intents, sorted by time on load.
    #[serde(default)]
    pub script: Vec<ScriptStep>,
    /// Maximum scenario duration in seconds (default: 60)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Random seed for deterministic reproduction
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Custom output path for the encounter log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

fn default_name() -> String {
    "scenario".to_string()
}

fn default_max_duration() -> f32 {
    60.0
}

fn default_attack_damage() -> f32 {
    25.0
}

fn default_attack_range() -> f32 {
    6.0
}

fn default_player_speed() -> f32 {
    4.0
}

fn default_actions() -> Vec<String> {
    vec![
        "Resonance".to_string(),
        "Recover".to_string(),
        "Interact".to_string(),
    ]
}

fn default_detection_range() -> f32 {
    8.0
}

fn default_enemy_attack_range() -> f32 {
    1.5
}

fn default_enemy_attack_damage() -> f32 {
    10.0
}

fn default_enemy_attack_interval() -> f32 {
    1.0
}

fn default_enemy_speed() -> f32 {
    3.0
}

fn default_interact_duration() -> f32 {
    1.0
}

fn default_effect() -> String {
    "weapon_pickup".to_string()
}

impl ScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read scenario file: {}", e))?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(contents: &str) -> Result<Self, String> {
        let mut config: ScenarioConfig =
            serde_json::from_str(contents).map_err(|e| format!("Failed to parse JSON: {}", e))?;
        config.validate()?;
        config
            .script
            .sort_by(|a, b| a.at.total_cmp(&b.at));
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), String> {
        if self.max_duration_secs <= 0.0 {
            return Err("max_duration_secs must be positive".to_string());
        }

        validate_stats("player", &self.player.stats)?;
        for name in &self.player.actions {
            if ActionKind::from_name(name).is_none() {
                return Err(format!("unknown action {:?} in player.actions", name));
            }
        }

        for (i, enemy) in self.enemies.iter().enumerate() {
            validate_stats(&format!("enemies[{}]", i), &enemy.stats)?;
            if enemy.detection_range <= 0.0 || enemy.attack_range <= 0.0 {
                return Err(format!("enemies[{}] ranges must be positive", i));
            }
            if enemy.attack_interval <= 0.0 {
                return Err(format!("enemies[{}].attack_interval must be positive", i));
            }
        }

        for (i, object) in self.interactables.iter().enumerate() {
            if object.duration < 0.0 {
                return Err(format!("interactables[{}].duration must not be negative", i));
            }
            if object.effect != "weapon_pickup" {
                return Err(format!(
                    "interactables[{}] has unknown effect {:?}",
                    i, object.effect
                ));
            }
        }

        for (i, step) in self.script.iter().enumerate() {
            if step.at < 0.0 {
                return Err(format!("script[{}].at must not be negative", i));
            }
            match &step.action {
                ScriptAction::DamageEnemy { index, .. }
                | ScriptAction::MentalDamageEnemy { index, .. } => {
                    if *index >= self.enemies.len() {
                        return Err(format!(
                            "script[{}] targets enemy {} but only {} exist",
                            i,
                            index,
                            self.enemies.len()
                        ));
                    }
                }
                ScriptAction::StartAction { action } | ScriptAction::StopAction { action } => {
                    if ActionKind::from_name(action).is_none() {
                        return Err(format!("script[{}] names unknown action {:?}", i, action));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn validate_stats(who: &str, stats: &HealthStats) -> Result<(), String> {
    if stats.max_physical <= 0.0 {
        return Err(format!("{}.stats.max_physical must be positive", who));
    }
    if stats.max_mental <= 0.0 {
        return Err(format!("{}.stats.max_mental must be positive", who));
    }
    if stats.slot_value <= 0.0 {
        return Err(format!("{}.stats.slot_value must be positive", who));
    }
    if stats.slot_value > stats.max_mental {
        return Err(format!(
            "{}.stats.slot_value exceeds max_mental; no slot could ever be full",
            who
        ));
    }
    Ok(())
}
