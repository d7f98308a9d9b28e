//! Externally reported facts
//!
//! The core never performs spatial queries of its own. A detection
//! collaborator (the headless runner ships a reference implementation)
//! writes range and visibility facts into these components each tick, and an
//! input collaborator pushes decoded intents into the queue. Entities missing
//! these components degrade to safe defaults: nothing sensed, nothing
//! requested.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::actions::ActionKind;

/// Per-enemy facts about the player, as reported by the detection
/// collaborator.
#[derive(Component, Default, Clone, Debug)]
pub struct EnemyPerception {
    /// The player entity, when one is known to the collaborator.
    pub player: Option<Entity>,
    /// The player is inside this enemy's detection radius and targetable.
    pub player_detected: bool,
    /// The player is inside this enemy's attack radius.
    pub player_in_attack_range: bool,
    /// Last reported player position.
    pub player_position: Option<Vec3>,
}

/// Player-side facts: qualifying action targets currently in range,
/// nearest first.
#[derive(Component, Default, Clone, Debug)]
pub struct PlayerSenses {
    /// Downed enemies inside resonance range.
    pub resonance_targets: SmallVec<[Entity; 4]>,
    /// Living enemies inside weapon range.
    pub attack_targets: SmallVec<[Entity; 4]>,
    /// Closest interactable world object inside interaction range.
    pub nearest_interactable: Option<Entity>,
}

/// A decoded input intent. The core receives these already mapped; raw
/// device state never crosses the boundary.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Intent {
    /// Continuous movement direction; persists until replaced. Zero stops.
    Move(Vec3),
    /// Enter or leave weapon aiming.
    Aim(bool),
    /// Fire the equipped weapon (only effective while aiming).
    Attack,
    /// Explicitly request an action start.
    StartAction(ActionKind),
    /// Release a held action.
    StopAction(ActionKind),
}

/// Queue of intents delivered by the input collaborator, drained once per
/// tick at the top of the frame.
#[derive(Resource, Default, Debug)]
pub struct IntentQueue {
    pub intents: Vec<Intent>,
}

impl IntentQueue {
    pub fn push(&mut self, intent: Intent) {
        self.intents.push(intent);
    }

    pub fn drain(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.intents)
    }
}
