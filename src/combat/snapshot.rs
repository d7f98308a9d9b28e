//! Save/restore boundary
//!
//! Snapshots carry raw health values, the top-level state name, and the set
//! of registered actions. Derived values (tiers, slot counts) are never
//! stored; they are recomputed from the restored pools. The enemy behavioral
//! sub-mode is deliberately absent: a restored Normal enemy starts
//! patrolling.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::actions::{ActionController, ActionKind};
use super::enemy::EnemyState;
use super::health::{Exposed, HealthPool};
use super::player::PlayerState;
use super::state_machine::{MachineState, StateMachine};

/// Serializable entity state for persistence.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EntitySnapshot {
    pub current_physical: f32,
    pub max_physical: f32,
    pub current_mental: f32,
    pub max_mental: f32,
    pub slot_value: f32,
    /// Top-level state name as reported by the machine.
    pub state: String,
    /// Registered action kinds, restored verbatim.
    pub actions: Vec<ActionKind>,
}

/// Capture an entity's persistable state.
pub fn create_snapshot<S: MachineState>(
    pool: &HealthPool,
    machine: &StateMachine<S>,
    controller: Option<&ActionController>,
) -> EntitySnapshot {
    EntitySnapshot {
        current_physical: pool.current_physical,
        max_physical: pool.max_physical,
        current_mental: pool.current_mental,
        max_mental: pool.max_mental,
        slot_value: pool.slot_value,
        state: machine.current().name().to_string(),
        actions: controller
            .map(|c| c.registered().to_vec())
            .unwrap_or_default(),
    }
}

/// Write snapshot values back into a pool, clamping into `[0, max]`.
/// Rejects non-positive maxima.
fn restore_pool(snapshot: &EntitySnapshot, pool: &mut HealthPool) -> bool {
    if snapshot.max_physical <= 0.0 || snapshot.max_mental <= 0.0 || snapshot.slot_value <= 0.0 {
        warn!("snapshot rejected: non-positive pool maxima");
        return false;
    }
    pool.max_physical = snapshot.max_physical;
    pool.max_mental = snapshot.max_mental;
    pool.slot_value = snapshot.slot_value;
    pool.current_physical = snapshot.current_physical.clamp(0.0, snapshot.max_physical);
    pool.current_mental = snapshot.current_mental.clamp(0.0, snapshot.max_mental);
    true
}

/// Restore a player from a snapshot. Returns false (and changes nothing)
/// when the snapshot is invalid for this machine.
pub fn restore_player(
    snapshot: &EntitySnapshot,
    pool: &mut HealthPool,
    machine: &mut StateMachine<PlayerState>,
    controller: &mut ActionController,
    exposed: &mut Exposed,
) -> bool {
    let Some(state) = PlayerState::from_name(&snapshot.state) else {
        warn!("snapshot rejected: unknown player state {:?}", snapshot.state);
        return false;
    };
    if !restore_pool(snapshot, pool) {
        return false;
    }
    // The death latch is not stored separately; the state name carries it.
    pool.mentally_dead = state == PlayerState::TrueDeath;
    *machine = StateMachine::new(state);
    *controller = ActionController::new(&snapshot.actions);
    exposed.0 = state == PlayerState::Downed;
    true
}

/// Restore an enemy from a snapshot. The sub-mode always restores to
/// Patrol. A restored TrueDeath enemy needs its destruction countdown
/// reinserted by the caller.
pub fn restore_enemy(
    snapshot: &EntitySnapshot,
    pool: &mut HealthPool,
    machine: &mut StateMachine<EnemyState>,
    exposed: &mut Exposed,
) -> bool {
    let Some(state) = EnemyState::from_name(&snapshot.state) else {
        warn!("snapshot rejected: unknown enemy state {:?}", snapshot.state);
        return false;
    };
    if !restore_pool(snapshot, pool) {
        return false;
    }
    pool.mentally_dead = matches!(state, EnemyState::TrueDeath);
    *machine = StateMachine::new(state);
    exposed.0 = machine.is_in(EnemyState::Reviving);
    true
}
