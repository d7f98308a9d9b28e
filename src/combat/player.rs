//! Player state graph, intents, and revival
//!
//! The player's top-level states: free movement, weapon aiming, an
//! interaction in progress, the downed window after physical death, and the
//! terminal true death. Decoded input intents arrive through the
//! [`IntentQueue`](super::detection::IntentQueue) and are routed onto player
//! components at the top of the tick.

use bevy::prelude::*;

use super::action_config::ActionTuning;
use super::actions::{ActionController, ActiveAction};
use super::detection::{Intent, IntentQueue, PlayerSenses};
use super::events::{
    ActionEndReason, ActionEndedEvent, DamageEvent, HealthAxis, HealthChangedEvent,
    StateChangedEvent,
};
use super::health::{Exposed, HealthPool, InvulnerabilityTimer, TierWatch};
use super::interact::Interactable;
use super::state_machine::{transition, MachineState, StateMachine};

/// Marker for the player entity.
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct Player;

/// Top-level player states.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerState {
    Normal,
    /// Weapon raised; movement allowed, attacks enabled.
    Aiming,
    /// An interaction is running; entered and exited by the Interact action.
    Interacting,
    /// Physically dead with mental health remaining. Revival counts up here.
    Downed,
    /// Terminal. No transitions out.
    TrueDeath,
}

impl MachineState for PlayerState {
    fn name(&self) -> &'static str {
        match self {
            PlayerState::Normal => "Normal",
            PlayerState::Aiming => "Aiming",
            PlayerState::Interacting => "Interacting",
            PlayerState::Downed => "Downed",
            PlayerState::TrueDeath => "TrueDeath",
        }
    }

    fn can_transition(from: Self, to: Self) -> bool {
        use PlayerState::*;
        match (from, to) {
            (TrueDeath, _) => false,
            // Mental collapse ends any other state.
            (_, TrueDeath) => true,
            (Normal, Aiming) | (Normal, Interacting) | (Normal, Downed) => true,
            (Aiming, Normal) | (Aiming, Downed) => true,
            (Interacting, Normal) | (Interacting, Downed) => true,
            (Downed, Normal) => true,
            _ => false,
        }
    }
}

impl PlayerState {
    /// Inverse of [`MachineState::name`], used when restoring snapshots.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Normal" => Some(PlayerState::Normal),
            "Aiming" => Some(PlayerState::Aiming),
            "Interacting" => Some(PlayerState::Interacting),
            "Downed" => Some(PlayerState::Downed),
            "TrueDeath" => Some(PlayerState::TrueDeath),
            _ => None,
        }
    }
}

/// What the player carries. Aiming requires a weapon; the starter scenario
/// grants one through the weapon-pickup interactable.
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct Equipment {
    pub has_weapon: bool,
}

/// Damage and reach of the player's equipped weapon.
#[derive(Component, Clone, Copy, Debug)]
pub struct AttackStats {
    pub damage: f32,
    pub range: f32,
}

impl Default for AttackStats {
    fn default() -> Self {
        Self {
            damage: 25.0,
            range: 6.0,
        }
    }
}

/// Movement speed in units per second.
#[derive(Component, Clone, Copy, Debug)]
pub struct MoveSpeed(pub f32);

impl Default for MoveSpeed {
    fn default() -> Self {
        Self(4.0)
    }
}

/// Decoded-intent state routed from the queue each tick. Movement persists
/// until replaced; aim is level-triggered; attack is edge-triggered.
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct PlayerIntents {
    pub move_dir: Vec3,
    pub wants_aim: bool,
    pub attack_queued: bool,
}

/// Drain the intent queue onto the player's components. Runs first in the
/// tick so every downstream system sees this frame's input.
pub fn apply_intents(
    mut queue: ResMut<IntentQueue>,
    mut players: Query<(&mut PlayerIntents, &mut ActionController), With<Player>>,
) {
    let intents = queue.drain();
    if intents.is_empty() {
        return;
    }
    let Ok((mut state, mut controller)) = players.get_single_mut() else {
        debug!("dropping {} intents with no player present", intents.len());
        return;
    };
    for intent in intents {
        match intent {
            Intent::Move(dir) => state.move_dir = dir,
            Intent::Aim(enabled) => state.wants_aim = enabled,
            Intent::Attack => state.attack_queued = true,
            Intent::StartAction(kind) => controller.request_start(kind),
            Intent::StopAction(kind) => controller.request_stop(kind),
        }
    }
}

/// Intent-driven player movement. Suppressed while an active action blocks
/// movement and in states that do not move at all.
pub fn player_movement(
    time: Res<Time>,
    mut players: Query<
        (
            &mut Transform,
            &PlayerIntents,
            &MoveSpeed,
            &StateMachine<PlayerState>,
            &ActionController,
        ),
        With<Player>,
    >,
) {
    let dt = time.delta_secs();
    for (mut transform, intents, speed, machine, controller) in players.iter_mut() {
        let moving_state =
            machine.is_in(PlayerState::Normal) || machine.is_in(PlayerState::Aiming);
        if !moving_state || controller.is_blocking() {
            continue;
        }
        let dir = intents.move_dir.normalize_or_zero();
        transform.translation += dir * speed.0 * dt;
    }
}

/// Player state logic: aim transitions, attacks, death transitions, and the
/// revival countback while downed.
///
/// Runs after damage application so death transitions react to this tick's
/// damage. Mental collapse is checked before revival completion, so a
/// same-tick race always resolves to true death.
#[allow(clippy::too_many_arguments)]
pub fn player_state_update(
    time: Res<Time>,
    tuning: Res<ActionTuning>,
    mut commands: Commands,
    mut players: Query<
        (
            Entity,
            &mut StateMachine<PlayerState>,
            &mut HealthPool,
            &mut PlayerIntents,
            &mut ActionController,
            &mut Exposed,
            &Equipment,
            &AttackStats,
            Option<&PlayerSenses>,
        ),
        With<Player>,
    >,
    mut interactables: Query<&mut Interactable>,
    mut state_events: EventWriter<StateChangedEvent>,
    mut damage_events: EventWriter<DamageEvent>,
    mut health_events: EventWriter<HealthChangedEvent>,
    mut ended_events: EventWriter<ActionEndedEvent>,
) {
    let dt = time.delta_secs();

    for (
        entity,
        mut machine,
        mut pool,
        mut intents,
        mut controller,
        mut exposed,
        equipment,
        attack,
        senses,
    ) in players.iter_mut()
    {
        machine.update(dt);

        // Mental collapse always wins, whatever else this tick holds.
        if !pool.is_mentally_alive() && !machine.is_in(PlayerState::TrueDeath) {
            cancel_action(entity, &mut controller, &mut interactables, &mut ended_events);
            transition(&mut machine, PlayerState::TrueDeath, entity, &mut state_events);
            exposed.0 = false;
            continue;
        }

        match machine.current() {
            PlayerState::TrueDeath => {}
            PlayerState::Downed => {
                // Revival restores physical health at an absolute rate so it
                // completes even with zero passive regen.
                let restored =
                    pool.heal(HealthAxis::Physical, tuning.revival.restore_rate * dt);
                if restored > 0.0 {
                    health_events.send(HealthChangedEvent {
                        entity,
                        axis: HealthAxis::Physical,
                        delta: restored,
                        current: pool.current_physical,
                        max: pool.max_physical,
                    });
                }
                if pool.current_physical >= pool.max_physical {
                    transition(&mut machine, PlayerState::Normal, entity, &mut state_events);
                    exposed.0 = false;
                    commands.entity(entity).insert(InvulnerabilityTimer {
                        remaining: tuning.revival.invulnerability_duration,
                    });
                    info!("player revived with {:.1}s grace", tuning.revival.invulnerability_duration);
                }
            }
            state => {
                // Physical death from any living state opens the downed
                // window. The death event itself was emitted with the damage.
                if !pool.is_physically_alive() {
                    cancel_action(entity, &mut controller, &mut interactables, &mut ended_events);
                    transition(&mut machine, PlayerState::Downed, entity, &mut state_events);
                    exposed.0 = true;
                    intents.move_dir = Vec3::ZERO;
                    intents.wants_aim = false;
                    continue;
                }

                // Aim is level-triggered and guarded by an equipped weapon.
                match state {
                    PlayerState::Normal if intents.wants_aim => {
                        if equipment.has_weapon {
                            transition(&mut machine, PlayerState::Aiming, entity, &mut state_events);
                        } else {
                            debug!("aim requested without a weapon");
                            intents.wants_aim = false;
                        }
                    }
                    PlayerState::Aiming if !intents.wants_aim => {
                        transition(&mut machine, PlayerState::Normal, entity, &mut state_events);
                    }
                    _ => {}
                }

                // Attacks only land while aiming, against detected targets.
                if intents.attack_queued {
                    intents.attack_queued = false;
                    if machine.is_in(PlayerState::Aiming) {
                        let target = senses.and_then(|s| s.attack_targets.first().copied());
                        if let Some(target) = target {
                            damage_events.send(DamageEvent {
                                target,
                                source: Some(entity),
                                axis: HealthAxis::Physical,
                                amount: attack.damage,
                            });
                        } else {
                            debug!("attack with no target in range");
                        }
                    }
                }
            }
        }

        // Keep the vitals phase's decay flag in sync with the downed window.
        let downed = machine.is_in(PlayerState::Downed);
        if exposed.0 != downed {
            exposed.0 = downed;
        }
    }
}

/// Cancel whatever action is running as part of a death transition. A
/// cancelled Interact must also release its world object, or the object
/// stays flagged in-progress and can never be used again.
fn cancel_action(
    entity: Entity,
    controller: &mut ActionController,
    interactables: &mut Query<&mut Interactable>,
    ended_events: &mut EventWriter<ActionEndedEvent>,
) {
    let target = match controller.active() {
        Some(ActiveAction::Interact(run)) => Some(run.target),
        _ => None,
    };
    if let Some(kind) = controller.cancel_current() {
        if let Some(target) = target {
            if let Ok(mut object) = interactables.get_mut(target) {
                object.cancel_interaction();
            }
        }
        ended_events.send(ActionEndedEvent {
            entity,
            action: kind,
            reason: ActionEndReason::Cancelled,
        });
    }
}

/// Spawn bundle for the player.
#[derive(Bundle)]
pub struct PlayerBundle {
    pub player: Player,
    pub transform: Transform,
    pub pool: HealthPool,
    pub tier_watch: TierWatch,
    pub machine: StateMachine<PlayerState>,
    pub controller: ActionController,
    pub intents: PlayerIntents,
    pub equipment: Equipment,
    pub attack: AttackStats,
    pub speed: MoveSpeed,
    pub exposed: Exposed,
    pub senses: PlayerSenses,
}
