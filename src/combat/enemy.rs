//! Enemy state graph, AI modes, and destruction
//!
//! Enemies share the dual health model with the player. The outer machine
//! only knows Normal, Reviving, and TrueDeath; the behavioral mode (patrol,
//! chase, combat) is a payload inside Normal, driven purely by detection
//! facts, and is deliberately not part of the persisted state.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::action_config::ActionTuning;
use super::detection::EnemyPerception;
use super::events::{
    DamageEvent, HealthAxis, HealthChangedEvent, StateChangedEvent,
};
use super::health::{Exposed, HealthPool, InvulnerabilityTimer};
use super::player::Player;
use super::rng::GameRng;
use super::state_machine::{transition, MachineState, StateMachine};

/// Marker for enemy entities.
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct Enemy;

/// Stable scenario-level identifier, used in results reporting.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug)]
pub struct EnemyId(pub usize);

/// Behavioral sub-mode while an enemy is in its Normal state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EnemyMode {
    #[default]
    Patrol,
    Chase,
    Combat,
}

impl EnemyMode {
    pub fn name(&self) -> &'static str {
        match self {
            EnemyMode::Patrol => "Patrol",
            EnemyMode::Chase => "Chase",
            EnemyMode::Combat => "Combat",
        }
    }
}

/// Top-level enemy states. Transitions validate the variant only; the
/// Normal payload changes through `set_sub_state`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EnemyState {
    Normal(EnemyMode),
    /// Physically dead, core exposed, revival in progress.
    Reviving,
    /// Terminal; the destruction countdown runs here.
    TrueDeath,
}

impl MachineState for EnemyState {
    fn name(&self) -> &'static str {
        match self {
            EnemyState::Normal(_) => "Normal",
            EnemyState::Reviving => "Reviving",
            EnemyState::TrueDeath => "TrueDeath",
        }
    }

    fn can_transition(from: Self, to: Self) -> bool {
        use EnemyState::*;
        match (from, to) {
            (TrueDeath, _) => false,
            (_, TrueDeath) => true,
            (Normal(_), Reviving) => true,
            (Reviving, Normal(_)) => true,
            _ => false,
        }
    }
}

impl EnemyState {
    /// Inverse of [`MachineState::name`] for snapshot restore. The sub-mode
    /// is not persisted; a restored Normal always starts patrolling.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Normal" => Some(EnemyState::Normal(EnemyMode::Patrol)),
            "Reviving" => Some(EnemyState::Reviving),
            "TrueDeath" => Some(EnemyState::TrueDeath),
            _ => None,
        }
    }

    pub fn mode(&self) -> Option<EnemyMode> {
        match self {
            EnemyState::Normal(mode) => Some(*mode),
            _ => None,
        }
    }
}

/// Attack tuning and cooldown for an enemy in Combat mode.
#[derive(Component, Clone, Debug)]
pub struct EnemyCombat {
    pub attack_damage: f32,
    pub attack_interval: f32,
    pub attack_timer: f32,
}

impl EnemyCombat {
    pub fn new(attack_damage: f32, attack_interval: f32) -> Self {
        Self {
            attack_damage,
            attack_interval,
            // First swing lands after a full interval.
            attack_timer: attack_interval,
        }
    }
}

/// Waypoint loop walked while patrolling. Empty routes hold position.
#[derive(Component, Clone, Debug, Default)]
pub struct PatrolRoute {
    pub waypoints: SmallVec<[Vec3; 8]>,
    pub current: usize,
}

impl PatrolRoute {
    const ARRIVAL_TOLERANCE: f32 = 0.25;

    pub fn new(waypoints: impl IntoIterator<Item = Vec3>) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
            current: 0,
        }
    }

    pub fn target(&self) -> Option<Vec3> {
        self.waypoints.get(self.current).copied()
    }

    fn advance(&mut self) {
        if !self.waypoints.is_empty() {
            self.current = (self.current + 1) % self.waypoints.len();
        }
    }
}

/// Movement speed in units per second.
#[derive(Component, Clone, Copy, Debug)]
pub struct EnemySpeed(pub f32);

impl Default for EnemySpeed {
    fn default() -> Self {
        Self(3.0)
    }
}

/// Counts down from true death to removal from the world.
#[derive(Component, Clone, Copy, Debug)]
pub struct DestructionCountdown {
    remaining: f32,
}

impl DestructionCountdown {
    pub fn new(delay: f32) -> Self {
        Self {
            remaining: delay.max(0.0),
        }
    }

    pub fn time_remaining(&self) -> f32 {
        self.remaining.max(0.0)
    }

    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// Tick destruction countdowns (timer phase).
pub fn tick_destruction(time: Res<Time>, mut countdowns: Query<&mut DestructionCountdown>) {
    let dt = time.delta_secs();
    for mut countdown in countdowns.iter_mut() {
        countdown.remaining -= dt;
    }
}

/// Enemy steering (movement phase). Reads the mode decided last tick; mode
/// switching itself happens in the state-update phase.
pub fn enemy_movement(
    time: Res<Time>,
    mut rng: ResMut<GameRng>,
    mut enemies: Query<
        (
            &mut Transform,
            &mut PatrolRoute,
            &EnemySpeed,
            &StateMachine<EnemyState>,
            &EnemyPerception,
        ),
        (With<Enemy>, Without<Player>),
    >,
) {
    let dt = time.delta_secs();
    for (mut transform, mut route, speed, machine, perception) in enemies.iter_mut() {
        let Some(mode) = machine.current().mode() else {
            continue;
        };
        match mode {
            EnemyMode::Patrol => {
                let Some(target) = route.target() else {
                    continue;
                };
                let to_target = target - transform.translation;
                if to_target.length() <= PatrolRoute::ARRIVAL_TOLERANCE {
                    route.advance();
                    continue;
                }
                // Slight wander keeps patrol paths from being perfectly
                // straight lines; seeded, so runs stay reproducible.
                let wander = Vec3::new(rng.offset(0.2), 0.0, rng.offset(0.2));
                let dir = (to_target.normalize_or_zero() + wander).normalize_or_zero();
                transform.translation += dir * speed.0 * dt;
            }
            EnemyMode::Chase => {
                let Some(player_pos) = perception.player_position else {
                    continue;
                };
                let dir = (player_pos - transform.translation).normalize_or_zero();
                transform.translation += dir * speed.0 * dt;
            }
            EnemyMode::Combat => {}
        }
    }
}

/// Enemy state logic: mode switching from detection facts, combat attacks,
/// death transitions, and revival.
///
/// Mirrors the player's ordering rules: mental collapse is checked first,
/// so it wins over revival completion within the same tick.
pub fn enemy_state_update(
    time: Res<Time>,
    tuning: Res<ActionTuning>,
    mut commands: Commands,
    mut rng: ResMut<GameRng>,
    mut enemies: Query<
        (
            Entity,
            &mut StateMachine<EnemyState>,
            &mut HealthPool,
            &mut EnemyCombat,
            &mut Exposed,
            &EnemyPerception,
        ),
        (With<Enemy>, Without<Player>),
    >,
    mut state_events: EventWriter<StateChangedEvent>,
    mut damage_events: EventWriter<DamageEvent>,
    mut health_events: EventWriter<HealthChangedEvent>,
) {
    let dt = time.delta_secs();

    for (entity, mut machine, mut pool, mut combat, mut exposed, perception) in
        enemies.iter_mut()
    {
        machine.update(dt);

        if !pool.is_mentally_alive() && !machine.is_in(EnemyState::TrueDeath) {
            transition(&mut machine, EnemyState::TrueDeath, entity, &mut state_events);
            exposed.0 = false;
            commands
                .entity(entity)
                .insert(DestructionCountdown::new(tuning.destruction_delay));
            continue;
        }

        match machine.current() {
            EnemyState::TrueDeath => {}
            EnemyState::Reviving => {
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
                    transition(
                        &mut machine,
                        EnemyState::Normal(EnemyMode::Patrol),
                        entity,
                        &mut state_events,
                    );
                    exposed.0 = false;
                    commands.entity(entity).insert(InvulnerabilityTimer {
                        remaining: tuning.revival.invulnerability_duration,
                    });
                }
            }
            EnemyState::Normal(mode) => {
                if !pool.is_physically_alive() {
                    transition(&mut machine, EnemyState::Reviving, entity, &mut state_events);
                    exposed.0 = true;
                    continue;
                }

                // Mode switching is a pure function of detection facts.
                let next_mode = if perception.player_in_attack_range {
                    EnemyMode::Combat
                } else if perception.player_detected {
                    EnemyMode::Chase
                } else {
                    EnemyMode::Patrol
                };
                if next_mode != mode {
                    machine.set_sub_state(EnemyState::Normal(next_mode));
                    debug!("enemy {:?} mode {} -> {}", entity, mode.name(), next_mode.name());
                }

                if next_mode == EnemyMode::Combat {
                    combat.attack_timer -= dt;
                    if combat.attack_timer <= 0.0 {
                        if let Some(player) = perception.player {
                            damage_events.send(DamageEvent {
                                target: player,
                                source: Some(entity),
                                axis: HealthAxis::Physical,
                                amount: combat.attack_damage,
                            });
                        }
                        // Jittered cooldown so grouped enemies desynchronize.
                        combat.attack_timer = rng.jitter(combat.attack_interval, 0.1);
                    }
                } else {
                    combat.attack_timer = combat.attack_timer.max(0.0);
                }
            }
        }

        let reviving = machine.is_in(EnemyState::Reviving);
        if exposed.0 != reviving {
            exposed.0 = reviving;
        }
    }
}

/// Remove enemies whose destruction countdown has expired (resolution phase).
pub fn reap_destroyed(
    mut commands: Commands,
    ready: Query<(Entity, &DestructionCountdown), With<Enemy>>,
) {
    for (entity, countdown) in ready.iter() {
        if countdown.is_ready() {
            info!("enemy {:?} destroyed", entity);
            commands.entity(entity).despawn_recursive();
        }
    }
}

/// Spawn bundle for an enemy.
#[derive(Bundle)]
pub struct EnemyBundle {
    pub enemy: Enemy,
    pub id: EnemyId,
    pub transform: Transform,
    pub pool: HealthPool,
    pub tier_watch: super::health::TierWatch,
    pub machine: StateMachine<EnemyState>,
    pub combat: EnemyCombat,
    pub route: PatrolRoute,
    pub speed: EnemySpeed,
    pub perception: EnemyPerception,
    pub exposed: Exposed,
}
