//! Headless scenario execution
//!
//! Runs scripted encounters without any graphical output. The headless layer
//! provides reference implementations of the collaborators the combat core
//! only consumes facts from: a perception system deriving detection facts
//! from Transforms, a sense system filling the player's target lists, and a
//! script driver standing in for the input layer.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use crate::combat::action_config::ActionTuning;
use crate::combat::actions::{ActionController, ActionKind};
use crate::combat::detection::{EnemyPerception, Intent, IntentQueue, PlayerSenses};
use crate::combat::enemy::{
    Enemy, EnemyBundle, EnemyCombat, EnemyId, EnemyMode, EnemySpeed, EnemyState, PatrolRoute,
};
use crate::combat::events::{DamageEvent, HealthAxis};
use crate::combat::health::{Exposed, HealthPool, TierWatch};
use crate::combat::interact::{Interactable, InteractionEffect};
use crate::combat::log::{EncounterLog, LogEventType, RunMetadata};
use crate::combat::player::{
    AttackStats, Equipment, MoveSpeed, Player, PlayerBundle, PlayerIntents, PlayerState,
};
use crate::combat::rng::GameRng;
use crate::combat::snapshot::{create_snapshot, EntitySnapshot};
use crate::combat::state_machine::StateMachine;
use crate::combat::{CombatPlugin, TickPhase};

use super::config::{ScenarioConfig, ScriptAction};

/// How a scenario run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// The player's mental pool reached zero.
    PlayerTrueDeath,
    /// The script ran out and the world settled.
    Completed,
    /// The maximum duration elapsed with the world still active.
    Timeout,
}

impl ScenarioOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioOutcome::PlayerTrueDeath => "player true death",
            ScenarioOutcome::Completed => "completed",
            ScenarioOutcome::Timeout => "timeout",
        }
    }
}

/// Final state of one scenario enemy.
#[derive(Debug, Clone)]
pub struct EnemyResult {
    /// Index into the scenario's enemy list.
    pub id: usize,
    /// True when the enemy was despawned by the destruction countdown.
    pub destroyed: bool,
    /// Top-level state name at run end ("Destroyed" when despawned).
    pub state: String,
    pub final_physical: f32,
    pub final_mental: f32,
}

/// Result of a completed scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub outcome: ScenarioOutcome,
    /// Scenario time at run end, in seconds.
    pub elapsed: f32,
    /// Player state at run end.
    pub player: EntitySnapshot,
    /// Top-level player state name at run end.
    pub player_state: String,
    pub enemies: Vec<EnemyResult>,
    /// Number of log entries recorded.
    pub log_entries: usize,
    /// Random seed used (if deterministic mode)
    pub random_seed: Option<u64>,
}

/// Detection collaborator data: how far this enemy senses, and from how
/// close it attacks. Headless-only; the core never reads it.
#[derive(Component, Clone, Copy, Debug)]
pub struct SensorRanges {
    pub detection: f32,
    pub attack: f32,
}

#[derive(Resource, Clone)]
struct ScenarioResource(ScenarioConfig);

/// Resource tracking headless run state.
#[derive(Resource)]
pub struct HeadlessState {
    max_duration: f32,
    elapsed: f32,
    script_cursor: usize,
    enemy_count: usize,
    output_path: Option<String>,
    scenario_name: String,
    random_seed: Option<u64>,
    complete: bool,
    result: Option<ScenarioResult>,
}

/// Plugin wiring the reference collaborators and run tracking around the
/// combat core.
pub struct HeadlessPlugin {
    pub config: ScenarioConfig,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let game_rng = match self.config.random_seed {
            Some(seed) => {
                info!("Using deterministic RNG with seed: {}", seed);
                GameRng::from_seed(seed)
            }
            None => GameRng::from_entropy(),
        };

        app.insert_resource(ScenarioResource(self.config.clone()))
            .insert_resource(game_rng)
            .insert_resource(HeadlessState {
                max_duration: self.config.max_duration_secs,
                elapsed: 0.0,
                script_cursor: 0,
                enemy_count: self.config.enemies.len(),
                output_path: self.config.output_path.clone(),
                scenario_name: self.config.name.clone(),
                random_seed: self.config.random_seed,
                complete: false,
                result: None,
            });

        app.add_systems(Startup, setup_scenario).add_systems(
            Update,
            (drive_script, update_perception, update_player_senses)
                .chain()
                .before(TickPhase::Timers),
        );

        app.add_systems(
            Update,
            (track_time, check_scenario_end)
                .chain()
                .after(TickPhase::Resolution),
        );
    }
}

/// Spawn the scenario world.
fn setup_scenario(
    mut commands: Commands,
    scenario: Res<ScenarioResource>,
    mut log: ResMut<EncounterLog>,
) {
    let config = &scenario.0;
    log.clear();
    log.log(
        LogEventType::RunEvent,
        format!("Scenario {:?} started", config.name),
    );

    let pool = HealthPool::from_stats(&config.player.stats);
    let actions: Vec<ActionKind> = config
        .player
        .actions
        .iter()
        .filter_map(|name| ActionKind::from_name(name))
        .collect();
    commands.spawn(PlayerBundle {
        player: Player,
        transform: Transform::from_translation(Vec3::from_array(config.player.position)),
        tier_watch: TierWatch::new(&pool),
        pool,
        machine: StateMachine::new(PlayerState::Normal),
        controller: ActionController::new(&actions),
        intents: PlayerIntents::default(),
        equipment: Equipment {
            has_weapon: config.player.has_weapon,
        },
        attack: AttackStats {
            damage: config.player.attack_damage,
            range: config.player.attack_range,
        },
        speed: MoveSpeed(config.player.move_speed),
        exposed: Exposed(false),
        senses: PlayerSenses::default(),
    });

    for (i, enemy) in config.enemies.iter().enumerate() {
        let pool = HealthPool::from_stats(&enemy.stats);
        commands.spawn((
            EnemyBundle {
                enemy: Enemy,
                id: EnemyId(i),
                transform: Transform::from_translation(Vec3::from_array(enemy.position)),
                tier_watch: TierWatch::new(&pool),
                pool,
                machine: StateMachine::new(EnemyState::Normal(EnemyMode::Patrol)),
                combat: EnemyCombat::new(enemy.attack_damage, enemy.attack_interval),
                route: PatrolRoute::new(enemy.patrol.iter().map(|p| Vec3::from_array(*p))),
                speed: EnemySpeed(enemy.move_speed),
                perception: EnemyPerception::default(),
                exposed: Exposed(false),
            },
            SensorRanges {
                detection: enemy.detection_range,
                attack: enemy.attack_range,
            },
        ));
    }

    for object in &config.interactables {
        commands.spawn((
            Transform::from_translation(Vec3::from_array(object.position)),
            Interactable::new(object.duration, InteractionEffect::WeaponPickup),
        ));
    }

    info!(
        "Scenario setup complete: {} enemies, {} interactables",
        config.enemies.len(),
        config.interactables.len()
    );
}

/// Inject script steps whose time has come.
fn drive_script(
    mut state: ResMut<HeadlessState>,
    scenario: Res<ScenarioResource>,
    mut queue: ResMut<IntentQueue>,
    mut damage_events: EventWriter<DamageEvent>,
    players: Query<Entity, With<Player>>,
    enemies: Query<(Entity, &EnemyId), With<Enemy>>,
) {
    let script = &scenario.0.script;
    while state.script_cursor < script.len() && script[state.script_cursor].at <= state.elapsed {
        let step = &script[state.script_cursor];
        state.script_cursor += 1;
        match &step.action {
            ScriptAction::DamagePlayer { amount } => {
                if let Ok(player) = players.get_single() {
                    damage_events.send(DamageEvent {
                        target: player,
                        source: None,
                        axis: HealthAxis::Physical,
                        amount: *amount,
                    });
                }
            }
            ScriptAction::MentalDamagePlayer { amount } => {
                if let Ok(player) = players.get_single() {
                    damage_events.send(DamageEvent {
                        target: player,
                        source: None,
                        axis: HealthAxis::Mental,
                        amount: *amount,
                    });
                }
            }
            ScriptAction::DamageEnemy { index, amount }
            | ScriptAction::MentalDamageEnemy { index, amount } => {
                let axis = match &step.action {
                    ScriptAction::DamageEnemy { .. } => HealthAxis::Physical,
                    _ => HealthAxis::Mental,
                };
                let target = enemies
                    .iter()
                    .find(|(_, id)| id.0 == *index)
                    .map(|(entity, _)| entity);
                match target {
                    Some(target) => {
                        damage_events.send(DamageEvent {
                            target,
                            source: None,
                            axis,
                            amount: *amount,
                        });
                    }
                    None => debug!("script damage for already destroyed enemy {}", index),
                }
            }
            ScriptAction::MoveIntent { direction } => {
                queue.push(Intent::Move(Vec3::from_array(*direction)));
            }
            ScriptAction::Aim { enabled } => queue.push(Intent::Aim(*enabled)),
            ScriptAction::Attack => queue.push(Intent::Attack),
            ScriptAction::StartAction { action } => {
                if let Some(kind) = ActionKind::from_name(action) {
                    queue.push(Intent::StartAction(kind));
                }
            }
            ScriptAction::StopAction { action } => {
                if let Some(kind) = ActionKind::from_name(action) {
                    queue.push(Intent::StopAction(kind));
                }
            }
        }
    }
}

/// Reference detection collaborator: derive each enemy's perception facts
/// from Transforms. A downed or truly dead player stops registering.
fn update_perception(
    players: Query<(Entity, &Transform, &StateMachine<PlayerState>), With<Player>>,
    mut enemies: Query<
        (
            &Transform,
            &SensorRanges,
            &StateMachine<EnemyState>,
            &mut EnemyPerception,
        ),
        (With<Enemy>, Without<Player>),
    >,
) {
    let player = players.get_single().ok();

    for (transform, ranges, machine, mut perception) in enemies.iter_mut() {
        perception.player = player.map(|(entity, _, _)| entity);
        perception.player_detected = false;
        perception.player_in_attack_range = false;
        perception.player_position = None;

        if !machine.is_in(EnemyState::Normal(EnemyMode::Patrol)) {
            continue;
        }
        let Some((_, player_transform, player_machine)) = player else {
            continue;
        };
        let threatening = !player_machine.is_in(PlayerState::Downed)
            && !player_machine.is_in(PlayerState::TrueDeath);
        if !threatening {
            continue;
        }

        let distance = transform
            .translation
            .distance(player_transform.translation);
        if distance <= ranges.detection {
            perception.player_detected = true;
            perception.player_position = Some(player_transform.translation);
        }
        if distance <= ranges.attack {
            perception.player_in_attack_range = true;
        }
    }
}

/// Reference sense collaborator: fill the player's target lists from
/// Transforms. Lists are sorted nearest-first for deterministic targeting.
fn update_player_senses(
    tuning: Res<ActionTuning>,
    mut players: Query<(&Transform, &AttackStats, &mut PlayerSenses), With<Player>>,
    enemies: Query<
        (Entity, &Transform, &StateMachine<EnemyState>),
        (With<Enemy>, Without<Player>),
    >,
    interactables: Query<(Entity, &Transform, &Interactable)>,
) {
    let Ok((player_transform, attack, mut senses)) = players.get_single_mut() else {
        return;
    };
    let origin = player_transform.translation;

    let mut resonance: Vec<(f32, Entity)> = Vec::new();
    let mut attackable: Vec<(f32, Entity)> = Vec::new();
    for (entity, transform, machine) in enemies.iter() {
        let distance = origin.distance(transform.translation);
        if machine.is_in(EnemyState::Reviving) && distance <= tuning.resonance.range {
            resonance.push((distance, entity));
        }
        if machine.is_in(EnemyState::Normal(EnemyMode::Patrol)) && distance <= attack.range {
            attackable.push((distance, entity));
        }
    }
    resonance.sort_by(|a, b| a.0.total_cmp(&b.0));
    attackable.sort_by(|a, b| a.0.total_cmp(&b.0));

    senses.resonance_targets = resonance.into_iter().map(|(_, e)| e).collect();
    senses.attack_targets = attackable.into_iter().map(|(_, e)| e).collect();

    senses.nearest_interactable = interactables
        .iter()
        .filter(|(_, transform, object)| {
            !object.is_consumed() && origin.distance(transform.translation) <= tuning.interact.range
        })
        .min_by(|a, b| {
            origin
                .distance(a.1.translation)
                .total_cmp(&origin.distance(b.1.translation))
        })
        .map(|(entity, _, _)| entity);
}

/// Advance scenario time.
fn track_time(time: Res<Time>, mut state: ResMut<HeadlessState>) {
    if !state.complete {
        state.elapsed += time.delta_secs();
    }
}

/// End the run on player true death, timeout, or quiescence after the
/// script is exhausted: player settled in Normal with no active action and
/// every surviving enemy back on patrol.
fn check_scenario_end(
    mut state: ResMut<HeadlessState>,
    scenario: Res<ScenarioResource>,
    log: Res<EncounterLog>,
    players: Query<
        (&HealthPool, &StateMachine<PlayerState>, &ActionController),
        With<Player>,
    >,
    enemies: Query<(&EnemyId, &HealthPool, &StateMachine<EnemyState>), With<Enemy>>,
) {
    if state.complete {
        return;
    }
    let Ok((pool, machine, controller)) = players.get_single() else {
        return;
    };

    let outcome = if machine.is_in(PlayerState::TrueDeath) {
        Some(ScenarioOutcome::PlayerTrueDeath)
    } else if state.elapsed >= state.max_duration {
        Some(ScenarioOutcome::Timeout)
    } else {
        let script_done = state.script_cursor >= scenario.0.script.len();
        let player_settled = machine.is_in(PlayerState::Normal)
            && !controller.has_active()
            && pool.current_physical >= pool.max_physical;
        let world_settled = enemies
            .iter()
            .all(|(_, _, m)| m.current() == EnemyState::Normal(EnemyMode::Patrol));
        (script_done && player_settled && world_settled).then_some(ScenarioOutcome::Completed)
    };

    let Some(outcome) = outcome else {
        return;
    };

    info!(
        "Scenario ended after {:.2}s: {}",
        state.elapsed,
        outcome.name()
    );

    let mut enemy_results: Vec<EnemyResult> = Vec::with_capacity(state.enemy_count);
    for id in 0..state.enemy_count {
        match enemies.iter().find(|(e, _, _)| e.0 == id) {
            Some((_, pool, machine)) => enemy_results.push(EnemyResult {
                id,
                destroyed: false,
                state: machine.current().name().to_string(),
                final_physical: pool.current_physical,
                final_mental: pool.current_mental,
            }),
            None => enemy_results.push(EnemyResult {
                id,
                destroyed: true,
                state: "Destroyed".to_string(),
                final_physical: 0.0,
                final_mental: 0.0,
            }),
        }
    }

    let result = ScenarioResult {
        outcome,
        elapsed: state.elapsed,
        player: create_snapshot(pool, machine, Some(controller)),
        player_state: machine.current().name().to_string(),
        enemies: enemy_results,
        log_entries: log.entries.len(),
        random_seed: state.random_seed,
    };

    if let Some(path) = state.output_path.as_deref() {
        let metadata = RunMetadata {
            scenario_name: state.scenario_name.clone(),
            seed: state.random_seed,
            duration_secs: state.elapsed,
            outcome: outcome.name().to_string(),
        };
        match log.save_to_file(&metadata, Some(std::path::Path::new(path))) {
            Ok(saved) => info!("Encounter log saved to {}", saved.display()),
            Err(err) => warn!("Failed to save encounter log: {}", err),
        }
    }

    state.result = Some(result);
    state.complete = true;
}

/// Fixed simulation step used for headless runs.
const TICK: f64 = 1.0 / 60.0;

/// Run a scenario to completion and return its result.
///
/// Time advances by a fixed step per update, so a given scenario and seed
/// always produce the same run regardless of wall-clock conditions.
pub fn run_scenario(config: ScenarioConfig) -> Result<ScenarioResult, String> {
    let max_duration = config.max_duration_secs;

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(TransformPlugin)
        .add_plugins(HierarchyPlugin)
        .add_plugins(CombatPlugin)
        .add_plugins(HeadlessPlugin { config })
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            TICK,
        )));

    // Two extra seconds of ticks of slack past the in-world timeout, which
    // covers the zero-delta first update.
    let max_ticks = ((max_duration / TICK as f32) as u64).saturating_add(120);
    for _ in 0..max_ticks {
        app.update();
        if app.world().resource::<HeadlessState>().complete {
            break;
        }
    }

    let mut state = app.world_mut().resource_mut::<HeadlessState>();
    state
        .result
        .take()
        .ok_or_else(|| "scenario did not reach an outcome".to_string())
}
