//! Actions and the action controller
//!
//! Actions are short-lived, mutually-exclusive behaviors layered on top of
//! the state machine: recovering health, resonating with a downed enemy's
//! core, interacting with a world object. Each carries static flags for
//! movement blocking, invulnerability, and interruptibility. A controller
//! owns at most one active action at a time and decides starts by fixed
//! priority; incoming damage force-cancels interruptible actions.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::action_config::ActionTuning;
use super::detection::PlayerSenses;
use super::enemy::{DestructionCountdown, Enemy, EnemyState};
use super::events::{
    ActionEndReason, ActionEndedEvent, ActionStartedEvent, DeathEvent, DeathKind, HealthAxis,
    HealthChangedEvent, InteractionCompletedEvent, StateChangedEvent,
};
use super::health::{DamageTakenThisFrame, HealthPool};
use super::interact::{Interactable, InteractionEffect};
use super::player::{Equipment, Player, PlayerState};
use super::state_machine::{transition, StateMachine};

/// The closed set of context actions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ActionKind {
    /// Channel into a downed enemy's exposed core. Blocks movement, grants
    /// invulnerability, cannot be interrupted.
    Resonance,
    /// Trade mental slots for physical health over time. Interruptible.
    Recover,
    /// Use a world object. Blocks movement, cannot be interrupted.
    Interact,
}

impl ActionKind {
    /// Fixed priority order used by the automatic start scan, highest first.
    pub const PRIORITY_ORDER: [ActionKind; 3] =
        [ActionKind::Resonance, ActionKind::Recover, ActionKind::Interact];

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Resonance => "Resonance",
            ActionKind::Recover => "Recover",
            ActionKind::Interact => "Interact",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Resonance" => Some(ActionKind::Resonance),
            "Recover" => Some(ActionKind::Recover),
            "Interact" => Some(ActionKind::Interact),
            _ => None,
        }
    }

    /// Movement input is suppressed while this action runs.
    pub fn blocks_movement(&self) -> bool {
        matches!(self, ActionKind::Resonance | ActionKind::Interact)
    }

    /// Physical damage is suppressed upstream while this action runs.
    pub fn provides_invulnerability(&self) -> bool {
        matches!(self, ActionKind::Resonance)
    }

    /// Incoming damage force-cancels this action. Invulnerability-granting
    /// actions are immune by construction: the damage never reaches them.
    pub fn can_interrupt(&self) -> bool {
        matches!(self, ActionKind::Recover)
    }
}

/// Run state of the Recover action.
#[derive(Clone, Debug, Default)]
pub struct RecoverRun {
    /// Counts up to the consumption interval.
    pub consume_timer: f32,
}

/// Run state of the Resonance action.
#[derive(Clone, Debug)]
pub struct ResonanceRun {
    pub elapsed: f32,
    pub target: Entity,
}

/// Run state of the Interact action.
#[derive(Clone, Debug)]
pub struct InteractRun {
    pub target: Entity,
    pub remaining: f32,
}

/// The currently running action with its per-activation state. Actions are
/// registered once and reused; run state is recreated on every start.
#[derive(Clone, Debug)]
pub enum ActiveAction {
    Recover(RecoverRun),
    Resonance(ResonanceRun),
    Interact(InteractRun),
}

impl ActiveAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActiveAction::Recover(_) => ActionKind::Recover,
            ActiveAction::Resonance(_) => ActionKind::Resonance,
            ActiveAction::Interact(_) => ActionKind::Interact,
        }
    }
}

/// Owns at most one active action and the registration list scanned for
/// automatic starts.
#[derive(Component, Clone, Debug, Default)]
pub struct ActionController {
    registered: SmallVec<[ActionKind; 3]>,
    active: Option<ActiveAction>,
    pending_request: Option<ActionKind>,
    pending_stop: Option<ActionKind>,
}

impl ActionController {
    pub fn new(kinds: &[ActionKind]) -> Self {
        let mut controller = Self::default();
        for kind in kinds {
            controller.register(*kind);
        }
        controller
    }

    /// Register an action kind. Duplicate registration is an idempotent
    /// no-op with a warning.
    pub fn register(&mut self, kind: ActionKind) -> bool {
        if self.registered.contains(&kind) {
            warn!("action {} already registered", kind.name());
            return false;
        }
        self.registered.push(kind);
        true
    }

    /// Registered kinds sorted into fixed priority order.
    pub fn registered_by_priority(&self) -> impl Iterator<Item = ActionKind> + '_ {
        ActionKind::PRIORITY_ORDER
            .into_iter()
            .filter(|kind| self.registered.contains(kind))
    }

    pub fn registered(&self) -> &[ActionKind] {
        &self.registered
    }

    pub fn active(&self) -> Option<&ActiveAction> {
        self.active.as_ref()
    }

    pub fn active_kind(&self) -> Option<ActionKind> {
        self.active.as_ref().map(ActiveAction::kind)
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    /// Movement input must be suppressed this frame.
    pub fn is_blocking(&self) -> bool {
        self.active_kind().map(|k| k.blocks_movement()).unwrap_or(false)
    }

    /// Physical damage must be suppressed before it reaches the pool.
    pub fn is_invulnerable(&self) -> bool {
        self.active_kind()
            .map(|k| k.provides_invulnerability())
            .unwrap_or(false)
    }

    /// Queue an explicit start request from the input collaborator.
    pub fn request_start(&mut self, kind: ActionKind) {
        self.pending_request = Some(kind);
    }

    /// Queue a release of a held action.
    pub fn request_stop(&mut self, kind: ActionKind) {
        self.pending_stop = Some(kind);
    }

    pub(crate) fn take_pending(&mut self) -> (Option<ActionKind>, Option<ActionKind>) {
        (self.pending_request.take(), self.pending_stop.take())
    }

    /// Activate an action. Fails if another action is already active or the
    /// kind is not registered.
    pub fn activate(&mut self, action: ActiveAction) -> bool {
        if self.active.is_some() {
            return false;
        }
        if !self.registered.contains(&action.kind()) {
            warn!("cannot start unregistered action {}", action.kind().name());
            return false;
        }
        self.active = Some(action);
        true
    }

    /// Unconditional external cancellation. Returns the cancelled kind.
    pub fn cancel_current(&mut self) -> Option<ActionKind> {
        self.active.take().map(|action| action.kind())
    }

    /// Damage interruption: cancels the active action only if it is
    /// interruptible. Returns the interrupted kind.
    pub fn on_damage_taken(&mut self) -> Option<ActionKind> {
        match self.active_kind() {
            Some(kind) if kind.can_interrupt() => {
                self.active = None;
                Some(kind)
            }
            _ => None,
        }
    }

    fn finish(&mut self) -> Option<ActionKind> {
        self.active.take().map(|action| action.kind())
    }
}

/// Why the active action must stop, decided by the per-kind update.
enum ActionVerdict {
    Continue,
    End(ActionEndReason),
}

/// Per-tick action arbitration for the player.
///
/// Runs after the state machines so every start decision observes post-regen,
/// post-state-update values. Order per entity: damage interruption, explicit
/// stop, active-action update, then the priority start scan.
#[allow(clippy::too_many_arguments)]
pub fn update_player_actions(
    time: Res<Time>,
    tuning: Res<ActionTuning>,
    mut commands: Commands,
    mut players: Query<
        (
            Entity,
            &mut ActionController,
            &mut HealthPool,
            &mut StateMachine<PlayerState>,
            &mut Equipment,
            Option<&PlayerSenses>,
            Option<&DamageTakenThisFrame>,
        ),
        (With<Player>, Without<Enemy>),
    >,
    mut enemies: Query<
        (&mut HealthPool, &mut StateMachine<EnemyState>),
        (With<Enemy>, Without<Player>),
    >,
    mut interactables: Query<&mut Interactable>,
    mut started_events: EventWriter<ActionStartedEvent>,
    mut ended_events: EventWriter<ActionEndedEvent>,
    mut interaction_events: EventWriter<InteractionCompletedEvent>,
    mut state_events: EventWriter<StateChangedEvent>,
    mut health_events: EventWriter<HealthChangedEvent>,
    mut death_events: EventWriter<DeathEvent>,
) {
    let dt = time.delta_secs();
    let default_senses = PlayerSenses::default();

    for (entity, mut controller, mut pool, mut machine, mut equipment, senses, damaged) in
        players.iter_mut()
    {
        let senses = senses.unwrap_or(&default_senses);
        let (requested, stop_requested) = controller.take_pending();

        // Damage interruption first: an interruptible action is notified and
        // force-cancelled. Non-interruptible actions are unaffected.
        if damaged.is_some() {
            if let Some(kind) = controller.on_damage_taken() {
                info!("{} interrupted by damage", kind.name());
                end_side_effects(kind, entity, &mut machine, &mut state_events);
                ended_events.send(ActionEndedEvent {
                    entity,
                    action: kind,
                    reason: ActionEndReason::Interrupted,
                });
            }
        }

        // Explicit release of a held action.
        if let Some(stop) = stop_requested {
            if controller.active_kind() == Some(stop) {
                let target = match controller.active() {
                    Some(ActiveAction::Interact(run)) => Some(run.target),
                    _ => None,
                };
                controller.cancel_current();
                if let Some(target) = target {
                    if let Ok(mut object) = interactables.get_mut(target) {
                        object.cancel_interaction();
                    }
                }
                end_side_effects(stop, entity, &mut machine, &mut state_events);
                ended_events.send(ActionEndedEvent {
                    entity,
                    action: stop,
                    reason: ActionEndReason::Cancelled,
                });
            }
        }

        // Advance the running action.
        if let Some(active) = controller.active.as_mut() {
            let kind = active.kind();
            let verdict = match active {
                ActiveAction::Recover(run) => update_recover(
                    run,
                    dt,
                    &tuning,
                    entity,
                    &mut pool,
                    senses,
                    &mut health_events,
                ),
                ActiveAction::Resonance(run) => update_resonance(
                    run,
                    dt,
                    &tuning,
                    senses,
                    &mut enemies,
                    &mut commands,
                    &mut state_events,
                    &mut death_events,
                ),
                ActiveAction::Interact(run) => update_interact(
                    run,
                    dt,
                    entity,
                    senses,
                    &mut interactables,
                    &mut equipment,
                    &mut interaction_events,
                ),
            };
            if let ActionVerdict::End(reason) = verdict {
                controller.finish();
                end_side_effects(kind, entity, &mut machine, &mut state_events);
                ended_events.send(ActionEndedEvent {
                    entity,
                    action: kind,
                    reason,
                });
            }
            continue;
        }

        // Nothing active: explicit request first, then the priority scan.
        let mut candidates: SmallVec<[ActionKind; 4]> = SmallVec::new();
        if let Some(kind) = requested {
            candidates.push(kind);
        }
        candidates.extend(controller.registered_by_priority());

        for kind in candidates {
            if try_start_action(
                kind,
                entity,
                &mut controller,
                &mut pool,
                &mut machine,
                senses,
                &mut enemies,
                &mut interactables,
                &mut state_events,
            ) {
                started_events.send(ActionStartedEvent {
                    entity,
                    action: kind,
                });
                break;
            }
        }
    }
}

/// Evaluate an action's preconditions and start it when they hold.
#[allow(clippy::too_many_arguments)]
fn try_start_action(
    kind: ActionKind,
    entity: Entity,
    controller: &mut ActionController,
    pool: &mut HealthPool,
    machine: &mut StateMachine<PlayerState>,
    senses: &PlayerSenses,
    enemies: &mut Query<
        (&mut HealthPool, &mut StateMachine<EnemyState>),
        (With<Enemy>, Without<Player>),
    >,
    interactables: &mut Query<&mut Interactable>,
    state_events: &mut EventWriter<StateChangedEvent>,
) -> bool {
    if controller.has_active() || !controller.registered().contains(&kind) {
        return false;
    }
    if !machine.is_in(PlayerState::Normal) {
        return false;
    }

    match kind {
        ActionKind::Recover => {
            // A qualifying resonance target in range is the higher-priority
            // condition that suppresses recovery.
            if !pool.has_full_slot()
                || pool.current_physical >= pool.max_physical
                || !senses.resonance_targets.is_empty()
            {
                return false;
            }
            controller.activate(ActiveAction::Recover(RecoverRun::default()))
        }
        ActionKind::Resonance => {
            if !pool.has_full_slot() {
                return false;
            }
            let Some(target) = senses
                .resonance_targets
                .iter()
                .copied()
                .find(|&candidate| {
                    enemies
                        .get(candidate)
                        .map(|(_, machine)| machine.is_in(EnemyState::Reviving))
                        .unwrap_or(false)
                })
            else {
                return false;
            };
            if !pool.consume_slot() {
                return false;
            }
            controller.activate(ActiveAction::Resonance(ResonanceRun {
                elapsed: 0.0,
                target,
            }))
        }
        ActionKind::Interact => {
            let Some(target) = senses.nearest_interactable else {
                return false;
            };
            let Ok(mut object) = interactables.get_mut(target) else {
                return false;
            };
            if !object.can_interact() {
                return false;
            }
            let duration = object.interaction_duration();
            if !controller.activate(ActiveAction::Interact(InteractRun {
                target,
                remaining: duration,
            })) {
                return false;
            }
            object.start_interaction();
            transition(machine, PlayerState::Interacting, entity, state_events);
            true
        }
    }
}

fn update_recover(
    run: &mut RecoverRun,
    dt: f32,
    tuning: &ActionTuning,
    entity: Entity,
    pool: &mut HealthPool,
    senses: &PlayerSenses,
    health_events: &mut EventWriter<HealthChangedEvent>,
) -> ActionVerdict {
    // A resonance target appearing outranks recovery.
    if !senses.resonance_targets.is_empty() {
        return ActionVerdict::End(ActionEndReason::Superseded);
    }

    run.consume_timer += dt;
    while run.consume_timer >= tuning.recover.tick_interval {
        run.consume_timer -= tuning.recover.tick_interval;
        if !pool.consume_slot() {
            return ActionVerdict::End(ActionEndReason::Exhausted);
        }
        let restored = pool.heal(HealthAxis::Physical, tuning.recover.heal_per_slot);
        health_events.send(HealthChangedEvent {
            entity,
            axis: HealthAxis::Physical,
            delta: restored,
            current: pool.current_physical,
            max: pool.max_physical,
        });
    }

    if pool.current_physical >= pool.max_physical {
        ActionVerdict::End(ActionEndReason::Completed)
    } else if !pool.has_full_slot() {
        ActionVerdict::End(ActionEndReason::Exhausted)
    } else {
        ActionVerdict::Continue
    }
}

#[allow(clippy::too_many_arguments)]
fn update_resonance(
    run: &mut ResonanceRun,
    dt: f32,
    tuning: &ActionTuning,
    senses: &PlayerSenses,
    enemies: &mut Query<
        (&mut HealthPool, &mut StateMachine<EnemyState>),
        (With<Enemy>, Without<Player>),
    >,
    commands: &mut Commands,
    state_events: &mut EventWriter<StateChangedEvent>,
    death_events: &mut EventWriter<DeathEvent>,
) -> ActionVerdict {
    run.elapsed += dt;

    if run.elapsed >= tuning.resonance.max_duration {
        // Full channel: the downed core collapses outright.
        if let Ok((mut target_pool, mut target_machine)) = enemies.get_mut(run.target) {
            if target_pool.is_mentally_alive() {
                let remaining = target_pool.current_mental;
                target_pool.apply_mental_damage(remaining);
                transition(
                    &mut target_machine,
                    EnemyState::TrueDeath,
                    run.target,
                    state_events,
                );
                commands.entity(run.target).insert(DestructionCountdown::new(
                    tuning.destruction_delay,
                ));
                death_events.send(DeathEvent {
                    entity: run.target,
                    kind: DeathKind::True,
                });
            }
        }
        return ActionVerdict::End(ActionEndReason::Completed);
    }

    // Target validity is only allowed to end the action once the minimum
    // duration has elapsed, so a one-frame flicker cannot cut it short.
    if run.elapsed >= tuning.resonance.min_duration {
        let qualifies = senses.resonance_targets.contains(&run.target)
            && enemies
                .get(run.target)
                .map(|(_, machine)| machine.is_in(EnemyState::Reviving))
                .unwrap_or(false);
        if !qualifies {
            return ActionVerdict::End(ActionEndReason::TargetLost);
        }
    }

    ActionVerdict::Continue
}

fn update_interact(
    run: &mut InteractRun,
    dt: f32,
    entity: Entity,
    senses: &PlayerSenses,
    interactables: &mut Query<&mut Interactable>,
    equipment: &mut Equipment,
    interaction_events: &mut EventWriter<InteractionCompletedEvent>,
) -> ActionVerdict {
    run.remaining -= dt;

    // Out of range, or the object disappeared: abort.
    let in_range = senses.nearest_interactable == Some(run.target);
    let Ok(mut object) = interactables.get_mut(run.target) else {
        return ActionVerdict::End(ActionEndReason::TargetLost);
    };
    if !in_range {
        object.cancel_interaction();
        return ActionVerdict::End(ActionEndReason::TargetLost);
    }

    if run.remaining <= 0.0 {
        let effect = object.complete_interaction();
        match effect {
            InteractionEffect::WeaponPickup => equipment.has_weapon = true,
        }
        interaction_events.send(InteractionCompletedEvent {
            entity,
            target: run.target,
            effect,
        });
        return ActionVerdict::End(ActionEndReason::Completed);
    }

    ActionVerdict::Continue
}

/// State cleanup shared by every way an action can end. Interact owns the
/// Interacting state, so its end always returns the player to Normal.
fn end_side_effects(
    kind: ActionKind,
    entity: Entity,
    machine: &mut StateMachine<PlayerState>,
    state_events: &mut EventWriter<StateChangedEvent>,
) {
    if kind == ActionKind::Interact && machine.is_in(PlayerState::Interacting) {
        transition(machine, PlayerState::Normal, entity, state_events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_most_one_active_action() {
        let mut controller =
            ActionController::new(&[ActionKind::Resonance, ActionKind::Recover]);
        assert!(controller.activate(ActiveAction::Recover(RecoverRun::default())));
        // Second activation is rejected without side effects.
        assert!(!controller.activate(ActiveAction::Resonance(ResonanceRun {
            elapsed: 0.0,
            target: Entity::PLACEHOLDER,
        })));
        assert_eq!(controller.active_kind(), Some(ActionKind::Recover));
    }

    #[test]
    fn unregistered_action_cannot_start() {
        let mut controller = ActionController::new(&[ActionKind::Recover]);
        assert!(!controller.activate(ActiveAction::Interact(InteractRun {
            target: Entity::PLACEHOLDER,
            remaining: 1.0,
        })));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut controller = ActionController::new(&[ActionKind::Recover]);
        assert!(!controller.register(ActionKind::Recover));
        assert_eq!(controller.registered().len(), 1);
    }

    #[test]
    fn damage_interrupts_only_interruptible_actions() {
        let mut controller = ActionController::new(&[ActionKind::Recover, ActionKind::Resonance]);
        controller.activate(ActiveAction::Recover(RecoverRun::default()));
        assert_eq!(controller.on_damage_taken(), Some(ActionKind::Recover));
        assert!(!controller.has_active());

        controller.activate(ActiveAction::Resonance(ResonanceRun {
            elapsed: 0.0,
            target: Entity::PLACEHOLDER,
        }));
        assert_eq!(controller.on_damage_taken(), None);
        assert_eq!(controller.active_kind(), Some(ActionKind::Resonance));
    }

    #[test]
    fn cancel_is_unconditional() {
        let mut controller = ActionController::new(&[ActionKind::Resonance]);
        controller.activate(ActiveAction::Resonance(ResonanceRun {
            elapsed: 0.0,
            target: Entity::PLACEHOLDER,
        }));
        assert_eq!(controller.cancel_current(), Some(ActionKind::Resonance));
        assert!(!controller.has_active());
    }

    #[test]
    fn flags_mirror_the_active_kind() {
        let mut controller =
            ActionController::new(&[ActionKind::Resonance, ActionKind::Recover]);
        assert!(!controller.is_blocking());
        controller.activate(ActiveAction::Resonance(ResonanceRun {
            elapsed: 0.0,
            target: Entity::PLACEHOLDER,
        }));
        assert!(controller.is_blocking());
        assert!(controller.is_invulnerable());
        controller.cancel_current();
        controller.activate(ActiveAction::Recover(RecoverRun::default()));
        assert!(!controller.is_blocking());
        assert!(!controller.is_invulnerable());
    }

    #[test]
    fn priority_order_is_fixed_regardless_of_registration_order() {
        let controller =
            ActionController::new(&[ActionKind::Interact, ActionKind::Resonance, ActionKind::Recover]);
        let order: Vec<ActionKind> = controller.registered_by_priority().collect();
        assert_eq!(
            order,
            vec![ActionKind::Resonance, ActionKind::Recover, ActionKind::Interact]
        );
    }
}
