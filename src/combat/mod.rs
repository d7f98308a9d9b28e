//! Combat core
//!
//! Implements the dual-health combat model:
//! - Physical and mental health pools with derived tiers
//! - Player and enemy state machines (downed windows, revival, true death)
//! - Mutually-exclusive context actions (recover, resonance, interact)
//! - Detection-fact inputs, outbound notifications, and encounter logging
//!
//! ## Tick phases
//!
//! All combat systems run in the `Update` schedule in six chained phases:
//!
//! 1. **Timers** - Intent routing, invulnerability and destruction countdowns
//! 2. **Vitals** - Health regeneration and exposed-core decay
//! 3. **Movement** - Intent-driven player movement, enemy steering
//! 4. **StateUpdate** - Damage application, state machine logic, deaths
//! 5. **Actions** - Action controller update, starts, interruptions
//! 6. **Resolution** - Tier notifications, log recording, enemy reaping
//!
//! The chain gives single-threaded semantics within a tick; deferred
//! commands are flushed between phases so markers inserted upstream are
//! visible downstream in the same tick.

use bevy::prelude::*;

pub mod action_config;
pub mod actions;
pub mod detection;
pub mod enemy;
pub mod events;
pub mod health;
pub mod interact;
pub mod log;
pub mod player;
pub mod rng;
pub mod snapshot;
pub mod state_machine;

use action_config::ActionConfigPlugin;
use events::*;

/// System set labels for combat tick ordering.
///
/// Use these to order custom systems against the core: collaborator systems
/// that feed detection facts belong before `Timers`; observers of the
/// finished tick belong after `Resolution`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TickPhase {
    /// Intent routing and countdown timers
    Timers,
    /// Regeneration and decay
    Vitals,
    /// Player and enemy movement
    Movement,
    /// Damage application and state machine logic
    StateUpdate,
    /// Action arbitration
    Actions,
    /// Notifications, logging, despawns
    Resolution,
}

/// Plugin for the combat core
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(ActionConfigPlugin::default())
            // Events
            .add_event::<DamageEvent>()
            .add_event::<HealthChangedEvent>()
            .add_event::<TierChangedEvent>()
            .add_event::<StateChangedEvent>()
            .add_event::<DeathEvent>()
            .add_event::<ActionStartedEvent>()
            .add_event::<ActionEndedEvent>()
            .add_event::<InteractionCompletedEvent>()
            // Resources
            .init_resource::<log::EncounterLog>()
            .init_resource::<detection::IntentQueue>()
            .init_resource::<rng::GameRng>();

        app.configure_sets(
            Update,
            (
                TickPhase::Timers,
                TickPhase::Vitals,
                TickPhase::Movement,
                TickPhase::StateUpdate,
                TickPhase::Actions,
                TickPhase::Resolution,
            )
                .chain(),
        );

        app.add_systems(
            Update,
            (
                log::advance_log_clock,
                player::apply_intents,
                health::tick_invulnerability,
                enemy::tick_destruction,
            )
                .chain()
                .in_set(TickPhase::Timers),
        );

        app.add_systems(Update, health::regenerate_pools.in_set(TickPhase::Vitals));

        app.add_systems(
            Update,
            (player::player_movement, enemy::enemy_movement)
                .chain()
                .in_set(TickPhase::Movement),
        );

        app.add_systems(
            Update,
            (
                health::apply_damage_events,
                player::player_state_update,
                enemy::enemy_state_update,
            )
                .chain()
                .in_set(TickPhase::StateUpdate),
        );

        // Flush deferred commands so damage markers inserted during state
        // update are visible to the action phase in the same tick.
        app.add_systems(
            Update,
            ApplyDeferred
                .after(TickPhase::StateUpdate)
                .before(TickPhase::Actions),
        );

        app.add_systems(
            Update,
            actions::update_player_actions.in_set(TickPhase::Actions),
        );

        app.add_systems(
            Update,
            ApplyDeferred
                .after(TickPhase::Actions)
                .before(TickPhase::Resolution),
        );

        app.add_systems(
            Update,
            (
                health::emit_tier_changes,
                log::record_events,
                health::clear_damage_markers,
                enemy::reap_destroyed,
            )
                .chain()
                .in_set(TickPhase::Resolution),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_phases_are_distinct() {
        assert_ne!(TickPhase::Timers, TickPhase::Vitals);
        assert_ne!(TickPhase::StateUpdate, TickPhase::Actions);
        assert_ne!(TickPhase::Actions, TickPhase::Resolution);
    }
}
