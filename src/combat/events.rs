//! Combat events
//!
//! Inbound damage requests and the outbound fire-and-forget notifications
//! consumed by collaborators (logging here; audio/UI in a full client). The
//! outbound queue is drained once per tick in the resolution phase; the core
//! never waits for acknowledgment.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::actions::ActionKind;
use super::health::{MentalTier, PhysicalTier};
use super::interact::InteractionEffect;

/// The two health axes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum HealthAxis {
    Physical,
    Mental,
}

/// Inbound request to damage an entity. Producers are enemy attacks, the
/// player's aimed attacks, and the scenario script.
#[derive(Event, Debug)]
pub struct DamageEvent {
    pub target: Entity,
    pub source: Option<Entity>,
    pub axis: HealthAxis,
    pub amount: f32,
}

/// A health value changed through damage or an explicit heal. Per-tick
/// regeneration is silent; tier changes still fire edge-triggered.
#[derive(Event, Debug)]
pub struct HealthChangedEvent {
    pub entity: Entity,
    pub axis: HealthAxis,
    /// Negative for damage, positive for healing.
    pub delta: f32,
    pub current: f32,
    pub max: f32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TierChange {
    Physical(PhysicalTier),
    Mental(MentalTier),
}

impl TierChange {
    pub fn axis(&self) -> HealthAxis {
        match self {
            TierChange::Physical(_) => HealthAxis::Physical,
            TierChange::Mental(_) => HealthAxis::Mental,
        }
    }

    pub fn tier_name(&self) -> &'static str {
        match self {
            TierChange::Physical(tier) => tier.name(),
            TierChange::Mental(tier) => tier.name(),
        }
    }
}

/// A derived tier crossed a boundary. Emitted at most once per tier per tick.
#[derive(Event, Debug)]
pub struct TierChangedEvent {
    pub entity: Entity,
    pub change: TierChange,
}

/// A top-level state machine transition completed.
#[derive(Event, Debug)]
pub struct StateChangedEvent {
    pub entity: Entity,
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeathKind {
    /// Physical pool reached zero while mentally alive; recoverable.
    Physical,
    /// Mental pool reached zero; terminal.
    True,
}

#[derive(Event, Debug)]
pub struct DeathEvent {
    pub entity: Entity,
    pub kind: DeathKind,
}

#[derive(Event, Debug)]
pub struct ActionStartedEvent {
    pub entity: Entity,
    pub action: ActionKind,
}

/// Why an action stopped running.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActionEndReason {
    /// Ran to its natural end.
    Completed,
    /// Explicit external cancellation.
    Cancelled,
    /// Force-cancelled by incoming damage.
    Interrupted,
    /// The qualifying target left range or stopped qualifying.
    TargetLost,
    /// Ran out of mental slots.
    Exhausted,
    /// A higher-priority trigger condition appeared.
    Superseded,
}

impl ActionEndReason {
    pub fn name(&self) -> &'static str {
        match self {
            ActionEndReason::Completed => "completed",
            ActionEndReason::Cancelled => "cancelled",
            ActionEndReason::Interrupted => "interrupted",
            ActionEndReason::TargetLost => "target lost",
            ActionEndReason::Exhausted => "exhausted",
            ActionEndReason::Superseded => "superseded",
        }
    }
}

#[derive(Event, Debug)]
pub struct ActionEndedEvent {
    pub entity: Entity,
    pub action: ActionKind,
    pub reason: ActionEndReason,
}

/// A world-object interaction ran to completion and its effect was applied.
#[derive(Event, Debug)]
pub struct InteractionCompletedEvent {
    pub entity: Entity,
    pub target: Entity,
    pub effect: InteractionEffect,
}
