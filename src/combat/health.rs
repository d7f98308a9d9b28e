//! Dual health pools
//!
//! Every combat entity carries two health axes: a physical pool that governs
//! combat survivability and a mental pool that is the true life resource.
//! Physical death is recoverable while mental health remains; mental death is
//! terminal. Mental health is also the fuel for context actions, spent in
//! discrete slots.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::action_config::ActionTuning;
use super::actions::ActionController;
use super::events::{DamageEvent, DeathEvent, DeathKind, HealthAxis, HealthChangedEvent};

/// Classification of the physical pool, derived from the current/max ratio.
///
/// Boundary semantics: exactly 70.0% is still `Healthy`, exactly 30.0% is
/// already `Critical`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum PhysicalTier {
    Healthy,
    Wounded,
    Critical,
}

impl PhysicalTier {
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalTier::Healthy => "Healthy",
            PhysicalTier::Wounded => "Wounded",
            PhysicalTier::Critical => "Critical",
        }
    }
}

/// Classification of the mental pool, derived from available slots.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum MentalTier {
    /// More than one full slot available.
    High,
    /// Some mental health left, but at most one slot.
    Low,
    /// Mental health exhausted. The entity is truly dead.
    Empty,
}

impl MentalTier {
    pub fn name(&self) -> &'static str {
        match self {
            MentalTier::High => "High",
            MentalTier::Low => "Low",
            MentalTier::Empty => "Empty",
        }
    }

    /// While Low or Empty the core is exposed and incoming physical damage
    /// is amplified.
    pub fn is_exposed(&self) -> bool {
        !matches!(self, MentalTier::High)
    }
}

/// Result of a damage application.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DamageOutcome {
    /// Nothing happened (entity mentally dead, or amount scaled to zero).
    Ignored,
    /// Damage applied without crossing a death threshold.
    Applied(f32),
    /// Physical health reached zero with mental health remaining.
    PhysicalDeath(f32),
    /// Mental health reached zero.
    TrueDeath(f32),
}

impl DamageOutcome {
    /// The amount of health actually removed.
    pub fn applied(&self) -> f32 {
        match self {
            DamageOutcome::Ignored => 0.0,
            DamageOutcome::Applied(amount)
            | DamageOutcome::PhysicalDeath(amount)
            | DamageOutcome::TrueDeath(amount) => *amount,
        }
    }
}

/// Static base stats an entity's health pool is constructed from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStats {
    pub max_physical: f32,
    #[serde(default)]
    pub physical_regen_rate: f32,
    pub max_mental: f32,
    #[serde(default)]
    pub mental_regen_rate: f32,
    #[serde(default = "HealthStats::default_decay")]
    pub mental_decay_rate: f32,
    pub slot_value: f32,
}

impl HealthStats {
    fn default_decay() -> f32 {
        1.0
    }
}

/// Tier-dependent damage scaling applied to incoming physical damage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DamageTuning {
    /// Multiplier while the mental tier is Low.
    pub low_mental_multiplier: f32,
    /// Multiplier while the mental tier is Empty (all slots spent but still
    /// alive). Spending the last slot is survivable; it just leaves the
    /// core maximally exposed.
    pub empty_mental_multiplier: f32,
}

impl Default for DamageTuning {
    fn default() -> Self {
        Self {
            low_mental_multiplier: 1.5,
            empty_mental_multiplier: 2.0,
        }
    }
}

/// The dual health pool carried by every combat entity.
///
/// Invariant: `0 <= current <= max` on both axes, maintained by clamping in
/// every mutator. Tiers are pure functions of the current values and are
/// never stored.
#[derive(Component, Clone, Debug)]
pub struct HealthPool {
    pub current_physical: f32,
    pub max_physical: f32,
    pub physical_regen_rate: f32,
    pub current_mental: f32,
    pub max_mental: f32,
    pub mental_regen_rate: f32,
    pub mental_decay_rate: f32,
    /// Quantum of mental health consumed atomically by slot-fueled actions.
    pub slot_value: f32,
    /// Latched on mental damage or decay reaching zero. Slot consumption
    /// can empty the pool without setting this; an Empty pool is a living
    /// (if badly exposed) condition, true death is not.
    pub mentally_dead: bool,
}

impl HealthPool {
    /// Create a full pool from base stats.
    pub fn from_stats(stats: &HealthStats) -> Self {
        Self {
            current_physical: stats.max_physical,
            max_physical: stats.max_physical,
            physical_regen_rate: stats.physical_regen_rate,
            current_mental: stats.max_mental,
            max_mental: stats.max_mental,
            mental_regen_rate: stats.mental_regen_rate,
            mental_decay_rate: stats.mental_decay_rate,
            slot_value: stats.slot_value,
            mentally_dead: false,
        }
    }

    pub fn is_physically_alive(&self) -> bool {
        self.current_physical > 0.0
    }

    pub fn is_mentally_alive(&self) -> bool {
        !self.mentally_dead
    }

    pub fn physical_ratio(&self) -> f32 {
        if self.max_physical <= 0.0 {
            0.0
        } else {
            self.current_physical / self.max_physical
        }
    }

    /// Mental health expressed in slots. Pure derivation, never cached.
    pub fn slots_available(&self) -> f32 {
        if self.slot_value <= 0.0 {
            0.0
        } else {
            self.current_mental / self.slot_value
        }
    }

    /// Whether at least one full slot can be consumed.
    pub fn has_full_slot(&self) -> bool {
        self.current_mental >= self.slot_value && self.slot_value > 0.0
    }

    pub fn physical_tier(&self) -> PhysicalTier {
        let ratio = self.physical_ratio();
        if ratio >= 0.70 {
            PhysicalTier::Healthy
        } else if ratio > 0.30 {
            PhysicalTier::Wounded
        } else {
            PhysicalTier::Critical
        }
    }

    pub fn mental_tier(&self) -> MentalTier {
        if self.current_mental <= 0.0 {
            MentalTier::Empty
        } else if self.slots_available() > 1.0 {
            MentalTier::High
        } else {
            MentalTier::Low
        }
    }

    /// Apply physical damage. A mentally dead entity ignores physical damage
    /// entirely. The amount is amplified by the exposed-core multiplier while
    /// the mental tier is Low or Empty.
    pub fn apply_physical_damage(&mut self, amount: f32, tuning: &DamageTuning) -> DamageOutcome {
        if !self.is_mentally_alive() {
            return DamageOutcome::Ignored;
        }
        let multiplier = match self.mental_tier() {
            MentalTier::High => 1.0,
            MentalTier::Low => tuning.low_mental_multiplier,
            MentalTier::Empty => tuning.empty_mental_multiplier,
        };
        let scaled = (amount * multiplier).max(0.0);
        if scaled <= 0.0 {
            return DamageOutcome::Ignored;
        }
        let was_alive = self.is_physically_alive();
        let applied = scaled.min(self.current_physical);
        self.current_physical = (self.current_physical - scaled).max(0.0);
        if was_alive && !self.is_physically_alive() {
            DamageOutcome::PhysicalDeath(applied)
        } else {
            DamageOutcome::Applied(applied)
        }
    }

    /// Apply mental damage. Reaching zero this way is terminal regardless
    /// of the physical pool.
    pub fn apply_mental_damage(&mut self, amount: f32) -> DamageOutcome {
        let amount = amount.max(0.0);
        if amount <= 0.0 || !self.is_mentally_alive() {
            return DamageOutcome::Ignored;
        }
        let applied = amount.min(self.current_mental);
        self.current_mental = (self.current_mental - amount).max(0.0);
        if self.current_mental <= 0.0 {
            self.mentally_dead = true;
            DamageOutcome::TrueDeath(applied)
        } else {
            DamageOutcome::Applied(applied)
        }
    }

    /// Restore health on one axis, clamped to the maximum. Returns the amount
    /// actually restored.
    pub fn heal(&mut self, axis: HealthAxis, amount: f32) -> f32 {
        let amount = amount.max(0.0);
        match axis {
            HealthAxis::Physical => {
                let restored = amount.min(self.max_physical - self.current_physical);
                self.current_physical = (self.current_physical + amount).min(self.max_physical);
                restored
            }
            HealthAxis::Mental => {
                let restored = amount.min(self.max_mental - self.current_mental);
                self.current_mental = (self.current_mental + amount).min(self.max_mental);
                restored
            }
        }
    }

    /// Atomically consume one mental slot. Fails without mutation when less
    /// than a full slot remains.
    pub fn consume_slot(&mut self) -> bool {
        if !self.has_full_slot() {
            return false;
        }
        self.current_mental -= self.slot_value;
        true
    }

    /// Per-tick regeneration. Physical health regenerates only while the
    /// entity is physically alive. Mental health regenerates while not
    /// exposed and decays while exposed (the physically-dead revival window
    /// drains the true life pool).
    pub fn regenerate(&mut self, dt: f32, exposed: bool) {
        if !self.is_mentally_alive() {
            return;
        }
        if self.is_physically_alive() && self.physical_regen_rate > 0.0 {
            self.current_physical =
                (self.current_physical + self.physical_regen_rate * dt).min(self.max_physical);
        }
        if exposed {
            self.current_mental = (self.current_mental - self.mental_decay_rate * dt).max(0.0);
            if self.current_mental <= 0.0 && self.mental_decay_rate > 0.0 {
                self.mentally_dead = true;
            }
        } else if self.mental_regen_rate > 0.0 {
            self.current_mental =
                (self.current_mental + self.mental_regen_rate * dt).min(self.max_mental);
        }
    }
}

/// Last observed tiers, used to emit tier changes edge-triggered: consumers
/// are notified only when a recomputed tier differs from the previous tick's.
#[derive(Component, Clone, Debug)]
pub struct TierWatch {
    physical: PhysicalTier,
    mental: MentalTier,
}

impl TierWatch {
    pub fn new(pool: &HealthPool) -> Self {
        Self {
            physical: pool.physical_tier(),
            mental: pool.mental_tier(),
        }
    }

    /// Compare against the pool's current tiers, recording them and returning
    /// the ones that changed since the last call.
    pub fn observe(&mut self, pool: &HealthPool) -> (Option<PhysicalTier>, Option<MentalTier>) {
        let physical = pool.physical_tier();
        let mental = pool.mental_tier();
        let physical_changed = (physical != self.physical).then_some(physical);
        let mental_changed = (mental != self.mental).then_some(mental);
        self.physical = physical;
        self.mental = mental;
        (physical_changed, mental_changed)
    }
}

/// Physical damage actually applied to this entity during the current tick.
/// Inserted by [`apply_damage_events`] and consumed by the action controller
/// for damage interruption, then cleared in the resolution phase.
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct DamageTakenThisFrame {
    pub amount: f32,
}

/// Grants immunity to physical damage for a short window (post-revival
/// grace). Ticked down in the timer phase and removed when expired.
#[derive(Component, Clone, Copy, Debug)]
pub struct InvulnerabilityTimer {
    pub remaining: f32,
}

/// Tick down invulnerability windows and drop them once expired.
pub fn tick_invulnerability(
    time: Res<Time>,
    mut commands: Commands,
    mut timers: Query<(Entity, &mut InvulnerabilityTimer)>,
) {
    let dt = time.delta_secs();
    for (entity, mut timer) in timers.iter_mut() {
        timer.remaining -= dt;
        if timer.remaining <= 0.0 {
            commands.entity(entity).remove::<InvulnerabilityTimer>();
        }
    }
}

/// Per-tick regeneration and decay for every pool. The exposed flag (mental
/// decay instead of regen) is owned by the state machines and mirrored onto
/// this component by the state-update systems.
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct Exposed(pub bool);

pub fn regenerate_pools(
    time: Res<Time>,
    mut pools: Query<(Entity, &mut HealthPool, Option<&Exposed>)>,
    mut death_events: EventWriter<DeathEvent>,
) {
    let dt = time.delta_secs();
    for (entity, mut pool, exposed) in pools.iter_mut() {
        let exposed = exposed.map(|e| e.0).unwrap_or(false);
        let was_mentally_alive = pool.is_mentally_alive();
        pool.regenerate(dt, exposed);
        // Decay can drain the mental pool without any damage event, so the
        // death notification is raised here.
        if was_mentally_alive && !pool.is_mentally_alive() {
            death_events.send(DeathEvent {
                entity,
                kind: DeathKind::True,
            });
        }
    }
}

/// Apply queued damage events to their targets.
///
/// Physical damage is suppressed entirely while the target is invulnerable,
/// either from an active action or a grace timer; the suppression happens
/// here, before the pool is touched. Mental damage is never suppressed.
pub fn apply_damage_events(
    mut commands: Commands,
    tuning: Res<ActionTuning>,
    mut damage_events: EventReader<DamageEvent>,
    mut targets: Query<(
        &mut HealthPool,
        Option<&ActionController>,
        Option<&InvulnerabilityTimer>,
        Option<&mut DamageTakenThisFrame>,
    )>,
    mut health_events: EventWriter<HealthChangedEvent>,
    mut death_events: EventWriter<DeathEvent>,
) {
    for event in damage_events.read() {
        let Ok((mut pool, controller, invulnerable, taken)) = targets.get_mut(event.target) else {
            debug!("damage event for despawned entity {:?}", event.target);
            continue;
        };

        let outcome = match event.axis {
            HealthAxis::Physical => {
                let action_immune = controller.map(|c| c.is_invulnerable()).unwrap_or(false);
                if action_immune || invulnerable.is_some() {
                    debug!("physical damage suppressed by invulnerability");
                    continue;
                }
                pool.apply_physical_damage(event.amount, &tuning.damage)
            }
            HealthAxis::Mental => pool.apply_mental_damage(event.amount),
        };

        let applied = outcome.applied();
        if applied > 0.0 {
            if event.axis == HealthAxis::Physical {
                match taken {
                    Some(mut marker) => marker.amount += applied,
                    None => {
                        commands
                            .entity(event.target)
                            .insert(DamageTakenThisFrame { amount: applied });
                    }
                }
            }
            let (current, max) = match event.axis {
                HealthAxis::Physical => (pool.current_physical, pool.max_physical),
                HealthAxis::Mental => (pool.current_mental, pool.max_mental),
            };
            health_events.send(HealthChangedEvent {
                entity: event.target,
                axis: event.axis,
                delta: -applied,
                current,
                max,
            });
        }

        match outcome {
            DamageOutcome::PhysicalDeath(_) => {
                death_events.send(DeathEvent {
                    entity: event.target,
                    kind: DeathKind::Physical,
                });
            }
            DamageOutcome::TrueDeath(_) => {
                death_events.send(DeathEvent {
                    entity: event.target,
                    kind: DeathKind::True,
                });
            }
            _ => {}
        }
    }
}

/// Remove the per-tick damage markers once the action phase has seen them.
pub fn clear_damage_markers(
    mut commands: Commands,
    marked: Query<Entity, With<DamageTakenThisFrame>>,
) {
    for entity in marked.iter() {
        commands.entity(entity).remove::<DamageTakenThisFrame>();
    }
}

/// Emit edge-triggered tier change notifications.
pub fn emit_tier_changes(
    mut watches: Query<(Entity, &HealthPool, &mut TierWatch)>,
    mut events: EventWriter<super::events::TierChangedEvent>,
) {
    for (entity, pool, mut watch) in watches.iter_mut() {
        let (physical, mental) = watch.observe(pool);
        if let Some(tier) = physical {
            events.send(super::events::TierChangedEvent {
                entity,
                change: super::events::TierChange::Physical(tier),
            });
        }
        if let Some(tier) = mental {
            events.send(super::events::TierChangedEvent {
                entity,
                change: super::events::TierChange::Mental(tier),
            });
        }
    }
}
