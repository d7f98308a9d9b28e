//! Generic state machine
//!
//! A minimal container holding exactly one active state out of a closed set.
//! State sets are plain enums implementing [`MachineState`]; transition
//! *structure* (which edges exist at all) lives on the state type, while
//! entity-dependent guards (weapon equipped, mental health remaining, ...)
//! live in the calling transition helpers. The machine itself holds no game
//! logic beyond dispatch and validation.

use bevy::prelude::*;
use std::mem::discriminant;

use super::events::StateChangedEvent;

/// Contract for a closed state set usable in a [`StateMachine`].
pub trait MachineState: Copy + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    /// Stable display name of the state, unique within the machine's set.
    fn name(&self) -> &'static str;

    /// Whether the edge `from -> to` exists in the state graph. Payload data
    /// (sub-modes) is ignored; this validates top-level structure only.
    fn can_transition(from: Self, to: Self) -> bool;
}

/// Named-state container with a single active state.
///
/// Invariant: exactly one state is active at all times after construction.
/// A rejected transition leaves the machine untouched; there are no partial
/// transitions.
#[derive(Component, Clone, Debug)]
pub struct StateMachine<S: MachineState> {
    current: S,
    previous: S,
    time_in_state: f32,
    just_entered: bool,
}

impl<S: MachineState> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            previous: initial,
            time_in_state: 0.0,
            just_entered: true,
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn previous(&self) -> S {
        self.previous
    }

    /// Seconds spent in the current state.
    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    /// True only until the first `update` after entering the current state.
    pub fn just_entered(&self) -> bool {
        self.just_entered
    }

    pub fn is_in(&self, state: S) -> bool {
        discriminant(&self.current) == discriminant(&state)
    }

    /// Attempt a transition. Returns false and leaves the state unchanged if
    /// the target equals the current state or the edge does not exist.
    pub fn change_state(&mut self, next: S) -> bool {
        if discriminant(&self.current) == discriminant(&next) {
            return false;
        }
        if !S::can_transition(self.current, next) {
            warn!(
                "rejected state transition {} -> {}",
                self.current.name(),
                next.name()
            );
            return false;
        }
        self.previous = std::mem::replace(&mut self.current, next);
        self.time_in_state = 0.0;
        self.just_entered = true;
        true
    }

    /// Replace the payload of the current state without transitioning
    /// (sub-mode changes). Rejected if the variant would change.
    pub fn set_sub_state(&mut self, next: S) -> bool {
        if discriminant(&self.current) != discriminant(&next) {
            warn!(
                "set_sub_state would change variant {} -> {}",
                self.current.name(),
                next.name()
            );
            return false;
        }
        self.current = next;
        true
    }

    /// Advance the in-state clock. Call once per tick after transitions.
    pub fn update(&mut self, dt: f32) {
        self.time_in_state += dt;
        self.just_entered = false;
    }
}

/// Transition helper that also emits the outbound state-change notification
/// on success, so every call site reports consistently.
pub fn transition<S: MachineState>(
    machine: &mut StateMachine<S>,
    next: S,
    entity: Entity,
    events: &mut EventWriter<StateChangedEvent>,
) -> bool {
    let from = machine.current().name();
    if machine.change_state(next) {
        events.send(StateChangedEvent {
            entity,
            from,
            to: machine.current().name(),
        });
        true
    } else {
        false
    }
}
