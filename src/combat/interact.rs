//! Interactable world objects
//!
//! Implements the world-object collaborator contract consumed by the
//! Interact action: availability, duration, start/complete/cancel
//! bookkeeping, and the effect applied on completion.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Effect applied when an interaction runs to completion.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum InteractionEffect {
    /// Grants the interacting entity an equipped weapon.
    WeaponPickup,
}

impl InteractionEffect {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionEffect::WeaponPickup => "weapon pickup",
        }
    }
}

/// A world object the player can interact with.
#[derive(Component, Clone, Debug)]
pub struct Interactable {
    /// How long the interaction takes, reported to the action.
    duration: f32,
    effect: InteractionEffect,
    /// One-shot objects stop reporting availability after completion.
    consumed: bool,
    in_progress: bool,
}

impl Interactable {
    pub fn new(duration: f32, effect: InteractionEffect) -> Self {
        Self {
            duration: duration.max(0.0),
            effect,
            consumed: false,
            in_progress: false,
        }
    }

    pub fn can_interact(&self) -> bool {
        !self.consumed && !self.in_progress
    }

    pub fn interaction_duration(&self) -> f32 {
        self.duration
    }

    pub fn effect(&self) -> InteractionEffect {
        self.effect
    }

    /// Whether the object has already been used up. Ignores the in-progress
    /// flag, so range tracking keeps listing an object mid-interaction.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Mark the interaction as started. Starting an already running or
    /// consumed object is a no-op with a warning.
    pub fn start_interaction(&mut self) -> bool {
        if !self.can_interact() {
            warn!("start_interaction on unavailable object");
            return false;
        }
        self.in_progress = true;
        true
    }

    /// Finish the interaction and return the effect to apply. The object is
    /// consumed and stops reporting availability.
    pub fn complete_interaction(&mut self) -> InteractionEffect {
        self.in_progress = false;
        self.consumed = true;
        self.effect
    }

    /// Abort an in-progress interaction, leaving the object available again.
    pub fn cancel_interaction(&mut self) {
        self.in_progress = false;
    }
}
