//! Random source for encounter simulation
//!
//! All randomness in the core flows through this resource so a seeded run
//! replays identically. Without a seed the generator is drawn from system
//! entropy.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed this generator was initialized with, if deterministic.
    pub seed: Option<u64>,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Uniform value in `[-magnitude, magnitude)`. Patrol steering uses this
    /// for its wander offsets.
    pub fn offset(&mut self, magnitude: f32) -> f32 {
        (self.rng.gen::<f32>() * 2.0 - 1.0) * magnitude
    }

    /// Scale `base` by a uniform factor in `[1 - spread, 1 + spread)`.
    /// Attack cooldowns use this so grouped enemies desynchronize.
    pub fn jitter(&mut self, base: f32, spread: f32) -> f32 {
        base * (1.0 + self.offset(spread))
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
