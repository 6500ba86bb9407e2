//! Vehicle spawning
//!
//! The spawner runs a stochastic arrival process: it waits a uniformly drawn
//! interval, emits one spawn request, and draws the next interval.

use log::{debug, warn};
use rand::seq::IndexedRandom;
use rand::Rng;

use super::config::SpawnerConfig;

/// Everything needed to build a new vehicle at the spawn anchor
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub archetype: String,
    pub speed: f32,
    pub golden_bonus: Option<f32>,
}

/// Arrival process for the main lane
#[derive(Debug, Clone)]
pub struct SimSpawner {
    config: SpawnerConfig,
    /// Time accumulated since the last spawn
    timer: f32,
    /// Interval that must elapse before the next spawn
    current_interval: Option<f32>,
    /// Set after the no-archetype warning has been logged
    warned_empty: bool,
    pending_start_spawn: bool,
}

impl SimSpawner {
    pub fn new(config: SpawnerConfig) -> Self {
        let pending_start_spawn = config.spawn_on_start;
        Self {
            config,
            timer: 0.0,
            current_interval: None,
            warned_empty: false,
            pending_start_spawn,
        }
    }

    /// Whether spawning is possible at all
    pub fn is_enabled(&self) -> bool {
        !self.config.archetypes.is_empty()
    }

    /// Interval currently being waited on, once drawn
    pub fn current_interval(&self) -> Option<f32> {
        self.current_interval
    }

    /// Advance the countdown; returns a spawn request when the interval elapses
    pub fn tick<R: Rng>(&mut self, delta_secs: f32, rng: &mut R) -> Option<SpawnRequest> {
        if !self.is_enabled() {
            if !self.warned_empty {
                warn!("Spawner has no vehicle archetypes configured; spawning is disabled");
                self.warned_empty = true;
            }
            return None;
        }

        if self.current_interval.is_none() {
            self.current_interval = Some(self.draw_interval(rng));
        }

        if self.pending_start_spawn {
            self.pending_start_spawn = false;
            return self.make_request(rng);
        }

        self.timer += delta_secs;
        let interval = self.current_interval?;
        if self.timer < interval {
            return None;
        }

        self.timer = 0.0;
        self.current_interval = Some(self.draw_interval(rng));
        self.make_request(rng)
    }

    fn draw_interval<R: Rng>(&self, rng: &mut R) -> f32 {
        uniform(rng, self.config.min_spawn_interval, self.config.max_spawn_interval)
    }

    fn make_request<R: Rng>(&self, rng: &mut R) -> Option<SpawnRequest> {
        let archetype = self.config.archetypes.choose(rng)?.clone();
        let speed = uniform(rng, self.config.min_speed, self.config.max_speed);

        let golden = rng.random::<f32>() < self.config.golden_chance;
        let golden_bonus = golden.then(|| {
            uniform(
                rng,
                self.config.golden_min_bonus,
                self.config.golden_max_bonus,
            )
        });

        debug!(
            "Spawn request: {} at speed {:.2}{}",
            archetype,
            speed,
            if golden { " (golden)" } else { "" }
        );

        Some(SpawnRequest {
            archetype,
            speed,
            golden_bonus,
        })
    }
}

/// Uniform draw from `[min, max]` that tolerates a degenerate range
fn uniform<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min {
        rng.random_range(min..=max)
    } else {
        min
    }
}
