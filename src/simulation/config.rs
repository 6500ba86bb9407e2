//! Simulation configuration
//!
//! Every tunable of the simulation lives here. All structs deserialize with
//! `#[serde(default)]`, so a TOML file only needs to name what it overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::types::Position;

/// A configuration value that the simulation cannot run with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field}: range is inverted ({min} > {max})")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// Arrival process settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub min_spawn_interval: f32,
    pub max_spawn_interval: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Vehicle archetypes to pick from; empty disables spawning
    pub archetypes: Vec<String>,
    /// Emit one vehicle on the very first tick
    pub spawn_on_start: bool,
    /// Chance that a spawned vehicle is golden
    pub golden_chance: f32,
    pub golden_min_bonus: f32,
    pub golden_max_bonus: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            min_spawn_interval: 0.8,
            max_spawn_interval: 2.0,
            min_speed: 3.0,
            max_speed: 6.0,
            archetypes: vec![
                "sedan".to_string(),
                "suv".to_string(),
                "hatchback".to_string(),
                "pickup".to_string(),
            ],
            spawn_on_start: true,
            golden_chance: 0.05,
            golden_min_bonus: 100.0,
            golden_max_bonus: 300.0,
        }
    }
}

/// Car-following and steering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub detection_distance: f32,
    pub safe_distance: f32,
    /// Fraction of the leader's speed a follower settles at
    pub follow_factor: f32,
    /// Main-lane vehicles are removed after travelling this far
    pub spawn_distance_limit: f32,
    /// Speed floor while driving toward the station
    pub min_approach_speed: f32,
    /// Maximum steering rate in radians per second
    pub rotation_rate: f32,
    pub align_tolerance: f32,
    pub garage_stop_distance: f32,
    pub exit_speed: f32,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            detection_distance: 4.0,
            safe_distance: 1.5,
            follow_factor: 0.85,
            spawn_distance_limit: 100.0,
            min_approach_speed: 2.0,
            rotation_rate: 4.0,
            align_tolerance: 0.5,
            garage_stop_distance: 2.0,
            exit_speed: 3.0,
        }
    }
}

/// Routing gate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub diversion_probability: f32,
    pub cooldown_duration: f32,
    pub detection_radius: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            diversion_probability: 0.2,
            cooldown_duration: 2.0,
            detection_radius: 0.5,
        }
    }
}

/// Wash station economy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub queue_capacity: usize,
    pub base_service_duration: f32,
    pub min_service_duration: f32,
    pub base_reward: f32,
    pub duration_reduction_per_level: f32,
    pub reward_increase_per_level: f32,
    pub base_upgrade_cost: f32,
    pub upgrade_cost_multiplier: f32,
    pub max_level: u32,
    pub advertising_cost: f32,
    pub advertising_bonus: f32,
    /// Pause between two services
    pub service_gap: f32,
    pub unlock_price: f32,
    pub start_unlocked: bool,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4,
            base_service_duration: 10.0,
            min_service_duration: 1.0,
            base_reward: 15.0,
            duration_reduction_per_level: 1.2,
            reward_increase_per_level: 12.0,
            base_upgrade_cost: 100.0,
            upgrade_cost_multiplier: 1.5,
            max_level: 10,
            advertising_cost: 250.0,
            advertising_bonus: 0.2,
            service_gap: 0.5,
            unlock_price: 500.0,
            start_unlocked: true,
        }
    }
}

/// Where things are on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub spawn_anchor: Position,
    /// Direction of main-lane travel; normalized on use
    pub lane_direction: Position,
    pub gate_position: Position,
    pub align_point: Option<Position>,
    pub garage_point: Option<Position>,
    /// Where serviced vehicles drive off to; `None` removes them on completion
    pub exit_point: Option<Position>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spawn_anchor: Position::new(0.0, 0.0, 0.0),
            lane_direction: Position::new(1.0, 0.0, 0.0),
            gate_position: Position::new(30.0, 0.0, 0.0),
            align_point: Some(Position::new(30.0, 0.0, 6.0)),
            garage_point: Some(Position::new(30.0, 0.0, 14.0)),
            exit_point: Some(Position::new(40.0, 0.0, 14.0)),
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub spawner: SpawnerConfig,
    pub lane: LaneConfig,
    pub gate: GateConfig,
    pub station: StationConfig,
    pub layout: LayoutConfig,
    pub starting_balance: f32,
}

impl SimConfig {
    /// Load a configuration from a TOML file, filling unspecified values with defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SimConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Check for values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.spawner;
        check_range("spawner.spawn_interval", s.min_spawn_interval, s.max_spawn_interval)?;
        check_positive("spawner.min_spawn_interval", s.min_spawn_interval)?;
        check_range("spawner.speed", s.min_speed, s.max_speed)?;
        check_positive("spawner.min_speed", s.min_speed)?;
        check_unit("spawner.golden_chance", s.golden_chance)?;
        check_range("spawner.golden_bonus", s.golden_min_bonus, s.golden_max_bonus)?;

        let l = &self.lane;
        check_positive("lane.detection_distance", l.detection_distance)?;
        check_positive("lane.safe_distance", l.safe_distance)?;
        check_positive("lane.spawn_distance_limit", l.spawn_distance_limit)?;
        check_positive("lane.rotation_rate", l.rotation_rate)?;
        check_positive("lane.align_tolerance", l.align_tolerance)?;
        check_positive("lane.garage_stop_distance", l.garage_stop_distance)?;
        check_positive("lane.exit_speed", l.exit_speed)?;
        if l.follow_factor <= 0.0 || l.follow_factor > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "lane.follow_factor",
                value: l.follow_factor,
                min: 0.0,
                max: 1.0,
            });
        }

        let g = &self.gate;
        check_unit("gate.diversion_probability", g.diversion_probability)?;
        check_positive("gate.detection_radius", g.detection_radius)?;
        if g.cooldown_duration < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "gate.cooldown_duration",
                value: g.cooldown_duration,
                min: 0.0,
                max: f32::INFINITY,
            });
        }

        let st = &self.station;
        if st.queue_capacity == 0 {
            return Err(ConfigError::Zero("station.queue_capacity"));
        }
        if st.max_level == 0 {
            return Err(ConfigError::Zero("station.max_level"));
        }
        check_positive("station.min_service_duration", st.min_service_duration)?;
        check_range(
            "station.service_duration",
            st.min_service_duration,
            st.base_service_duration,
        )?;
        check_positive("station.duration_reduction_per_level", st.duration_reduction_per_level)?;
        check_positive("station.reward_increase_per_level", st.reward_increase_per_level)?;
        check_positive("station.base_upgrade_cost", st.base_upgrade_cost)?;
        if st.upgrade_cost_multiplier <= 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "station.upgrade_cost_multiplier",
                value: st.upgrade_cost_multiplier,
                min: 1.0,
                max: f32::INFINITY,
            });
        }
        check_unit("station.advertising_bonus", st.advertising_bonus)?;

        if self.layout.lane_direction.normalized().is_none() {
            return Err(ConfigError::NotPositive {
                field: "layout.lane_direction length",
                value: 0.0,
            });
        }

        Ok(())
    }
}

fn check_range(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min > max {
        Err(ConfigError::InvertedRange { field, min, max })
    } else {
        Ok(())
    }
}

fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}
