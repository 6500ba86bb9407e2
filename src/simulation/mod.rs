//! Standalone car wash simulation module
//!
//! This module contains all the core simulation logic: vehicle spawning,
//! the car-following lane model, the routing gate that diverts vehicles to
//! the wash station, and the station's queue and economy. It runs without
//! any rendering and can be driven tick by tick from tests or the console.

mod config;
mod events;
mod gate;
mod lane;
mod ledger;
mod spatial;
mod spawner;
mod station;
mod stats;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
pub use config::{
    ConfigError, GateConfig, LaneConfig, LayoutConfig, SimConfig, SpawnerConfig, StationConfig,
};
pub use events::{RejectReason, SimEvent, SimEventKind};
pub use gate::{GateDecision, RoutingGate, StationCapacity};
pub use lane::LaneController;
pub use ledger::{format_money, Ledger, Wallet};
pub use spatial::{LinearScan, Neighbor, NeighborQuery, Probe, SortedLaneIndex, VehicleSample};
pub use spawner::{SimSpawner, SpawnRequest};
pub use station::{
    reward_for_level, service_duration_for_level, upgrade_cost_for_level, QueuedVehicle,
    ServiceCycle, SimStation, StationError, StationEvent,
};
pub use stats::SimulationStats;
pub use types::{Position, SimId, VehicleId, EXIT_ARRIVAL_DISTANCE, PROBE_HALF_WIDTH};
pub use vehicle::{DivertStage, Population, SimVehicle, VehicleState, VehicleUpdateResult};
pub use world::{SimWorld, StationSnapshot, VehicleSnapshot};
