//! Discrete simulation events
//!
//! Collaborators (sound, effects, UI) drain these after each tick. The core
//! only records them and never waits on whoever consumes them.

use super::types::VehicleId;

/// Why the routing gate let a vehicle continue straight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Queue plus in-flight vehicles already fill the station
    QueueFull,
    /// Another vehicle was diverted too recently
    Cooldown,
    /// The random draw exceeded the diversion probability
    Chance,
    /// The station has not been unlocked yet
    StationLocked,
    /// The gate has no garage waypoint to send vehicles to
    NoRoute,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEventKind {
    VehicleSpawned { vehicle: VehicleId, golden: bool },
    Diverted { vehicle: VehicleId },
    DiversionRejected { vehicle: VehicleId, reason: RejectReason },
    Admitted { vehicle: VehicleId },
    ServiceStarted { vehicle: VehicleId },
    ServiceCompleted { vehicle: VehicleId, reward: f32, bonus: f32 },
    Upgraded { level: u32 },
    AdvertisingPurchased { probability: f32 },
    StationUnlocked,
    StationClosed,
}

/// An event stamped with the simulation time it happened at
#[derive(Debug, Clone, PartialEq)]
pub struct SimEvent {
    pub time: f64,
    pub kind: SimEventKind,
}
