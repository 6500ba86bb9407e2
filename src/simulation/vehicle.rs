//! Vehicle entity for the car wash simulation
//!
//! A vehicle carries everything the lane controller, routing gate and
//! station need to know about it. There is no component lookup: every
//! field lives directly on [`SimVehicle`].

use std::collections::VecDeque;

use super::types::{Position, VehicleId};

/// Stage of the two-step drive from the gate to the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivertStage {
    /// Turning toward the align waypoint
    Aligning,
    /// Driving toward the garage waypoint
    Approaching,
}

/// Lifecycle state of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    Cruising,
    /// Too close to the vehicle ahead; no movement this tick
    Blocked,
    Diverting(DivertStage),
    Queued,
    Servicing,
    /// Driving off toward the exit waypoint after service
    Exiting,
    /// Marked for removal at the end of the tick
    Removed,
}

/// Which traffic stream a vehicle belongs to for neighbor detection
///
/// The two streams never block one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    MainLane,
    ServiceLane,
}

/// Result of a vehicle update indicating what action should be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    Continue,
    /// Reached the end of the main lane
    Despawn,
    /// Within stopping distance of the garage and waiting for admission
    ReachedGarage,
    /// Drove off past the exit waypoint
    LeftStation,
}

/// A vehicle in the simulation
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub archetype: String,
    pub position: Position,
    /// Position at the start of the last movement step
    pub previous_position: Position,
    /// Unit heading in the XZ plane
    pub heading: Position,
    pub speed: f32,
    pub base_speed: f32,
    pub state: VehicleState,
    /// Set once the routing gate has made its decision about this vehicle
    pub has_diverted: bool,
    pub distance_traveled: f32,
    pub spawn_distance_limit: f32,
    /// Remaining waypoints while diverting or exiting
    pub targets: VecDeque<Position>,
    /// Extra payout on service completion for golden vehicles
    pub golden_bonus: Option<f32>,
}

impl SimVehicle {
    pub fn new(
        id: VehicleId,
        archetype: String,
        position: Position,
        heading: Position,
        base_speed: f32,
        spawn_distance_limit: f32,
    ) -> Self {
        Self {
            id,
            archetype,
            position,
            previous_position: position,
            heading,
            speed: base_speed,
            base_speed,
            state: VehicleState::Cruising,
            has_diverted: false,
            distance_traveled: 0.0,
            spawn_distance_limit,
            targets: VecDeque::new(),
            golden_bonus: None,
        }
    }

    pub fn is_golden(&self) -> bool {
        self.golden_bonus.is_some()
    }

    /// Still in the main-lane flow (the only states the gate and the distance limit apply to)
    pub fn on_main_lane(&self) -> bool {
        matches!(self.state, VehicleState::Cruising | VehicleState::Blocked)
    }

    pub fn is_diverting(&self) -> bool {
        matches!(self.state, VehicleState::Diverting(_))
    }

    /// Stream this vehicle probes and is probed in, or `None` once it is
    /// inside or leaving the station
    pub fn population(&self) -> Option<Population> {
        match self.state {
            VehicleState::Cruising | VehicleState::Blocked => Some(Population::MainLane),
            VehicleState::Diverting(_) => Some(Population::ServiceLane),
            _ => None,
        }
    }

    /// Speed the vehicle returns to when nothing is ahead of it
    pub fn cruise_speed(&self, min_approach_speed: f32) -> f32 {
        if self.is_diverting() {
            self.base_speed.max(min_approach_speed)
        } else {
            self.base_speed
        }
    }

    /// Commit the vehicle to the service path
    ///
    /// With an align waypoint the vehicle starts in `Aligning`, otherwise it
    /// heads straight for the garage.
    pub fn begin_diversion(
        &mut self,
        align_point: Option<Position>,
        garage_point: Position,
        min_approach_speed: f32,
    ) {
        self.has_diverted = true;
        self.targets.clear();
        let stage = match align_point {
            Some(align) => {
                self.targets.push_back(align);
                DivertStage::Aligning
            }
            None => DivertStage::Approaching,
        };
        self.targets.push_back(garage_point);
        self.state = VehicleState::Diverting(stage);
        self.speed = self.cruise_speed(min_approach_speed);
    }

    /// Park the vehicle inside the station queue
    pub fn enter_queue(&mut self, wash_point: Position) {
        self.state = VehicleState::Queued;
        self.targets.clear();
        self.position = wash_point;
        self.previous_position = wash_point;
        self.speed = 0.0;
    }

    /// Send a serviced vehicle toward the exit, or mark it for removal
    pub fn leave_station(&mut self, exit_point: Option<Position>, exit_speed: f32) {
        match exit_point {
            Some(exit) => {
                self.state = VehicleState::Exiting;
                self.targets.clear();
                self.targets.push_back(exit);
                self.speed = exit_speed;
            }
            None => self.state = VehicleState::Removed,
        }
    }
}
