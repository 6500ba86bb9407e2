//! Per-tick vehicle movement
//!
//! Implements the car-following model for both traffic streams and the
//! bounded-rate steering that carries diverted vehicles to the station.
//! All neighbor lookups read a snapshot taken at the start of the pass, so
//! the result does not depend on which vehicle happened to move first.

use std::collections::BTreeMap;

use super::config::LaneConfig;
use super::spatial::{LinearScan, NeighborQuery, Probe, SortedLaneIndex, VehicleSample};
use super::types::{Position, VehicleId, EXIT_ARRIVAL_DISTANCE};
use super::vehicle::{DivertStage, Population, SimVehicle, VehicleState, VehicleUpdateResult};

/// Moves every active vehicle once per tick
#[derive(Debug, Clone)]
pub struct LaneController {
    config: LaneConfig,
    anchor: Position,
    /// Unit direction of main-lane travel
    axis: Position,
}

impl LaneController {
    pub fn new(config: LaneConfig, anchor: Position, lane_direction: Position) -> Self {
        let axis = lane_direction
            .normalized()
            .unwrap_or(Position::new(1.0, 0.0, 0.0));
        Self {
            config,
            anchor,
            axis,
        }
    }

    pub fn config(&self) -> &LaneConfig {
        &self.config
    }

    /// Heading given to freshly spawned vehicles
    pub fn lane_heading(&self) -> Position {
        self.axis
    }

    pub fn anchor(&self) -> Position {
        self.anchor
    }

    /// Update all vehicles in spawn order
    ///
    /// Returns a list of (vehicle_id, result) tuples for vehicles that need special handling
    pub fn update(
        &self,
        delta_secs: f32,
        vehicles: &mut BTreeMap<VehicleId, SimVehicle>,
    ) -> Vec<(VehicleId, VehicleUpdateResult)> {
        let samples: Vec<VehicleSample> =
            vehicles.values().filter_map(VehicleSample::of).collect();
        let main_lane = SortedLaneIndex::build(&samples, self.anchor, self.axis);
        let service_lane = LinearScan::new(&samples);

        let mut results = Vec::new();
        for vehicle in vehicles.values_mut() {
            let result = match vehicle.state {
                VehicleState::Cruising | VehicleState::Blocked => {
                    self.drive(vehicle, delta_secs, &main_lane)
                }
                VehicleState::Diverting(_) => {
                    self.drive_diverting(vehicle, delta_secs, &service_lane)
                }
                VehicleState::Exiting => self.drive_exit(vehicle, delta_secs),
                VehicleState::Queued | VehicleState::Servicing | VehicleState::Removed => {
                    VehicleUpdateResult::Continue
                }
            };
            if result != VehicleUpdateResult::Continue {
                results.push((vehicle.id, result));
            }
        }
        results
    }

    /// Car-following step: probe, harmonize speed, move
    ///
    /// Returns true if the vehicle moved.
    fn follow(&self, vehicle: &mut SimVehicle, delta_secs: f32, query: &dyn NeighborQuery) -> bool {
        vehicle.previous_position = vehicle.position;

        let Some(population) = vehicle.population() else {
            return false;
        };
        let probe = Probe {
            id: vehicle.id,
            origin: vehicle.position,
            heading: vehicle.heading,
            max_distance: self.config.detection_distance,
            population,
        };
        let cruise_speed = vehicle.cruise_speed(self.config.min_approach_speed);

        // Room left before the safe distance to the vehicle ahead
        let mut headroom = f32::INFINITY;
        let blocked = match query.nearest_ahead(&probe) {
            None => {
                vehicle.speed = cruise_speed;
                false
            }
            Some(ahead) if ahead.gap < self.config.safe_distance => true,
            Some(ahead) => {
                vehicle.speed = vehicle
                    .speed
                    .min(ahead.speed * self.config.follow_factor)
                    .min(cruise_speed);
                headroom = (ahead.gap - self.config.safe_distance).max(0.0);
                false
            }
        };

        // Diverting vehicles keep their stage; only main-lane traffic shows Blocked
        if population == Population::MainLane {
            vehicle.state = if blocked {
                VehicleState::Blocked
            } else {
                VehicleState::Cruising
            };
        }

        if blocked {
            return false;
        }

        let step = (vehicle.speed * delta_secs).min(headroom);
        vehicle.position = vehicle.position + vehicle.heading.scale(step);
        vehicle.distance_traveled += step;
        true
    }

    fn drive(
        &self,
        vehicle: &mut SimVehicle,
        delta_secs: f32,
        main_lane: &SortedLaneIndex,
    ) -> VehicleUpdateResult {
        self.follow(vehicle, delta_secs, main_lane);

        if vehicle.on_main_lane() && vehicle.distance_traveled >= vehicle.spawn_distance_limit {
            return VehicleUpdateResult::Despawn;
        }
        VehicleUpdateResult::Continue
    }

    fn drive_diverting(
        &self,
        vehicle: &mut SimVehicle,
        delta_secs: f32,
        service_lane: &LinearScan,
    ) -> VehicleUpdateResult {
        self.advance_stage(vehicle);
        if self.at_garage(vehicle) {
            vehicle.previous_position = vehicle.position;
            return VehicleUpdateResult::ReachedGarage;
        }

        if let Some(target) = vehicle.targets.front().copied() {
            self.steer_towards(vehicle, target, delta_secs);
        }

        if self.follow(vehicle, delta_secs, service_lane) {
            self.advance_stage(vehicle);
        }

        if self.at_garage(vehicle) {
            VehicleUpdateResult::ReachedGarage
        } else {
            VehicleUpdateResult::Continue
        }
    }

    fn drive_exit(&self, vehicle: &mut SimVehicle, delta_secs: f32) -> VehicleUpdateResult {
        vehicle.previous_position = vehicle.position;
        let Some(exit) = vehicle.targets.front().copied() else {
            return VehicleUpdateResult::LeftStation;
        };
        if vehicle.position.distance(&exit) <= EXIT_ARRIVAL_DISTANCE {
            return VehicleUpdateResult::LeftStation;
        }

        self.steer_towards(vehicle, exit, delta_secs);
        let step = vehicle.speed * delta_secs;
        vehicle.position = vehicle.position + vehicle.heading.scale(step);
        vehicle.distance_traveled += step;

        if exit.distance_to_segment(&vehicle.previous_position, &vehicle.position)
            <= EXIT_ARRIVAL_DISTANCE
        {
            VehicleUpdateResult::LeftStation
        } else {
            VehicleUpdateResult::Continue
        }
    }

    /// Rotate the heading toward a target by at most `rotation_rate * dt`
    fn steer_towards(&self, vehicle: &mut SimVehicle, target: Position, delta_secs: f32) {
        if let Some(desired) = (target - vehicle.position).normalized() {
            vehicle.heading = vehicle
                .heading
                .rotate_towards(&desired, self.config.rotation_rate * delta_secs);
        }
    }

    /// Switch from aligning to approaching once the align waypoint was passed closely enough
    fn advance_stage(&self, vehicle: &mut SimVehicle) {
        if vehicle.state != VehicleState::Diverting(DivertStage::Aligning) {
            return;
        }
        let Some(align) = vehicle.targets.front().copied() else {
            vehicle.state = VehicleState::Diverting(DivertStage::Approaching);
            return;
        };
        let closest = align.distance_to_segment(&vehicle.previous_position, &vehicle.position);
        if closest <= self.config.align_tolerance {
            vehicle.targets.pop_front();
            vehicle.state = VehicleState::Diverting(DivertStage::Approaching);
        }
    }

    fn at_garage(&self, vehicle: &SimVehicle) -> bool {
        if vehicle.state != VehicleState::Diverting(DivertStage::Approaching) {
            return false;
        }
        match vehicle.targets.back() {
            Some(garage) => vehicle.position.distance(garage) <= self.config.garage_stop_distance,
            None => true,
        }
    }
}
