//! Routing gate diverting main-lane vehicles toward the station
//!
//! The gate makes exactly one decision per vehicle. Admission control
//! counts vehicles already committed to the service path (`in_flight`)
//! together with the station's own occupancy, so the number of vehicles
//! headed for the station can never exceed its queue capacity.

use log::{debug, warn};
use rand::Rng;

use super::config::GateConfig;
use super::events::RejectReason;
use super::types::Position;
use super::vehicle::SimVehicle;

/// Outcome of evaluating one vehicle at the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The vehicle was decided on before; nothing changed
    AlreadyDecided,
    /// The vehicle continues straight and will not be evaluated again
    Rejected(RejectReason),
    /// The vehicle is now driving toward the station
    Diverted,
}

/// What the gate needs to know about the station it feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationCapacity {
    pub occupancy: usize,
    pub queue_capacity: usize,
    pub unlocked: bool,
}

#[derive(Debug, Clone)]
pub struct RoutingGate {
    pub position: Position,
    pub detection_radius: f32,
    diversion_probability: f32,
    pub cooldown_duration: f32,
    last_diversion_time: Option<f64>,
    /// Vehicles committed to the service path but not yet admitted
    in_flight: usize,
    align_point: Option<Position>,
    garage_point: Option<Position>,
    min_approach_speed: f32,
}

impl RoutingGate {
    pub fn new(
        config: &GateConfig,
        position: Position,
        align_point: Option<Position>,
        garage_point: Option<Position>,
        min_approach_speed: f32,
    ) -> Self {
        if garage_point.is_none() {
            warn!("Routing gate has no garage waypoint; diversions are disabled");
        }
        Self {
            position,
            detection_radius: config.detection_radius,
            diversion_probability: config.diversion_probability.clamp(0.0, 1.0),
            cooldown_duration: config.cooldown_duration,
            last_diversion_time: None,
            in_flight: 0,
            align_point,
            garage_point,
            min_approach_speed,
        }
    }

    pub fn diversion_probability(&self) -> f32 {
        self.diversion_probability
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn last_diversion_time(&self) -> Option<f64> {
        self.last_diversion_time
    }

    pub fn garage_point(&self) -> Option<Position> {
        self.garage_point
    }

    /// Whether a vehicle's last movement step passed through the detection volume
    pub fn is_triggered_by(&self, vehicle: &SimVehicle) -> bool {
        self.position
            .distance_to_segment(&vehicle.previous_position, &vehicle.position)
            <= self.detection_radius
    }

    /// Decide whether a vehicle turns off toward the station
    ///
    /// Checks run in order: prior decision, capacity, cooldown, random draw.
    /// Every path except `AlreadyDecided` leaves `has_diverted` set.
    pub fn evaluate<R: Rng>(
        &mut self,
        vehicle: &mut SimVehicle,
        station: StationCapacity,
        now: f64,
        rng: &mut R,
    ) -> GateDecision {
        if vehicle.has_diverted {
            return GateDecision::AlreadyDecided;
        }

        let Some(garage_point) = self.garage_point else {
            vehicle.has_diverted = true;
            return GateDecision::Rejected(RejectReason::NoRoute);
        };

        if !station.unlocked {
            vehicle.has_diverted = true;
            return GateDecision::Rejected(RejectReason::StationLocked);
        }

        let total_committed = self.in_flight + station.occupancy;
        if total_committed >= station.queue_capacity {
            debug!(
                "Vehicle {:?} continues straight: station full ({}/{})",
                vehicle.id.0, total_committed, station.queue_capacity
            );
            vehicle.has_diverted = true;
            return GateDecision::Rejected(RejectReason::QueueFull);
        }

        if let Some(last) = self.last_diversion_time {
            if now - last < f64::from(self.cooldown_duration) {
                debug!("Vehicle {:?} continues straight: gate cooling down", vehicle.id.0);
                vehicle.has_diverted = true;
                return GateDecision::Rejected(RejectReason::Cooldown);
            }
        }

        let roll: f32 = rng.random();
        if roll > self.diversion_probability {
            vehicle.has_diverted = true;
            return GateDecision::Rejected(RejectReason::Chance);
        }

        self.last_diversion_time = Some(now);
        self.in_flight += 1;
        vehicle.begin_diversion(self.align_point, garage_point, self.min_approach_speed);
        debug!(
            "Vehicle {:?} diverted toward the station (committed: {})",
            vehicle.id.0,
            self.in_flight + station.occupancy
        );
        GateDecision::Diverted
    }

    /// A diverted vehicle was admitted into the station queue
    pub fn on_vehicle_admitted(&mut self) {
        debug_assert!(self.in_flight > 0, "admission without a diversion in flight");
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Forget every in-flight diversion (the station they were headed to closed)
    pub fn clear_in_flight(&mut self) {
        self.in_flight = 0;
    }

    /// Raise the diversion probability, clamped to 1.0; returns the new value
    pub fn apply_advertising(&mut self, bonus: f32) -> f32 {
        self.diversion_probability = (self.diversion_probability + bonus).clamp(0.0, 1.0);
        self.diversion_probability
    }
}
