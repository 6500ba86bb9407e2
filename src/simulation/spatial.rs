//! Neighbor detection for the car-following model
//!
//! The lane controller never looks at geometry directly. It asks a
//! [`NeighborQuery`] for the nearest vehicle ahead of a forward probe, so the
//! following algorithm does not care how the answer is found.

use ordered_float::OrderedFloat;
use sorted_vec::SortedVec;
use std::cmp::Reverse;
use std::collections::HashMap;

use super::types::{Position, VehicleId, PROBE_HALF_WIDTH};
use super::vehicle::{Population, SimVehicle};

/// Tick-start copy of the fields neighbor detection reads
#[derive(Debug, Clone, Copy)]
pub struct VehicleSample {
    pub id: VehicleId,
    pub position: Position,
    pub speed: f32,
    pub population: Population,
}

impl VehicleSample {
    /// Sample a vehicle, or `None` if it is not part of either traffic stream
    pub fn of(vehicle: &SimVehicle) -> Option<Self> {
        Some(Self {
            id: vehicle.id,
            position: vehicle.position,
            speed: vehicle.speed,
            population: vehicle.population()?,
        })
    }
}

/// A forward ray cast from a vehicle
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// The probing vehicle, never reported as its own neighbor
    pub id: VehicleId,
    pub origin: Position,
    /// Unit direction of the ray
    pub heading: Position,
    pub max_distance: f32,
    /// Only vehicles of this stream are considered
    pub population: Population,
}

/// The vehicle found ahead of a probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: VehicleId,
    /// Distance from the probe origin along the probe heading
    pub gap: f32,
    pub speed: f32,
}

/// Spatial query used by the car-following model
///
/// "Ahead" means a positive distance along the probe heading; at equal
/// distance the earlier-spawned vehicle is ahead. Among several candidates
/// the smallest gap wins; at equal gap, the latest spawn still ahead of the
/// prober is the immediate leader.
pub trait NeighborQuery {
    fn nearest_ahead(&self, probe: &Probe) -> Option<Neighbor>;
}

/// Brute-force query over every sampled vehicle
///
/// Works for any heading; used for vehicles steering toward the station.
pub struct LinearScan<'a> {
    samples: &'a [VehicleSample],
}

impl<'a> LinearScan<'a> {
    pub fn new(samples: &'a [VehicleSample]) -> Self {
        Self { samples }
    }
}

impl NeighborQuery for LinearScan<'_> {
    fn nearest_ahead(&self, probe: &Probe) -> Option<Neighbor> {
        self.samples
            .iter()
            .filter(|s| s.population == probe.population && s.id != probe.id)
            .filter_map(|s| {
                let offset = s.position - probe.origin;
                let along = offset.dot(&probe.heading);
                if along < 0.0 || (along == 0.0 && s.id > probe.id) {
                    return None;
                }
                if along > probe.max_distance {
                    return None;
                }
                let lateral = (offset - probe.heading.scale(along)).length();
                if lateral > PROBE_HALF_WIDTH {
                    return None;
                }
                Some((OrderedFloat(along), Reverse(s.id), s.speed))
            })
            .min_by_key(|(along, id, _)| (*along, *id))
            .map(|(along, Reverse(id), speed)| Neighbor {
                id,
                gap: along.into_inner(),
                speed,
            })
    }
}

/// Main-lane index sorted by distance along the lane axis
///
/// Main-lane vehicles all travel on the lane axis with the lane heading, so
/// the vehicle ahead is simply the next entry in sort order.
pub struct SortedLaneIndex {
    anchor: Position,
    axis: Position,
    /// (distance along the axis, later spawns first at equal distance)
    entries: SortedVec<(OrderedFloat<f32>, Reverse<VehicleId>)>,
    speeds: HashMap<VehicleId, f32>,
}

impl SortedLaneIndex {
    /// Build the index from the main-lane vehicles of a sample set
    pub fn build(samples: &[VehicleSample], anchor: Position, axis: Position) -> Self {
        let main_lane: Vec<&VehicleSample> = samples
            .iter()
            .filter(|s| s.population == Population::MainLane)
            .collect();

        let entries = SortedVec::from_unsorted(
            main_lane
                .iter()
                .map(|s| (OrderedFloat((s.position - anchor).dot(&axis)), Reverse(s.id)))
                .collect(),
        );
        let speeds = main_lane.iter().map(|s| (s.id, s.speed)).collect();

        Self {
            anchor,
            axis,
            entries,
            speeds,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NeighborQuery for SortedLaneIndex {
    fn nearest_ahead(&self, probe: &Probe) -> Option<Neighbor> {
        if probe.population != Population::MainLane {
            return None;
        }

        let own_distance = (probe.origin - self.anchor).dot(&self.axis);
        let own_key = (OrderedFloat(own_distance), Reverse(probe.id));
        let next = self.entries.partition_point(|entry| *entry <= own_key);

        let (distance, Reverse(id)) = *self.entries.get(next)?;
        let gap = distance.into_inner() - own_distance;
        if gap > probe.max_distance {
            return None;
        }

        Some(Neighbor {
            id,
            gap,
            speed: self.speeds.get(&id).copied().unwrap_or(0.0),
        })
    }
}
