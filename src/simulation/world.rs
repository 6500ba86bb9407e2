//! Main simulation world that ties everything together
//!
//! `SimWorld` is the single owner of every piece of simulation state: the
//! vehicles, the spawner, the lane controller, the routing gate, the
//! station and the wallet. Components only ever see each other through it.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use super::config::SimConfig;
use super::events::{SimEvent, SimEventKind};
use super::gate::{GateDecision, RoutingGate, StationCapacity};
use super::lane::LaneController;
use super::ledger::{format_money, Wallet};
use super::spawner::{SimSpawner, SpawnRequest};
use super::station::{SimStation, StationError, StationEvent};
use super::stats::SimulationStats;
use super::types::{Position, SimId, VehicleId};
use super::vehicle::{SimVehicle, VehicleState, VehicleUpdateResult};

/// Read-only view of a vehicle for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub archetype: String,
    pub position: Position,
    pub heading: Position,
    pub state: VehicleState,
    pub golden: bool,
}

/// Read-only view of the station for display
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    pub level: u32,
    pub max_level: u32,
    pub wash_duration: f32,
    pub money_per_wash: f32,
    pub total_cars_washed: usize,
    pub total_earnings: f32,
    pub progress: f32,
    pub occupancy: usize,
    pub queue_capacity: usize,
    pub next_upgrade_cost: f32,
    pub has_advertising: bool,
    pub unlocked: bool,
}

/// The main simulation world
pub struct SimWorld {
    pub config: SimConfig,

    /// All vehicles, keyed (and therefore iterated) in spawn order
    pub vehicles: BTreeMap<VehicleId, SimVehicle>,

    pub spawner: SimSpawner,
    pub lane: LaneController,
    pub gate: RoutingGate,
    pub station: SimStation,
    pub wallet: Wallet,
    pub stats: SimulationStats,

    /// Events not yet drained by collaborators
    events: Vec<SimEvent>,

    /// Next ID to assign
    next_id: usize,

    /// Simulation time in seconds
    pub time: f64,

    rng: StdRng,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig, rng: StdRng) -> Self {
        let layout = &config.layout;
        let lane = LaneController::new(
            config.lane.clone(),
            layout.spawn_anchor,
            layout.lane_direction,
        );
        let gate = RoutingGate::new(
            &config.gate,
            layout.gate_position,
            layout.align_point,
            layout.garage_point,
            config.lane.min_approach_speed,
        );

        Self {
            vehicles: BTreeMap::new(),
            spawner: SimSpawner::new(config.spawner.clone()),
            lane,
            gate,
            station: SimStation::new(config.station.clone()),
            wallet: Wallet::new(config.starting_balance),
            stats: SimulationStats::default(),
            events: Vec::new(),
            next_id: 0,
            time: 0.0,
            rng,
            config,
        }
    }

    pub fn new() -> Self {
        Self::from_config(SimConfig::default())
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::from_config_with_seed(SimConfig::default(), seed)
    }

    pub fn from_config(config: SimConfig) -> Self {
        Self::new_internal(config, StdRng::from_os_rng())
    }

    pub fn from_config_with_seed(config: SimConfig, seed: u64) -> Self {
        Self::new_internal(config, StdRng::seed_from_u64(seed))
    }

    fn next_vehicle_id(&mut self) -> VehicleId {
        let id = VehicleId(SimId(self.next_id));
        self.next_id += 1;
        id
    }

    fn emit(&mut self, kind: SimEventKind) {
        self.events.push(SimEvent {
            time: self.time,
            kind,
        });
    }

    /// Spawn a vehicle at the spawn anchor
    pub fn spawn_vehicle(&mut self, request: SpawnRequest) -> VehicleId {
        let anchor = self.lane.anchor();
        self.spawn_vehicle_at(request, anchor)
    }

    /// Spawn a vehicle at a given point, heading along the lane
    pub fn spawn_vehicle_at(&mut self, request: SpawnRequest, position: Position) -> VehicleId {
        let id = self.next_vehicle_id();
        let mut vehicle = SimVehicle::new(
            id,
            request.archetype,
            position,
            self.lane.lane_heading(),
            request.speed,
            self.config.lane.spawn_distance_limit,
        );
        vehicle.golden_bonus = request.golden_bonus;
        let golden = vehicle.is_golden();

        self.vehicles.insert(id, vehicle);
        self.stats.total_vehicles_spawned += 1;
        if golden {
            self.stats.golden_vehicles_spawned += 1;
        }
        self.emit(SimEventKind::VehicleSpawned {
            vehicle: id,
            golden,
        });
        id
    }

    /// Vehicles committed to the station: queued, in service, or on the way
    pub fn committed(&self) -> usize {
        self.station.occupancy() + self.gate.in_flight()
    }

    fn station_capacity(&self) -> StationCapacity {
        StationCapacity {
            occupancy: self.station.occupancy(),
            queue_capacity: self.station.queue_capacity(),
            unlocked: self.station.is_unlocked(),
        }
    }

    /// Advance the simulation by one tick
    pub fn tick(&mut self, delta_secs: f32) {
        self.time += f64::from(delta_secs);

        if let Some(request) = self.spawner.tick(delta_secs, &mut self.rng) {
            self.spawn_vehicle(request);
        }

        let results = self.lane.update(delta_secs, &mut self.vehicles);
        let mut arrivals = Vec::new();
        for (vehicle_id, result) in results {
            match result {
                VehicleUpdateResult::Despawn => {
                    self.mark_removed(vehicle_id);
                    self.stats.total_vehicles_passed += 1;
                }
                VehicleUpdateResult::LeftStation => self.mark_removed(vehicle_id),
                VehicleUpdateResult::ReachedGarage => arrivals.push(vehicle_id),
                VehicleUpdateResult::Continue => {}
            }
        }

        self.evaluate_gate();
        self.admit_arrivals(arrivals);

        let station_events = self.station.tick(delta_secs, &mut self.wallet);
        self.apply_station_events(station_events);

        debug_assert!(
            self.committed() <= self.station.queue_capacity(),
            "station overcommitted: {} > {}",
            self.committed(),
            self.station.queue_capacity()
        );
        self.stats.peak_committed = self.stats.peak_committed.max(self.committed());

        // Removals happen only here, after every component is done with this tick
        self.vehicles
            .retain(|_, vehicle| vehicle.state != VehicleState::Removed);
        self.stats.active_vehicles = self.vehicles.len();
        self.stats.elapsed_time = self.time;
    }

    fn mark_removed(&mut self, vehicle_id: VehicleId) {
        if let Some(vehicle) = self.vehicles.get_mut(&vehicle_id) {
            vehicle.state = VehicleState::Removed;
        }
    }

    /// Let the gate decide on every main-lane vehicle that crossed it this tick
    fn evaluate_gate(&mut self) {
        let capacity = self.station_capacity();
        let mut decisions = Vec::new();

        for vehicle in self.vehicles.values_mut() {
            if !vehicle.on_main_lane()
                || vehicle.has_diverted
                || !self.gate.is_triggered_by(vehicle)
            {
                continue;
            }
            // Occupancy cannot change during this pass; only in-flight does, inside the gate
            let decision = self.gate.evaluate(vehicle, capacity, self.time, &mut self.rng);
            decisions.push((vehicle.id, decision));
        }

        for (vehicle_id, decision) in decisions {
            match decision {
                GateDecision::Diverted => {
                    self.stats.total_diverted += 1;
                    self.emit(SimEventKind::Diverted {
                        vehicle: vehicle_id,
                    });
                }
                GateDecision::Rejected(reason) => {
                    self.stats.record_rejection(reason);
                    self.emit(SimEventKind::DiversionRejected {
                        vehicle: vehicle_id,
                        reason,
                    });
                }
                GateDecision::AlreadyDecided => {}
            }
        }
    }

    /// Hand vehicles waiting at the garage to the station, in arrival order
    fn admit_arrivals(&mut self, arrivals: Vec<VehicleId>) {
        for vehicle_id in arrivals {
            let Some(vehicle) = self.vehicles.get_mut(&vehicle_id) else {
                continue;
            };
            let bonus = vehicle.golden_bonus.unwrap_or(0.0);

            match self.station.admit(vehicle_id, bonus) {
                Ok(()) => {
                    self.gate.on_vehicle_admitted();
                    let wash_point = self.gate.garage_point().unwrap_or(vehicle.position);
                    vehicle.enter_queue(wash_point);
                    self.stats.total_admitted += 1;
                    self.emit(SimEventKind::Admitted {
                        vehicle: vehicle_id,
                    });
                }
                Err(err) => {
                    debug!("Vehicle {:?} waiting at the garage: {}", vehicle_id.0, err);
                }
            }
        }
    }

    fn apply_station_events(&mut self, station_events: Vec<StationEvent>) {
        for event in station_events {
            match event {
                StationEvent::ServiceStarted { vehicle } => {
                    if let Some(v) = self.vehicles.get_mut(&vehicle) {
                        v.state = VehicleState::Servicing;
                    }
                    self.emit(SimEventKind::ServiceStarted { vehicle });
                }
                StationEvent::ServiceCompleted {
                    vehicle,
                    reward,
                    bonus,
                } => {
                    let exit_point = self.config.layout.exit_point;
                    let exit_speed = self.config.lane.exit_speed;
                    if let Some(v) = self.vehicles.get_mut(&vehicle) {
                        v.leave_station(exit_point, exit_speed);
                    }
                    self.stats.total_serviced += 1;
                    self.emit(SimEventKind::ServiceCompleted {
                        vehicle,
                        reward,
                        bonus,
                    });
                }
            }
        }
    }

    /// Buy the next station level with wallet money
    pub fn upgrade_station(&mut self) -> Result<u32, StationError> {
        let level = self.station.try_upgrade(&mut self.wallet)?;
        self.emit(SimEventKind::Upgraded { level });
        Ok(level)
    }

    /// Buy advertising; returns the new diversion probability
    pub fn buy_advertising(&mut self) -> Result<f32, StationError> {
        let bonus = self.station.try_buy_advertising(&mut self.wallet)?;
        let probability = self.gate.apply_advertising(bonus);
        info!("Diversion probability is now {:.0}%", probability * 100.0);
        self.emit(SimEventKind::AdvertisingPurchased { probability });
        Ok(probability)
    }

    pub fn unlock_station(&mut self) -> Result<(), StationError> {
        self.station.try_unlock(&mut self.wallet)?;
        self.emit(SimEventKind::StationUnlocked);
        Ok(())
    }

    /// Tear the station down, cancelling any wash without paying out
    ///
    /// Vehicles inside the station or still driving toward it are removed.
    /// Returns how many vehicles were removed.
    pub fn shutdown_station(&mut self) -> usize {
        let inside = self.station.shutdown();
        for vehicle_id in &inside {
            self.mark_removed(*vehicle_id);
        }
        for vehicle in self.vehicles.values_mut() {
            if vehicle.is_diverting() {
                vehicle.state = VehicleState::Removed;
            }
        }
        self.gate.clear_in_flight();

        let before = self.vehicles.len();
        self.vehicles
            .retain(|_, vehicle| vehicle.state != VehicleState::Removed);
        let removed = before - self.vehicles.len();
        self.stats.active_vehicles = self.vehicles.len();

        self.emit(SimEventKind::StationClosed);
        removed
    }

    pub fn vehicle_snapshots(&self) -> Vec<VehicleSnapshot> {
        self.vehicles
            .values()
            .map(|v| VehicleSnapshot {
                id: v.id,
                archetype: v.archetype.clone(),
                position: v.position,
                heading: v.heading,
                state: v.state,
                golden: v.is_golden(),
            })
            .collect()
    }

    pub fn station_snapshot(&self) -> StationSnapshot {
        StationSnapshot {
            level: self.station.level(),
            max_level: self.station.max_level(),
            wash_duration: self.station.service_duration(),
            money_per_wash: self.station.reward_per_service(),
            total_cars_washed: self.station.total_serviced,
            total_earnings: self.station.total_earnings,
            progress: self.station.progress(),
            occupancy: self.station.occupancy(),
            queue_capacity: self.station.queue_capacity(),
            next_upgrade_cost: self.station.next_upgrade_cost(),
            has_advertising: self.station.has_advertising(),
            unlocked: self.station.is_unlocked(),
        }
    }

    /// Events recorded since the last drain
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Take all recorded events
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        let station = self.station_snapshot();
        println!("=== Car Wash Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!("{}", self.wallet.summary());
        println!("Vehicles: {}", self.vehicles.len());
        println!();

        println!("--- Station ---");
        println!(
            "  Level {}/{}{}: {:.1}s per wash, {} per wash, next upgrade {}",
            station.level,
            station.max_level,
            if self.station.is_max_level() { " (MAX)" } else { "" },
            station.wash_duration,
            format_money(station.money_per_wash),
            format_money(station.next_upgrade_cost)
        );
        println!(
            "  Occupancy: {}/{} (+{} on the way), progress {:.0}%",
            station.occupancy,
            station.queue_capacity,
            self.gate.in_flight(),
            station.progress * 100.0
        );
        println!(
            "  Washed: {}, earned {}, advertising: {}, unlocked: {}",
            station.total_cars_washed,
            format_money(station.total_earnings),
            if station.has_advertising { "yes" } else { "no" },
            if station.unlocked { "yes" } else { "no" }
        );
        println!(
            "  Diversion chance: {:.0}%",
            self.gate.diversion_probability() * 100.0
        );

        if !self.vehicles.is_empty() {
            println!("--- Active Vehicles ---");
            for vehicle in self.vehicles.values() {
                println!(
                    "  Vehicle {:?} [{}{}]: {:?}, speed={:.1}, pos=({:.1}, {:.1}), dist={:.1}",
                    vehicle.id.0 .0,
                    vehicle.archetype,
                    if vehicle.is_golden() { ", golden" } else { "" },
                    vehicle.state,
                    vehicle.speed,
                    vehicle.position.x,
                    vehicle.position.z,
                    vehicle.distance_traveled
                );
            }
        }
    }

    /// Draw a visual map of the lane and station in the terminal
    pub fn draw_lane(&self) {
        let layout = &self.config.layout;
        let lane_end = self.lane.anchor()
            + self
                .lane
                .lane_heading()
                .scale(self.config.lane.spawn_distance_limit);

        let mut landmarks = vec![self.lane.anchor(), lane_end, layout.gate_position];
        landmarks.extend(layout.align_point);
        landmarks.extend(layout.garage_point);
        landmarks.extend(layout.exit_point);

        // Find bounds of the world
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_z = f32::INFINITY;
        let mut max_z = f32::NEG_INFINITY;
        for pos in &landmarks {
            min_x = min_x.min(pos.x);
            max_x = max_x.max(pos.x);
            min_z = min_z.min(pos.z);
            max_z = max_z.max(pos.z);
        }

        // Add padding
        min_x -= 2.0;
        max_x += 2.0;
        min_z -= 2.0;
        max_z += 2.0;

        // Two world units per character horizontally keeps a 100-unit lane on one screen
        let scale_x = 0.5;
        let scale_z = 0.5;
        let width = ((max_x - min_x) * scale_x).ceil().max(1.0) as usize;
        let height = ((max_z - min_z) * scale_z).ceil().max(1.0) as usize;
        let mut grid = vec![vec![' '; width]; height];

        let to_grid = |pos: &Position| -> (usize, usize) {
            let col = ((pos.x - min_x) * scale_x).max(0.0) as usize;
            // Flip the Z-axis so +z is up
            let row = ((max_z - pos.z) * scale_z).max(0.0) as usize;
            (row.min(height - 1), col.min(width - 1))
        };

        // Draw the lane
        let steps = (self.config.lane.spawn_distance_limit.max(1.0)) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let pos = self.lane.anchor()
                + self
                    .lane
                    .lane_heading()
                    .scale(t * self.config.lane.spawn_distance_limit);
            let (row, col) = to_grid(&pos);
            grid[row][col] = '=';
        }

        let mut mark = |pos: &Position, symbol: char| {
            let (row, col) = to_grid(pos);
            grid[row][col] = symbol;
        };
        mark(&layout.gate_position, 'G');
        if let Some(align) = &layout.align_point {
            mark(align, 'a');
        }
        if let Some(garage) = &layout.garage_point {
            mark(garage, 'W');
        }
        if let Some(exit) = &layout.exit_point {
            mark(exit, 'E');
        }

        // Draw vehicles
        for vehicle in self.vehicles.values() {
            let symbol = if vehicle.is_golden() {
                '$'
            } else {
                match vehicle.state {
                    VehicleState::Cruising => 'c',
                    VehicleState::Blocked => 'b',
                    VehicleState::Diverting(_) => 'd',
                    VehicleState::Queued | VehicleState::Servicing => 'q',
                    VehicleState::Exiting => 'e',
                    VehicleState::Removed => continue,
                }
            };
            mark(&vehicle.position, symbol);
        }

        println!("\n=== Lane Map ===");
        println!("Legend: G=Gate, a=Align, W=Wash, E=Exit, ==Lane");
        println!("        c=Cruising, b=Blocked, d=Diverting, q=Queued, e=Exiting, $=Golden");
        println!();
        for row in &grid {
            let line: String = row.iter().collect();
            println!("{}", line);
        }
        println!();
    }
}
