//! Running statistics for a simulation
//!
//! Updated by [`super::SimWorld`] as events happen and logged by the
//! headless runner when it finishes.

use log::info;

use super::events::RejectReason;

/// Counters collected over a whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub total_vehicles_spawned: usize,
    pub golden_vehicles_spawned: usize,
    /// Vehicles that drove off the end of the main lane
    pub total_vehicles_passed: usize,
    pub total_diverted: usize,
    pub rejected_queue_full: usize,
    pub rejected_cooldown: usize,
    pub rejected_chance: usize,
    pub rejected_station_locked: usize,
    pub rejected_no_route: usize,
    pub total_admitted: usize,
    pub total_serviced: usize,
    /// Most vehicles ever committed to the station at once (queue + in service + in flight)
    pub peak_committed: usize,
    pub active_vehicles: usize,
    pub elapsed_time: f64,
}

impl SimulationStats {
    pub fn record_rejection(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::QueueFull => self.rejected_queue_full += 1,
            RejectReason::Cooldown => self.rejected_cooldown += 1,
            RejectReason::Chance => self.rejected_chance += 1,
            RejectReason::StationLocked => self.rejected_station_locked += 1,
            RejectReason::NoRoute => self.rejected_no_route += 1,
        }
    }

    pub fn total_rejected(&self) -> usize {
        self.rejected_queue_full
            + self.rejected_cooldown
            + self.rejected_chance
            + self.rejected_station_locked
            + self.rejected_no_route
    }

    /// Share of gate decisions that sent a vehicle to the station, in percent
    pub fn diversion_rate(&self) -> f32 {
        let decided = self.total_diverted + self.total_rejected();
        if decided > 0 {
            self.total_diverted as f32 / decided as f32 * 100.0
        } else {
            0.0
        }
    }

    /// Log the final statistics block
    pub fn log_summary(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.elapsed_time);
        info!("Total vehicles spawned: {}", self.total_vehicles_spawned);
        info!("Golden vehicles spawned: {}", self.golden_vehicles_spawned);
        info!("Vehicles passed by: {}", self.total_vehicles_passed);
        info!("Total diverted: {}", self.total_diverted);
        info!(
            "Rejected at gate: {} (full {}, cooldown {}, chance {}, locked {}, no route {})",
            self.total_rejected(),
            self.rejected_queue_full,
            self.rejected_cooldown,
            self.rejected_chance,
            self.rejected_station_locked,
            self.rejected_no_route
        );
        info!("Total serviced: {}", self.total_serviced);
        info!("Peak committed: {}", self.peak_committed);
        info!("Active vehicles: {}", self.active_vehicles);
        info!("Diversion rate: {:.1}%", self.diversion_rate());
    }
}
