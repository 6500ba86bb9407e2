//! Wash station: bounded queue, single-server service cycle, leveling
//!
//! The service cycle is an explicit state machine advanced once per tick
//! rather than a blocking wait, so the rest of the simulation keeps
//! running while a vehicle is being washed. The enum makes a second,
//! concurrent cycle unrepresentable.

use log::{debug, info, warn};
use std::collections::VecDeque;
use thiserror::Error;

use super::config::StationConfig;
use super::ledger::{format_money, Ledger};
use super::types::VehicleId;

/// Rejected station operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StationError {
    #[error("station queue is full ({capacity} vehicles)")]
    QueueFull { capacity: usize },

    #[error("station is locked")]
    Locked,

    #[error("station is already at max level {0}")]
    MaxLevel(u32),

    #[error("insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f32, available: f32 },

    #[error("advertising already purchased")]
    AlreadyPurchased,

    #[error("station already unlocked")]
    AlreadyUnlocked,
}

/// Service duration at a level, floored at the configured minimum
pub fn service_duration_for_level(config: &StationConfig, level: u32) -> f32 {
    let steps = level.saturating_sub(1) as f32;
    (config.base_service_duration - config.duration_reduction_per_level * steps)
        .max(config.min_service_duration)
}

/// Reward per completed service at a level
pub fn reward_for_level(config: &StationConfig, level: u32) -> f32 {
    let steps = level.saturating_sub(1) as f32;
    config.base_reward + config.reward_increase_per_level * steps
}

/// Cost of upgrading away from a level (geometric growth)
pub fn upgrade_cost_for_level(config: &StationConfig, level: u32) -> f32 {
    let steps = level.saturating_sub(1) as i32;
    config.base_upgrade_cost * config.upgrade_cost_multiplier.powi(steps)
}

/// A vehicle waiting in (or being served from) the queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueuedVehicle {
    pub id: VehicleId,
    /// Golden bonus paid on completion
    pub bonus: f32,
}

/// Resumable service loop
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCycle {
    /// No cycle running; the next admission starts one
    Idle,
    Servicing { vehicle: QueuedVehicle, elapsed: f32 },
    /// Short pause before the next vehicle is taken
    Gap { remaining: f32 },
}

/// Things that happened inside the station during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum StationEvent {
    ServiceStarted { vehicle: VehicleId },
    ServiceCompleted { vehicle: VehicleId, reward: f32, bonus: f32 },
}

/// A wash station
#[derive(Debug, Clone)]
pub struct SimStation {
    config: StationConfig,
    level: u32,
    service_duration: f32,
    reward_per_service: f32,
    next_upgrade_cost: f32,
    queue: VecDeque<QueuedVehicle>,
    cycle: ServiceCycle,
    has_advertising: bool,
    unlocked: bool,
    pub total_serviced: usize,
    pub total_earnings: f32,
    /// Events produced outside of `tick` (cycle start on admission)
    pending_events: Vec<StationEvent>,
}

impl SimStation {
    pub fn new(config: StationConfig) -> Self {
        let unlocked = config.start_unlocked;
        let mut station = Self {
            config,
            level: 1,
            service_duration: 0.0,
            reward_per_service: 0.0,
            next_upgrade_cost: 0.0,
            queue: VecDeque::new(),
            cycle: ServiceCycle::Idle,
            has_advertising: false,
            unlocked,
            total_serviced: 0,
            total_earnings: 0.0,
            pending_events: Vec::new(),
        };
        station.recompute_level_values();
        station
    }

    fn recompute_level_values(&mut self) {
        self.service_duration = service_duration_for_level(&self.config, self.level);
        self.reward_per_service = reward_for_level(&self.config, self.level);
        self.next_upgrade_cost = upgrade_cost_for_level(&self.config, self.level);
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn max_level(&self) -> u32 {
        self.config.max_level
    }

    pub fn is_max_level(&self) -> bool {
        self.level >= self.config.max_level
    }

    pub fn service_duration(&self) -> f32 {
        self.service_duration
    }

    pub fn reward_per_service(&self) -> f32 {
        self.reward_per_service
    }

    pub fn next_upgrade_cost(&self) -> f32 {
        self.next_upgrade_cost
    }

    pub fn queue_capacity(&self) -> usize {
        self.config.queue_capacity
    }

    pub fn has_advertising(&self) -> bool {
        self.has_advertising
    }

    pub fn advertising_cost(&self) -> f32 {
        self.config.advertising_cost
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn unlock_price(&self) -> f32 {
        self.config.unlock_price
    }

    pub fn cycle(&self) -> &ServiceCycle {
        &self.cycle
    }

    pub fn is_cycle_running(&self) -> bool {
        self.cycle != ServiceCycle::Idle
    }

    /// Vehicle currently being washed
    pub fn in_service(&self) -> Option<VehicleId> {
        match &self.cycle {
            ServiceCycle::Servicing { vehicle, .. } => Some(vehicle.id),
            _ => None,
        }
    }

    /// Waiting vehicles in service order
    pub fn queued(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.queue.iter().map(|q| q.id)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Capacity query used by the routing gate: queued plus in service
    pub fn occupancy(&self) -> usize {
        self.queue.len() + usize::from(self.in_service().is_some())
    }

    /// Progress of the current wash in [0, 1]; zero when nothing is being washed
    pub fn progress(&self) -> f32 {
        match &self.cycle {
            ServiceCycle::Servicing { elapsed, .. } if self.service_duration > 0.0 => {
                (elapsed / self.service_duration).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Take a vehicle into the queue, starting the service cycle if it is idle
    pub fn admit(&mut self, id: VehicleId, bonus: f32) -> Result<(), StationError> {
        if !self.unlocked {
            return Err(StationError::Locked);
        }
        if self.occupancy() >= self.config.queue_capacity {
            return Err(StationError::QueueFull {
                capacity: self.config.queue_capacity,
            });
        }
        debug_assert!(
            self.in_service() != Some(id) && !self.queue.iter().any(|q| q.id == id),
            "vehicle {:?} admitted twice",
            id
        );

        self.queue.push_back(QueuedVehicle { id, bonus });
        debug!(
            "Vehicle {:?} admitted ({}/{})",
            id.0,
            self.occupancy(),
            self.config.queue_capacity
        );

        if self.cycle == ServiceCycle::Idle {
            self.start_next();
        }
        Ok(())
    }

    /// Dequeue the head into service, or go idle if the queue is empty
    fn start_next(&mut self) {
        match self.queue.pop_front() {
            Some(vehicle) => {
                debug!("Service started for vehicle {:?}", vehicle.id.0);
                self.pending_events
                    .push(StationEvent::ServiceStarted { vehicle: vehicle.id });
                self.cycle = ServiceCycle::Servicing {
                    vehicle,
                    elapsed: 0.0,
                };
            }
            None => self.cycle = ServiceCycle::Idle,
        }
    }

    /// Advance the service cycle by one tick
    pub fn tick(&mut self, delta_secs: f32, ledger: &mut dyn Ledger) -> Vec<StationEvent> {
        match &mut self.cycle {
            ServiceCycle::Idle => {}
            ServiceCycle::Servicing { vehicle, elapsed } => {
                *elapsed += delta_secs;
                if *elapsed >= self.service_duration {
                    let vehicle = *vehicle;
                    self.complete(vehicle, ledger);
                }
            }
            ServiceCycle::Gap { remaining } => {
                *remaining -= delta_secs;
                if *remaining <= 0.0 {
                    self.start_next();
                }
            }
        }
        std::mem::take(&mut self.pending_events)
    }

    fn complete(&mut self, vehicle: QueuedVehicle, ledger: &mut dyn Ledger) {
        let reward = self.reward_per_service;
        self.total_serviced += 1;
        self.total_earnings += reward + vehicle.bonus;
        ledger.add_funds(reward + vehicle.bonus);

        info!(
            "Wash complete for vehicle {:?}: earned {}{}",
            vehicle.id.0,
            format_money(reward),
            if vehicle.bonus > 0.0 {
                format!(" + {} golden bonus", format_money(vehicle.bonus))
            } else {
                String::new()
            }
        );
        self.pending_events.push(StationEvent::ServiceCompleted {
            vehicle: vehicle.id,
            reward,
            bonus: vehicle.bonus,
        });

        if self.config.service_gap > 0.0 {
            self.cycle = ServiceCycle::Gap {
                remaining: self.config.service_gap,
            };
        } else {
            self.start_next();
        }
    }

    /// Buy the next level; returns the new level
    pub fn try_upgrade(&mut self, ledger: &mut dyn Ledger) -> Result<u32, StationError> {
        if self.is_max_level() {
            return Err(StationError::MaxLevel(self.level));
        }
        self.pay(self.next_upgrade_cost, ledger)?;

        self.level += 1;
        self.recompute_level_values();
        info!(
            "Station upgraded to level {}: {:.1}s per wash, {} per wash",
            self.level,
            self.service_duration,
            format_money(self.reward_per_service)
        );
        Ok(self.level)
    }

    /// One-time advertising purchase; returns the diversion bonus to apply at the gate
    pub fn try_buy_advertising(&mut self, ledger: &mut dyn Ledger) -> Result<f32, StationError> {
        if self.has_advertising {
            return Err(StationError::AlreadyPurchased);
        }
        self.pay(self.config.advertising_cost, ledger)?;

        self.has_advertising = true;
        info!("Advertising purchased");
        Ok(self.config.advertising_bonus)
    }

    /// Buy the station so the gate starts sending vehicles to it
    pub fn try_unlock(&mut self, ledger: &mut dyn Ledger) -> Result<(), StationError> {
        if self.unlocked {
            return Err(StationError::AlreadyUnlocked);
        }
        self.pay(self.config.unlock_price, ledger)?;

        self.unlocked = true;
        info!("Station unlocked");
        Ok(())
    }

    fn pay(&self, cost: f32, ledger: &mut dyn Ledger) -> Result<(), StationError> {
        if ledger.try_spend(cost) {
            Ok(())
        } else {
            warn!(
                "Cannot afford {} (balance {})",
                format_money(cost),
                format_money(ledger.balance())
            );
            Err(StationError::InsufficientFunds {
                needed: cost,
                available: ledger.balance(),
            })
        }
    }

    /// Cancel the running cycle without paying out and empty the queue
    ///
    /// Returns every vehicle that was inside the station. The station is
    /// locked afterwards.
    pub fn shutdown(&mut self) -> Vec<VehicleId> {
        let mut inside: Vec<VehicleId> = self.in_service().into_iter().collect();
        inside.extend(self.queue.drain(..).map(|q| q.id));
        self.cycle = ServiceCycle::Idle;
        self.pending_events.clear();
        self.unlocked = false;
        if !inside.is_empty() {
            warn!("Station shut down with {} vehicles inside", inside.len());
        }
        inside
    }
}
