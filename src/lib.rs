//! Car Wash Simulation Library
//!
//! A lane of traffic feeding a capacity-bounded wash station, simulated
//! headlessly in discrete ticks.

pub mod simulation;
