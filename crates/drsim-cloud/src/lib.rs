//! Simulation of a two-datacenter compute cloud with disaster-triggered
//! failover of pending work from the primary to the backup datacenter.

pub mod core;
pub mod simulation;
