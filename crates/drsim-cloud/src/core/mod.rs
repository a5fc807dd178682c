pub mod broker;
pub mod cloudlet;
pub mod cloudlet_pool;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod events;
pub mod failover;
pub mod host;
pub mod metrics;
pub mod vm;
pub mod vm_placement;
