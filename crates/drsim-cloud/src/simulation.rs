//! Top-level facade wiring the broker, datacenters and disaster monitor.

use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use drsim_core::context::SimulationContext;
use drsim_core::log_info;
use drsim_core::simulation::Simulation;
use drsim_core::Id;

use crate::core::broker::Broker;
use crate::core::cloudlet::Cloudlet;
use crate::core::cloudlet_pool::CloudletPool;
use crate::core::config::{ConfigError, DatacenterConfig, SimulationConfig};
use crate::core::datacenter::Datacenter;
use crate::core::events::broker::Start;
use crate::core::failover::{DisasterMonitor, FailoverManager};
use crate::core::host::Host;
use crate::core::metrics::{build_records, summarize, CloudletRecord, SummaryMetrics};
use crate::core::vm::VmSpec;
use crate::core::vm_placement::placement_algorithm_resolver;

/// Represents a simulation of a two-datacenter cloud run, provides methods for
/// its configuration and execution.
///
/// Wraps the simulation kernel and builds a primary and a backup datacenter, a
/// broker owning a batch of cloudlets and a disaster monitor that may take the
/// primary datacenter down mid-run.
pub struct DisasterRecoverySimulation {
    sim: Simulation,
    ctx: SimulationContext,
    config: SimulationConfig,
    pool: Rc<RefCell<CloudletPool>>,
    broker: Rc<RefCell<Broker>>,
    primary: Rc<RefCell<Datacenter>>,
    backup: Rc<RefCell<Datacenter>>,
    failover: Rc<RefCell<FailoverManager>>,
}

fn build_datacenter(
    sim: &mut Simulation,
    config: &DatacenterConfig,
    placement_algorithm: &str,
    pool: Rc<RefCell<CloudletPool>>,
    broker_id: Id,
    vm_admission_limit: u32,
) -> Rc<RefCell<Datacenter>> {
    let hosts: Vec<Host> = (0..config.hosts.count)
        .map(|_| {
            Host::new(
                config.hosts.cores,
                config.hosts.mips_per_core,
                config.hosts.memory,
                config.hosts.bandwidth,
                config.hosts.storage,
            )
        })
        .collect();
    let ctx = sim.create_context(&config.name);
    let datacenter = rc!(refcell!(Datacenter::new(
        hosts,
        config.characteristics.clone(),
        placement_algorithm_resolver(placement_algorithm),
        pool,
        broker_id,
        vm_admission_limit,
        ctx,
    )));
    sim.add_handler(&config.name, datacenter.clone());
    datacenter
}

impl DisasterRecoverySimulation {
    /// Builds all simulation components from the validated config and
    /// schedules the initial events.
    pub fn new(mut sim: Simulation, config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let broker_ctx = sim.create_context("broker");
        let broker_id = broker_ctx.id();

        let pool = rc!(refcell!(CloudletPool::new()));
        for i in 0..config.cloudlets.count {
            pool.borrow_mut().add(Cloudlet::new(
                i,
                broker_id,
                config.cloudlets.length,
                config.cloudlets.file_size,
                config.cloudlets.output_size,
                config.cloudlets.cores,
            ));
        }

        let primary = build_datacenter(
            &mut sim,
            &config.primary,
            &config.placement_algorithm,
            pool.clone(),
            broker_id,
            config.vm_admission_limit,
        );
        let backup = build_datacenter(
            &mut sim,
            &config.backup,
            &config.placement_algorithm,
            pool.clone(),
            broker_id,
            config.vm_admission_limit,
        );

        // VM ids are globally unique: primary VMs first, then backup VMs.
        let mut vm_requests = Vec::new();
        let mut next_vm_id = 0;
        for (dc_config, dc) in [(&config.primary, &primary), (&config.backup, &backup)] {
            for _ in 0..dc_config.vms.count {
                vm_requests.push((
                    VmSpec {
                        id: next_vm_id,
                        owner: broker_id,
                        cores: dc_config.vms.cores,
                        mips_per_core: dc_config.vms.mips_per_core,
                        memory: dc_config.vms.memory,
                        bandwidth: dc_config.vms.bandwidth,
                        disk_size: dc_config.vms.disk_size,
                    },
                    dc.borrow().id(),
                ));
                next_vm_id += 1;
            }
        }

        let broker = rc!(refcell!(Broker::new(pool.clone(), vm_requests, broker_ctx)));
        sim.add_handler("broker", broker.clone());

        let failover = rc!(refcell!(FailoverManager::new(config.disaster.failure_probability)));
        let monitor_ctx = sim.create_context("disaster-monitor");
        let monitor = rc!(refcell!(DisasterMonitor::new(
            failover.clone(),
            primary.clone(),
            backup.clone(),
            broker.clone(),
            config.disaster.check_interval,
            monitor_ctx,
        )));
        sim.add_handler("disaster-monitor", monitor.clone());
        monitor.borrow_mut().schedule_checks();

        let mut ctx = sim.create_context("root");
        ctx.emit_now(Start {}, broker_id);

        Ok(Self {
            sim,
            ctx,
            config,
            pool,
            broker,
            primary,
            backup,
            failover,
        })
    }

    /// Runs the simulation to completion and fails all cloudlets left pending
    /// when no events remain.
    pub fn run(&mut self) {
        log_info!(self.ctx, "simulation started");
        self.sim.step_until_no_events();
        let now = self.sim.time();
        let failed = self.pool.borrow_mut().finalize(now);
        if failed > 0 {
            log_info!(self.ctx, "{} cloudlets did not finish and were failed", failed);
        }
        log_info!(self.ctx, "simulation finished at {:.2}", now);
    }

    /// Performs the specified number of event steps.
    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    /// Advances the simulation by the specified duration.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }

    /// Current simulation time.
    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    /// Number of processed events.
    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn broker(&self) -> Rc<RefCell<Broker>> {
        self.broker.clone()
    }

    pub fn primary(&self) -> Rc<RefCell<Datacenter>> {
        self.primary.clone()
    }

    pub fn backup(&self) -> Rc<RefCell<Datacenter>> {
        self.backup.clone()
    }

    pub fn failover(&self) -> Rc<RefCell<FailoverManager>> {
        self.failover.clone()
    }

    /// The shared cloudlet registry, e.g. for inspecting per-cloudlet
    /// consumed work.
    pub fn pool(&self) -> Rc<RefCell<CloudletPool>> {
        self.pool.clone()
    }

    /// Builds the final per-cloudlet report.
    pub fn records(&self) -> Vec<CloudletRecord> {
        build_records(&self.pool.borrow(), &self.failover.borrow())
    }

    /// Computes aggregate metrics over the final report.
    pub fn summary(&self) -> SummaryMetrics {
        summarize(&self.records())
    }
}
