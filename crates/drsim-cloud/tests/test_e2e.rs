//! End-to-end runs of the full disaster recovery scenario.

use drsim_cloud::core::config::SimulationConfig;
use drsim_cloud::core::datacenter::Datacenter;
use drsim_cloud::simulation::DisasterRecoverySimulation;
use drsim_core::simulation::Simulation;

// The resources reserved on every host must add up exactly with the host's
// availability counters and never exceed capacity.
fn assert_host_capacity_invariant(dc: &Datacenter) {
    for host in dc.hosts() {
        let cores: u32 = host.allocations().map(|vm| vm.cores).sum();
        let memory: u64 = host.allocations().map(|vm| vm.memory).sum();
        let bandwidth: u64 = host.allocations().map(|vm| vm.bandwidth).sum();
        let storage: u64 = host.allocations().map(|vm| vm.disk_size).sum();
        assert!(cores <= host.cores_total());
        assert_eq!(host.cores_available(), host.cores_total() - cores);
        assert!(memory <= host.memory_total());
        assert_eq!(host.memory_available(), host.memory_total() - memory);
        assert!(bandwidth <= host.bandwidth_total());
        assert_eq!(host.bandwidth_available(), host.bandwidth_total() - bandwidth);
        assert!(storage <= host.storage_total());
        assert_eq!(host.storage_available(), host.storage_total() - storage);
    }
}

// Full scenario with a certain disaster: 20 cloudlets over 4 primary and
// 2 backup single-core VMs, the primary goes down at the first check, the
// backup absorbs all of its pending work and the whole batch still completes.
#[test]
fn disaster_run_reroutes_and_completes_everything() {
    let mut config = SimulationConfig::default();
    config.primary.vms.cores = 1;
    config.disaster.failure_probability = 1.;
    let sim = Simulation::new(123);
    let mut cloud_sim = DisasterRecoverySimulation::new(sim, config).unwrap();
    cloud_sim.run();

    assert_eq!(cloud_sim.failover().borrow().failure_time(), Some(10.));
    assert!(cloud_sim.primary().borrow().is_failed());
    assert_eq!(cloud_sim.primary().borrow().executing_count(), 0);
    assert_eq!(cloud_sim.backup().borrow().reroute_queue_len(), 0);

    let backup_id = cloud_sim.backup().borrow().id() as i64;
    let records = cloud_sim.records();
    assert_eq!(records.len(), 20);
    for r in &records {
        assert_eq!(r.status, "Success");
        // Nothing finishes on the primary before time 10, so every cloudlet
        // ends its life in the backup datacenter.
        assert_eq!(r.datacenter_id, backup_id);
        assert!(r.finish_time > 10.);
    }

    // 14 cloudlets are rerouted; the backup admits 10 immediately at the
    // failure instant, the remaining 4 wait for free slots and restart
    // strictly after the failure time.
    let summary = cloud_sim.summary();
    assert_eq!(summary.succeeded, 20);
    assert_eq!(summary.affected_by_failover, 4);
    for r in &records {
        assert_eq!(r.affected_by_failover, r.start_time > 10.);
        if r.affected_by_failover {
            assert!(r.wait_time > 0.);
        }
    }

    assert_host_capacity_invariant(&cloud_sim.primary().borrow());
    assert_host_capacity_invariant(&cloud_sim.backup().borrow());
}

// Work conservation across the reroute: every cloudlet executes exactly its
// original instruction length, no matter how many rate changes and pauses
// it went through.
#[test]
fn rerouted_work_is_conserved() {
    let mut config = SimulationConfig::default();
    config.primary.vms.cores = 1;
    config.disaster.failure_probability = 1.;
    let sim = Simulation::new(123);
    let mut cloud_sim = DisasterRecoverySimulation::new(sim, config).unwrap();
    cloud_sim.run();

    let pool = cloud_sim.pool();
    for cloudlet in pool.borrow().iter() {
        assert!((cloudlet.consumed() - cloudlet.length()).abs() < 1e-6);
        assert!(cloudlet.remaining().abs() < 1e-6);
    }
}

// A backup without VMs cannot absorb anything: the run ends at the failure
// instant and all pending cloudlets are failed.
#[test]
fn disaster_with_zero_capacity_backup_fails_pending_work() {
    let mut config = SimulationConfig::default();
    config.disaster.failure_probability = 1.;
    config.backup.vms.count = 0;
    let sim = Simulation::new(123);
    let mut cloud_sim = DisasterRecoverySimulation::new(sim, config).unwrap();
    cloud_sim.run();

    assert_eq!(cloud_sim.current_time(), 10.);
    let primary_id = cloud_sim.primary().borrow().id() as i64;
    let records = cloud_sim.records();
    assert_eq!(records.len(), 20);
    for r in &records {
        assert_eq!(r.status, "Failed");
        assert_eq!(r.finish_time, -1.);
        // The cloudlets never reached the backup, so they are still reported
        // against the primary.
        assert_eq!(r.datacenter_id, primary_id);
        assert!(!r.affected_by_failover);
    }
    let summary = cloud_sim.summary();
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 20);
    assert_eq!(summary.avg_execution_time, 0.);
    assert_eq!(summary.avg_wait_time, 0.);
    assert_eq!(summary.avg_finish_time, 0.);

    // The pause preserved the work done so far: 5 cloudlets per 2000 MIPS VM
    // for 10 time units is 4000 instructions each.
    let pool = cloud_sim.pool();
    for cloudlet in pool.borrow().iter() {
        assert!((cloudlet.consumed() - 4000.).abs() < 1e-6);
        assert!((cloudlet.consumed() + cloudlet.remaining() - cloudlet.length()).abs() < 1e-6);
    }
}

// Runs with the same seed are fully reproducible, event for event.
#[test]
fn runs_are_reproducible() {
    let run = |seed: u64| {
        let sim = Simulation::new(seed);
        let mut cloud_sim = DisasterRecoverySimulation::new(sim, SimulationConfig::default()).unwrap();
        cloud_sim.run();
        let rows: Vec<String> = cloud_sim
            .records()
            .iter()
            .map(|r| {
                format!(
                    "{},{},{},{},{},{},{},{}",
                    r.cloudlet_id,
                    r.status,
                    r.datacenter_id,
                    r.vm_id,
                    r.execution_time,
                    r.wait_time,
                    r.start_time,
                    r.finish_time
                )
            })
            .collect();
        (cloud_sim.event_count(), cloud_sim.current_time().to_bits(), rows)
    };
    assert_eq!(run(7), run(7));
}
