//! Tests for placement, host accounting, admission and config validation.

use drsim_cloud::core::common::AllocationVerdict;
use drsim_cloud::core::config::{CloudletConfig, ConfigError, DisasterConfig, SimulationConfig};
use drsim_cloud::core::host::Host;
use drsim_cloud::core::vm::VmSpec;
use drsim_cloud::core::vm_placement::{BestFit, FirstFit, VmPlacementAlgorithm};
use drsim_cloud::simulation::DisasterRecoverySimulation;
use drsim_core::simulation::Simulation;

fn spec(id: u32, cores: u32, memory: u64) -> VmSpec {
    VmSpec {
        id,
        owner: 0,
        cores,
        mips_per_core: 1000.,
        memory,
        bandwidth: 100,
        disk_size: 100,
    }
}

#[test]
fn first_fit_picks_first_suitable_host() {
    let hosts = vec![
        Host::new(1, 3000., 1024, 1000, 10000),
        Host::new(4, 3000., 8192, 1000, 10000),
        Host::new(4, 3000., 8192, 1000, 10000),
    ];
    assert_eq!(FirstFit::new().select_host(&spec(0, 2, 2048), &hosts), Some(1));
    assert_eq!(FirstFit::new().select_host(&spec(0, 1, 512), &hosts), Some(0));
    assert_eq!(FirstFit::new().select_host(&spec(0, 8, 512), &hosts), None);
}

#[test]
fn best_fit_picks_host_with_least_available_cores() {
    let mut hosts = vec![Host::new(4, 3000., 8192, 1000, 10000), Host::new(4, 3000., 8192, 1000, 10000)];
    hosts[1].allocate(&spec(0, 3, 1024));
    assert_eq!(BestFit::new().select_host(&spec(1, 1, 512), &hosts), Some(1));
    assert_eq!(BestFit::new().select_host(&spec(1, 2, 512), &hosts), Some(0));
}

#[test]
fn host_releases_what_it_allocated() {
    let mut host = Host::new(4, 3000., 8192, 1000, 10000);
    let vm = spec(7, 2, 2048);
    host.allocate(&vm);
    assert_eq!(host.cores_available(), 2);
    assert_eq!(host.memory_available(), 8192 - 2048);
    assert_eq!(host.can_allocate(&spec(8, 3, 512)), AllocationVerdict::NotEnoughCpu);
    host.release(7);
    assert_eq!(host.cores_available(), 4);
    assert_eq!(host.memory_available(), 8192);
    assert!(host.vm_ids().is_empty());
}

fn single_vm_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.cloudlets = CloudletConfig {
        count: 3,
        length: 1000.,
        file_size: 300,
        output_size: 300,
        cores: 1,
    };
    config.primary.hosts.count = 1;
    config.primary.vms.count = 1;
    config.primary.vms.cores = 1;
    config.primary.vms.mips_per_core = 1000.;
    config.backup.vms.count = 0;
    config.disaster = DisasterConfig {
        check_interval: 10.,
        failure_probability: 0.,
    };
    config.vm_admission_limit = 2;
    config
}

// With 3 cloudlets of length 1000 on one 1000 MIPS VM limited to 2 concurrent
// cloudlets, the first two share the VM and finish at 2.0, the third runs
// alone afterwards and finishes at 3.0.
#[test]
fn admission_limit_queues_excess_cloudlets() {
    let sim = Simulation::new(123);
    let mut cloud_sim = DisasterRecoverySimulation::new(sim, single_vm_config()).unwrap();
    cloud_sim.run();

    let records = cloud_sim.records();
    assert_eq!(records.len(), 3);
    for r in &records {
        assert_eq!(r.status, "Success");
        assert!(!r.affected_by_failover);
    }
    assert!((records[0].finish_time - 2.).abs() < 1e-9);
    assert!((records[1].finish_time - 2.).abs() < 1e-9);
    assert!((records[2].finish_time - 3.).abs() < 1e-9);
    assert!((records[2].wait_time - 2.).abs() < 1e-9);
    assert!((records[2].start_time - 2.).abs() < 1e-9);
}

// Without a disaster the run is fully work conserving: every cloudlet
// succeeds and its timeline is contiguous.
#[test]
fn undisturbed_run_completes_all_cloudlets() {
    let mut config = SimulationConfig::default();
    config.disaster.failure_probability = 0.;
    let sim = Simulation::new(123);
    let mut cloud_sim = DisasterRecoverySimulation::new(sim, config).unwrap();
    cloud_sim.run();

    let records = cloud_sim.records();
    assert_eq!(records.len(), 20);
    for r in &records {
        assert_eq!(r.status, "Success");
        assert!(r.execution_time > 0.);
        assert!((r.finish_time - r.start_time - r.execution_time).abs() < 1e-9);
        assert_eq!(r.wait_time, 0.);
    }
    // Slowest VMs are the two backup ones: 3 cloudlets sharing 500 MIPS.
    let makespan = records.iter().map(|r| r.finish_time).fold(0., f64::max);
    assert!((makespan - 60.).abs() < 1e-9);
    let summary = cloud_sim.summary();
    assert_eq!(summary.succeeded, 20);
    assert_eq!(summary.affected_by_failover, 0);
}

#[test]
fn invalid_configs_are_rejected() {
    let mut config = SimulationConfig::default();
    config.disaster.failure_probability = 1.5;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidConfiguration(_))));

    let mut config = SimulationConfig::default();
    config.primary.hosts.count = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidConfiguration(_))));

    let mut config = SimulationConfig::default();
    config.vm_admission_limit = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidConfiguration(_))));

    let mut config = SimulationConfig::default();
    config.placement_algorithm = "WorstFit".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidConfiguration(_))));
}
