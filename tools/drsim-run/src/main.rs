use std::io::Write;

use clap::Parser;
use env_logger::Builder;

use drsim_cloud::core::config::SimulationConfig;
use drsim_cloud::core::metrics::save_to_csv;
use drsim_cloud::simulation::DisasterRecoverySimulation;
use drsim_core::simulation::Simulation;

/// Runs the two-datacenter disaster recovery simulation
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Path to YAML file with simulation configuration (defaults are used if omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Random seed
    #[arg(short, long, default_value_t = 123)]
    seed: u64,

    /// Path to produced CSV file with per-cloudlet results
    #[arg(short, long)]
    output: Option<String>,
}

fn init_logger() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };

    let sim = Simulation::new(args.seed);
    let mut cloud_sim = DisasterRecoverySimulation::new(sim, config)?;
    cloud_sim.run();

    let records = cloud_sim.records();
    println!(
        "{:>10} {:>18} {:>13} {:>6} {:>14} {:>10} {:>10} {:>11} {:>9}",
        "CloudletID",
        "Status",
        "DatacenterId",
        "VMId",
        "ExecutionTime",
        "WaitTime",
        "StartTime",
        "FinishTime",
        "Affected"
    );
    for r in &records {
        println!(
            "{:>10} {:>18} {:>13} {:>6} {:>14.2} {:>10.2} {:>10.2} {:>11.2} {:>9}",
            r.cloudlet_id,
            r.status,
            r.datacenter_id,
            r.vm_id,
            r.execution_time,
            r.wait_time,
            r.start_time,
            r.finish_time,
            if r.affected_by_failover { "Yes" } else { "No" }
        );
    }

    let summary = cloud_sim.summary();
    let failover = cloud_sim.failover();
    let failover = failover.borrow();
    println!();
    match failover.failure_time() {
        Some(t) => println!("Disaster struck the primary datacenter at {:.2}", t),
        None => println!("No disaster occurred"),
    }
    println!(
        "Cloudlets: {} total, {} succeeded, {} failed, {} affected by failover",
        summary.total, summary.succeeded, summary.failed, summary.affected_by_failover
    );
    println!(
        "Averages over successful cloudlets: execution time {:.2}, wait time {:.2}, finish time {:.2}",
        summary.avg_execution_time, summary.avg_wait_time, summary.avg_finish_time
    );
    println!(
        "Simulated {:.2} time units, {} events",
        cloud_sim.current_time(),
        cloud_sim.event_count()
    );

    if let Some(path) = &args.output {
        save_to_csv(&records, path)?;
        println!("Saved per-cloudlet results to {}", path);
    }
    Ok(())
}
