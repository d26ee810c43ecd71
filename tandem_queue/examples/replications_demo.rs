//! Independent replications of the tandem queue in parallel
//!
//! Run with:
//!   cargo run --example replications_demo -p tandem_queue

use des::parallel::{simple_progress_reporter, ParallelRunner};
use tandem_queue::{
    ReplicationSummary, RunReport, TandemAnalytic, TandemConfig, TandemError, TandemSimulation,
};

fn main() -> Result<(), TandemError> {
    println!("=== Tandem queue replications ===\n");

    let config = TandemConfig {
        client_count: 500,
        horizon: 300.0,
        ..TandemConfig::default()
    }
    .with_seed(42);
    let simulation = TandemSimulation::new(config)?;
    let analytic = TandemAnalytic::new(simulation.config())?;

    // High level: let the simulation seed and collect each replication
    let start = std::time::Instant::now();
    let results = simulation.replicate(200, None);
    let summary = ReplicationSummary::from_results(&results);
    println!(
        "{} replications in {:.2}s, {} failed",
        summary.replications,
        start.elapsed().as_secs_f64(),
        summary.failed
    );
    if let Some(sojourn) = summary.mean_sojourn {
        println!(
            "Mean sojourn {:.3} ± {:.3} (M/M/1 tandem: {:.3})",
            sojourn.mean,
            sojourn.std,
            analytic.mean_time_in_system()
        );
    }

    // Low level: drive ParallelRunner directly with custom seeds
    let horizon = simulation.config().horizon;
    let seed_of = |replication: usize| 1_000 + replication as u64;
    let raw = ParallelRunner::new(20, |replication| simulation.event_loop(seed_of(replication)))
        .progress(simple_progress_reporter(5))
        .num_threads(4)
        .run(horizon);
    let completed: usize = raw
        .into_iter()
        .enumerate()
        .filter_map(|(i, stats)| RunReport::from_stats(stats.ok()?, horizon, seed_of(i)).ok())
        .map(|report| report.completed)
        .sum();
    println!("Clients completed across 20 custom-seeded runs: {completed}");

    Ok(())
}
