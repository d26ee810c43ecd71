use std::env;
use std::process;

use tandem_queue::output;
use tandem_queue::{
    ExperimentConfig, ReplicationSummary, RunReport, Stage, TandemAnalytic, TandemError,
    TandemSimulation,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [experiment.toml]", args[0]);
        process::exit(1);
    }

    if let Err(e) = run(args.get(1).map(String::as_str)) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(config_path: Option<&str>) -> Result<(), TandemError> {
    let config = match config_path {
        Some(path) => {
            println!("Loading experiment config: {path}");
            ExperimentConfig::load(path)?
        }
        None => ExperimentConfig::default(),
    };

    println!("=== Tandem Queue: tasting then survey ===\n");
    let simulation = TandemSimulation::new(config.model.clone())?;
    let model = simulation.config();
    println!(
        "λ = {:.2}, μ1 = {:.2}, μ2 = {:.2}, c1 = {}, c2 = {}, N = {}, horizon = {:.2}, seed = {}",
        model.arrival_rate,
        model.service_rate_stage1,
        model.service_rate_stage2,
        model.capacity_stage1,
        model.capacity_stage2,
        model.client_count,
        model.horizon,
        simulation.seed()
    );

    let report = simulation.run()?;
    let analytic = TandemAnalytic::new(model)?;
    print_report(&report, &analytic);

    if let Some(dir) = &config.output.dir {
        output::write_run(&report, dir, &config.output)?;
        println!("\nRun outputs written to {}", dir.display());
    }

    let replications = config.experiment.replications;
    if replications > 1 {
        println!("\nRunning {replications} replications...");
        let results = simulation.replicate(replications, config.experiment.threads);
        for (i, result) in results.iter().enumerate() {
            if let Err(e) = result {
                eprintln!("Replication {i} failed: {e}");
            }
        }
        let summary = ReplicationSummary::from_results(&results);
        print_summary(&summary, &analytic);

        if let (Some(dir), true) = (&config.output.dir, config.output.save_summary) {
            output::write_summary(&summary, &results, dir)?;
        }
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn print_report(report: &RunReport, analytic: &TandemAnalytic) {
    for stage in Stage::ALL {
        let mm1 = analytic.stage(stage);
        println!("\n{stage} (simulated | M/M/1):");
        println!("  Mean clients in system:         {:.2}", mm1.mean_in_system());
        println!(
            "  Mean time in system per client: {:.2} minutes",
            mm1.mean_time_in_system()
        );
        println!(
            "  Mean clients waiting in queue:  {} | {:.2}",
            fmt_opt(report.mean_queue_length(stage)),
            mm1.mean_in_queue()
        );
        println!(
            "  Mean queue length on entry:     {}",
            fmt_opt(report.ledger.mean_queue_length(stage))
        );
        println!(
            "  Mean wait in queue:             {} | {:.2} minutes",
            fmt_opt(report.ledger.mean_waiting_time(stage)),
            mm1.mean_wait_in_queue()
        );
        println!(
            "  Utilization:                    {} | {:.2}",
            fmt_opt(report.utilization(stage)),
            mm1.utilization()
        );
    }

    println!("\nSystem totals:");
    println!("  Mean clients in system:         {:.2}", analytic.mean_in_system());
    println!(
        "  Mean time in system per client: {} | {:.2} minutes",
        fmt_opt(report.ledger.mean_sojourn()),
        analytic.mean_time_in_system()
    );
    println!("  Utilization (average):          {:.2}", analytic.utilization());
    println!(
        "  Clients: {} spawned, {} completed, {} still in the system at t = {:.2}",
        report.spawned, report.completed, report.truncated, report.horizon
    );
}

fn print_summary(summary: &ReplicationSummary, analytic: &TandemAnalytic) {
    println!(
        "\nAcross {} replications ({} failed):",
        summary.replications, summary.failed
    );
    if let Some(sojourn) = &summary.mean_sojourn {
        println!(
            "  Mean sojourn: {:.3} ± {:.3} (analytic {:.3})",
            sojourn.mean,
            sojourn.std,
            analytic.mean_time_in_system()
        );
    }
    for stage in Stage::ALL {
        let stage_summary = summary.stage(stage);
        if let Some(wait) = &stage_summary.mean_wait {
            println!(
                "  {stage} wait: {:.3} ± {:.3} (analytic {:.3})",
                wait.mean,
                wait.std,
                analytic.stage(stage).mean_wait_in_queue()
            );
        }
        if let Some(utilization) = &stage_summary.utilization {
            println!(
                "  {stage} utilization: {:.3} ± {:.3} (analytic {:.3})",
                utilization.mean,
                utilization.std,
                analytic.stage(stage).utilization()
            );
        }
    }
    println!(
        "  Clients: {} completed, {} truncated",
        summary.total_completed, summary.total_truncated
    );
}
