//! CSV and JSON export for charting outside the simulator
//!
//! A run directory holds:
//! - queue_trace.csv: `time,stage,queue_length` at every queue change
//! - clients.csv: one row per client, blanks for stages not reached
//! - run.json: the full [`RunReport`]
//!
//! Replicated experiments add replications.csv and summary.json.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::config::OutputSettings;
use crate::error::TandemError;
use crate::report::{ReplicationSummary, RunReport};
use crate::Stage;

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_queue_trace<W: io::Write>(report: &RunReport, writer: W) -> Result<(), TandemError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["time", "stage", "queue_length"])?;
    for stage in Stage::ALL {
        for (t, queue_length) in &report.resource(stage).queue_trace {
            wtr.write_record(&[t.to_string(), stage.to_string(), queue_length.to_string()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_clients<W: io::Write>(report: &RunReport, writer: W) -> Result<(), TandemError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "client_id",
        "arrival_time",
        "phase",
        "tasting_queue_on_entry",
        "tasting_wait",
        "tasting_service",
        "survey_queue_on_entry",
        "survey_wait",
        "survey_service",
        "departure_time",
        "sojourn",
    ])?;
    for client in &report.clients {
        wtr.write_record(&[
            client.client_id.to_string(),
            client.arrival_time.to_string(),
            client.phase.to_string(),
            opt(client.tasting.queue_on_entry),
            opt(client.tasting.wait),
            opt(client.tasting.service_time()),
            opt(client.survey.queue_on_entry),
            opt(client.survey.wait),
            opt(client.survey.service_time()),
            opt(client.departure_time),
            opt(client.sojourn()),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per successful replication.
pub fn write_replications<W: io::Write>(
    results: &[Result<RunReport, String>],
    writer: W,
) -> Result<(), TandemError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "replication",
        "seed",
        "completed",
        "truncated",
        "mean_sojourn",
        "tasting_mean_wait",
        "survey_mean_wait",
        "tasting_utilization",
        "survey_utilization",
    ])?;
    for (replication, report) in results.iter().enumerate() {
        let Ok(report) = report else { continue };
        wtr.write_record(&[
            replication.to_string(),
            report.seed.to_string(),
            report.completed.to_string(),
            report.truncated.to_string(),
            opt(report.ledger.mean_sojourn()),
            opt(report.ledger.mean_waiting_time(Stage::Tasting)),
            opt(report.ledger.mean_waiting_time(Stage::Survey)),
            opt(report.utilization(Stage::Tasting)),
            opt(report.utilization(Stage::Survey)),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), TandemError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write the files of a single run selected by `settings` into `dir`.
pub fn write_run<P: AsRef<Path>>(
    report: &RunReport,
    dir: P,
    settings: &OutputSettings,
) -> Result<(), TandemError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    if settings.save_queue_traces {
        write_queue_trace(report, fs::File::create(dir.join("queue_trace.csv"))?)?;
    }
    if settings.save_clients {
        write_clients(report, fs::File::create(dir.join("clients.csv"))?)?;
    }
    if settings.save_summary {
        write_json(report, dir.join("run.json"))?;
    }
    Ok(())
}

pub fn write_summary<P: AsRef<Path>>(
    summary: &ReplicationSummary,
    results: &[Result<RunReport, String>],
    dir: P,
) -> Result<(), TandemError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_replications(results, fs::File::create(dir.join("replications.csv"))?)?;
    write_json(summary, dir.join("summary.json"))?;
    Ok(())
}
