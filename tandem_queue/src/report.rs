//! Post-run view of the agent stats, and summaries across replications

use des::SimError;
use serde::Serialize;
use tracing::warn;

use crate::arrival::ArrivalStats;
use crate::client::{ClientRecord, Phase};
use crate::ledger::StatsLedger;
use crate::resource::ResourceStats;
use crate::{Stage, Stats};

/// Everything measured in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub horizon: f64,
    /// End of the observation window: the horizon, or the last departure
    /// when every client finished before it.
    pub observation_end: f64,
    pub target_clients: usize,
    pub spawned: usize,
    pub completed: usize,
    /// Clients still inside the system when the horizon was reached
    pub truncated: usize,
    pub ledger: StatsLedger,
    pub tasting: ResourceStats,
    pub survey: ResourceStats,
    pub arrival_times: Vec<f64>,
    /// Ordered by client id
    pub clients: Vec<ClientRecord>,
}

fn inconsistent(t: f64, reason: String) -> SimError {
    SimError::InvariantViolation { t, reason }
}

impl RunReport {
    /// Assemble a report from the stats of every agent in the loop.
    ///
    /// Fails if the agents disagree about who is where.
    pub fn from_stats(stats: Vec<Stats>, horizon: f64, seed: u64) -> Result<RunReport, SimError> {
        let mut arrivals: Option<ArrivalStats> = None;
        let mut ledger: Option<StatsLedger> = None;
        let mut resources: [Option<ResourceStats>; 2] = [None, None];
        let mut clients = Vec::new();

        for stat in stats {
            match stat {
                Stats::ArrivalStats(s) => arrivals = Some(s),
                Stats::LedgerStats(s) => ledger = Some(s),
                Stats::ResourceStats(s) => {
                    let index = s.stage.index();
                    resources[index] = Some(s);
                }
                Stats::ClientStats(record) => clients.push(record),
            }
        }

        let [tasting, survey] = resources;
        let (Some(arrivals), Some(ledger), Some(tasting), Some(survey)) =
            (arrivals, ledger, tasting, survey)
        else {
            return Err(inconsistent(
                horizon,
                "event loop is missing a tandem queue agent".to_string(),
            ));
        };
        clients.sort_by_key(|c| c.client_id);

        let completed = clients.iter().filter(|c| c.is_completed()).count();
        let truncated = clients.len() - completed;
        let drained = arrivals.spawned == arrivals.target && truncated == 0;
        let observation_end = if drained {
            clients
                .iter()
                .filter_map(|c| c.departure_time)
                .fold(0.0, f64::max)
        } else {
            horizon
        };

        if clients.len() != arrivals.spawned {
            return Err(inconsistent(
                observation_end,
                format!("{} clients spawned but {} found", arrivals.spawned, clients.len()),
            ));
        }
        if ledger.sojourn_count() != completed {
            return Err(inconsistent(
                observation_end,
                format!(
                    "{completed} clients departed but {} sojourns recorded",
                    ledger.sojourn_count()
                ),
            ));
        }
        for station in [&tasting, &survey] {
            let stage = station.stage;
            let in_service = clients.iter().filter(|c| c.phase == Phase::InService(stage)).count();
            let waiting = clients.iter().filter(|c| c.phase == Phase::Waiting(stage)).count();
            if station.current_holders != in_service || station.current_queue_length != waiting {
                return Err(inconsistent(
                    observation_end,
                    format!(
                        "{stage} station holds {} and queues {}, \
                         clients report {in_service} in service and {waiting} waiting",
                        station.current_holders, station.current_queue_length
                    ),
                ));
            }
            if station.current_holders > station.capacity {
                return Err(inconsistent(
                    observation_end,
                    format!("{stage} station is over capacity"),
                ));
            }
        }

        if truncated > 0 {
            warn!(
                truncated,
                spawned = arrivals.spawned,
                horizon,
                "clients still in the system at the horizon"
            );
        }

        Ok(RunReport {
            seed,
            horizon,
            observation_end,
            target_clients: arrivals.target,
            spawned: arrivals.spawned,
            completed,
            truncated,
            ledger,
            tasting,
            survey,
            arrival_times: arrivals.arrival_times,
            clients,
        })
    }

    pub fn resource(&self, stage: Stage) -> &ResourceStats {
        match stage {
            Stage::Tasting => &self.tasting,
            Stage::Survey => &self.survey,
        }
    }

    /// Busy fraction of the station over the observation window.
    pub fn utilization(&self, stage: Stage) -> Option<f64> {
        self.resource(stage).utilization(self.observation_end)
    }

    /// Time-averaged number waiting at the station over the observation window.
    pub fn mean_queue_length(&self, stage: Stage) -> Option<f64> {
        self.resource(stage).mean_queue_length(self.observation_end)
    }

    pub fn completed_clients(&self) -> impl Iterator<Item = &ClientRecord> {
        self.clients.iter().filter(|c| c.is_completed())
    }

    pub fn truncated_clients(&self) -> impl Iterator<Item = &ClientRecord> {
        self.clients.iter().filter(|c| !c.is_completed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl MeanStd {
    /// Population statistics of `values`; `None` when empty.
    pub fn from_samples(values: &[f64]) -> Option<MeanStd> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        Some(MeanStd {
            mean,
            std: variance.sqrt(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            n,
        })
    }
}

fn across<F>(reports: &[&RunReport], statistic: F) -> Option<MeanStd>
where
    F: Fn(&RunReport) -> Option<f64>,
{
    let values: Vec<f64> = reports.iter().filter_map(|r| statistic(r)).collect();
    MeanStd::from_samples(&values)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub mean_wait: Option<MeanStd>,
    pub mean_queue_on_entry: Option<MeanStd>,
    pub utilization: Option<MeanStd>,
}

/// Across-run view of a batch of replications.
///
/// Each statistic is taken over the per-run means; runs without a sample
/// for it are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicationSummary {
    pub replications: usize,
    pub failed: usize,
    pub mean_sojourn: Option<MeanStd>,
    pub tasting: StageSummary,
    pub survey: StageSummary,
    pub total_completed: usize,
    pub total_truncated: usize,
}

impl ReplicationSummary {
    pub fn from_results(results: &[Result<RunReport, String>]) -> ReplicationSummary {
        let reports: Vec<&RunReport> = results.iter().filter_map(|r| r.as_ref().ok()).collect();

        let stage_summary = |stage: Stage| StageSummary {
            stage,
            mean_wait: across(&reports, |r| r.ledger.mean_waiting_time(stage)),
            mean_queue_on_entry: across(&reports, |r| r.ledger.mean_queue_length(stage)),
            utilization: across(&reports, |r| r.utilization(stage)),
        };

        ReplicationSummary {
            replications: results.len(),
            failed: results.len() - reports.len(),
            mean_sojourn: across(&reports, |r| r.ledger.mean_sojourn()),
            tasting: stage_summary(Stage::Tasting),
            survey: stage_summary(Stage::Survey),
            total_completed: reports.iter().map(|r| r.completed).sum(),
            total_truncated: reports.iter().map(|r| r.truncated).sum(),
        }
    }

    pub fn stage(&self, stage: Stage) -> &StageSummary {
        match stage {
            Stage::Tasting => &self.tasting,
            Stage::Survey => &self.survey,
        }
    }
}
