use serde::Serialize;

use crate::Stage;

/// Samples taken at one station, one per client that reached service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageSeries {
    pub queue_lengths: Vec<usize>,
    pub waiting_times: Vec<f64>,
}

/// Append-only record of everything measured during a run.
///
/// Aggregates are computed on read; nothing derived is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsLedger {
    pub tasting: StageSeries,
    pub survey: StageSeries,
    pub sojourn_times: Vec<f64>,
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

impl StatsLedger {
    pub fn new() -> StatsLedger {
        StatsLedger::default()
    }

    pub fn series(&self, stage: Stage) -> &StageSeries {
        match stage {
            Stage::Tasting => &self.tasting,
            Stage::Survey => &self.survey,
        }
    }

    fn series_mut(&mut self, stage: Stage) -> &mut StageSeries {
        match stage {
            Stage::Tasting => &mut self.tasting,
            Stage::Survey => &mut self.survey,
        }
    }

    pub fn record_queue_length(&mut self, stage: Stage, value: usize) {
        self.series_mut(stage).queue_lengths.push(value);
    }

    pub fn record_waiting_time(&mut self, stage: Stage, value: f64) {
        self.series_mut(stage).waiting_times.push(value);
    }

    pub fn record_sojourn(&mut self, value: f64) {
        self.sojourn_times.push(value);
    }

    pub fn queue_lengths(&self, stage: Stage) -> &[usize] {
        &self.series(stage).queue_lengths
    }

    pub fn waiting_times(&self, stage: Stage) -> &[f64] {
        &self.series(stage).waiting_times
    }

    pub fn sojourn_times(&self) -> &[f64] {
        &self.sojourn_times
    }

    /// Mean number of clients found waiting on entry.
    pub fn mean_queue_length(&self, stage: Stage) -> Option<f64> {
        let samples = self.queue_lengths(stage);
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<usize>() as f64 / samples.len() as f64)
    }

    pub fn mean_waiting_time(&self, stage: Stage) -> Option<f64> {
        mean(self.waiting_times(stage))
    }

    pub fn mean_sojourn(&self) -> Option<f64> {
        mean(&self.sojourn_times)
    }

    pub fn stage_count(&self, stage: Stage) -> usize {
        self.waiting_times(stage).len()
    }

    pub fn sojourn_count(&self) -> usize {
        self.sojourn_times.len()
    }
}
