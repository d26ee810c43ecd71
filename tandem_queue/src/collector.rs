use crate::ledger::StatsLedger;
use crate::{Event, Stats};

/// Sole writer of the run's [`StatsLedger`].
#[derive(Default)]
pub struct StatisticsCollector {
    ledger: StatsLedger,
}

impl StatisticsCollector {
    pub fn new() -> StatisticsCollector {
        StatisticsCollector::default()
    }

    pub fn ledger(&self) -> &StatsLedger {
        &self.ledger
    }
}

impl des::Agent<Event, Stats> for StatisticsCollector {
    fn act(&mut self, _current_t: f64, data: &Event) -> des::Response<Event, Stats> {
        match data {
            Event::StageStarted {
                stage,
                queue_length,
                wait,
                ..
            } => {
                self.ledger.record_queue_length(*stage, *queue_length);
                self.ledger.record_waiting_time(*stage, *wait);
            }
            Event::ClientDeparted { sojourn, .. } => self.ledger.record_sojourn(*sojourn),
            _ => {}
        }
        des::Response::new()
    }

    fn stats(&self) -> Stats {
        Stats::LedgerStats(self.ledger.clone())
    }
}
