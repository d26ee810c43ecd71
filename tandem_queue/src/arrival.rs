use serde::Serialize;
use tracing::trace;

use crate::client::{Client, ServiceDemand};
use crate::variates::DurationSource;
use crate::{Event, Stats};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrivalStats {
    pub target: usize,
    pub spawned: usize,
    pub arrival_times: Vec<f64>,
}

/// Renewal process of client arrivals, capped at `target` clients.
///
/// Each arrival draws the client's service demand at both stations, so the
/// three random streams never interleave.
pub struct ArrivalProcess {
    inter_arrival: Box<dyn DurationSource>,
    tasting_service: Box<dyn DurationSource>,
    survey_service: Box<dyn DurationSource>,
    stats: ArrivalStats,
}

impl ArrivalProcess {
    pub fn with_sources(
        target: usize,
        inter_arrival: Box<dyn DurationSource>,
        tasting_service: Box<dyn DurationSource>,
        survey_service: Box<dyn DurationSource>,
    ) -> ArrivalProcess {
        ArrivalProcess {
            inter_arrival,
            tasting_service,
            survey_service,
            stats: ArrivalStats {
                target,
                spawned: 0,
                arrival_times: Vec::new(),
            },
        }
    }

    fn next_arrival(&mut self, current_t: f64) -> (f64, Event) {
        (current_t + self.inter_arrival.draw(), Event::ArrivalDue)
    }

    fn spawn_client(&mut self, current_t: f64) -> des::Response<Event, Stats> {
        let client_id = self.stats.spawned;
        let demand = ServiceDemand {
            tasting: self.tasting_service.draw(),
            survey: self.survey_service.draw(),
        };
        self.stats.spawned += 1;
        self.stats.arrival_times.push(current_t);
        trace!(t = current_t, client_id, "client arrived");

        let mut events = vec![(current_t, Event::ClientArrived { client_id })];
        if self.stats.spawned < self.stats.target {
            events.push(self.next_arrival(current_t));
        }
        let client: Box<dyn des::Agent<Event, Stats>> =
            Box::new(Client::new(client_id, current_t, demand));
        des::Response::spawn(events, vec![client])
    }
}

impl des::Agent<Event, Stats> for ArrivalProcess {
    fn act(&mut self, current_t: f64, data: &Event) -> des::Response<Event, Stats> {
        match data {
            Event::Start if self.stats.target > 0 => {
                let (t, event) = self.next_arrival(current_t);
                des::Response::event(t, event)
            }
            Event::ArrivalDue => self.spawn_client(current_t),
            _ => des::Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::ArrivalStats(self.stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variates::Scripted;
    use des::Agent;

    fn process(target: usize) -> ArrivalProcess {
        ArrivalProcess::with_sources(
            target,
            Box::new(Scripted::new(vec![1.0, 0.5])),
            Box::new(Scripted::new(vec![2.0])),
            Box::new(Scripted::new(vec![1.0])),
        )
    }

    #[test]
    fn start_schedules_the_first_arrival() {
        let mut arrivals = process(3);
        let response = arrivals.act(0.0, &Event::Start);
        assert_eq!(response.events, vec![(1.0, Event::ArrivalDue)]);
        assert!(response.agents.is_empty());
    }

    #[test]
    fn arrival_spawns_a_client_and_schedules_the_next() {
        let mut arrivals = process(3);
        arrivals.act(0.0, &Event::Start);

        let response = arrivals.act(1.0, &Event::ArrivalDue);

        assert_eq!(response.agents.len(), 1);
        assert_eq!(
            response.events,
            vec![(1.0, Event::ClientArrived { client_id: 0 }), (1.5, Event::ArrivalDue)]
        );
    }

    #[test]
    fn no_arrivals_past_the_target() {
        let mut arrivals = process(2);
        arrivals.act(0.0, &Event::Start);
        arrivals.act(1.0, &Event::ArrivalDue);

        let last = arrivals.act(1.5, &Event::ArrivalDue);

        assert_eq!(last.events, vec![(1.5, Event::ClientArrived { client_id: 1 })]);
        match arrivals.stats() {
            Stats::ArrivalStats(stats) => {
                assert_eq!(stats.spawned, 2);
                assert_eq!(stats.arrival_times, vec![1.0, 1.5]);
            }
            other => panic!("expected ArrivalStats, got {other:?}"),
        }
    }

    #[test]
    fn zero_target_never_arrives() {
        let mut arrivals = process(0);
        assert!(arrivals.act(0.0, &Event::Start).events.is_empty());
    }
}
