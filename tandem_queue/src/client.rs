use std::fmt;

use serde::Serialize;

use crate::{Event, Stage, Stats};

/// Where a client is in the tasting → survey pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Arrived,
    Waiting(Stage),
    InService(Stage),
    Departed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Arrived => write!(f, "arrived"),
            Phase::Waiting(stage) => write!(f, "waiting for {stage}"),
            Phase::InService(stage) => write!(f, "in {stage} service"),
            Phase::Departed => write!(f, "departed"),
        }
    }
}

/// Service time the client will need at each station, drawn on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServiceDemand {
    pub tasting: f64,
    pub survey: f64,
}

impl ServiceDemand {
    pub fn for_stage(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Tasting => self.tasting,
            Stage::Survey => self.survey,
        }
    }
}

/// Timings of one client at one station. Unset until reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageVisit {
    pub requested_at: Option<f64>,
    pub queue_on_entry: Option<usize>,
    pub wait: Option<f64>,
    pub service_start: Option<f64>,
    pub service_end: Option<f64>,
}

impl StageVisit {
    pub fn service_time(&self) -> Option<f64> {
        Some(self.service_end? - self.service_start?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRecord {
    pub client_id: usize,
    pub arrival_time: f64,
    pub phase: Phase,
    pub demand: ServiceDemand,
    pub tasting: StageVisit,
    pub survey: StageVisit,
    pub departure_time: Option<f64>,
}

impl ClientRecord {
    pub fn visit(&self, stage: Stage) -> &StageVisit {
        match stage {
            Stage::Tasting => &self.tasting,
            Stage::Survey => &self.survey,
        }
    }

    fn visit_mut(&mut self, stage: Stage) -> &mut StageVisit {
        match stage {
            Stage::Tasting => &mut self.tasting,
            Stage::Survey => &mut self.survey,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Departed
    }

    pub fn sojourn(&self) -> Option<f64> {
        self.departure_time.map(|departed| departed - self.arrival_time)
    }
}

/// One visitor. Listens only to events carrying its own id.
pub struct Client {
    record: ClientRecord,
}

impl Client {
    pub fn new(client_id: usize, arrival_time: f64, demand: ServiceDemand) -> Client {
        Client {
            record: ClientRecord {
                client_id,
                arrival_time,
                phase: Phase::Arrived,
                demand,
                tasting: StageVisit::default(),
                survey: StageVisit::default(),
                departure_time: None,
            },
        }
    }

    pub fn record(&self) -> &ClientRecord {
        &self.record
    }

    fn unexpected(&self, event: &str) -> des::Response<Event, Stats> {
        des::Response::fault(format!(
            "client {} got {event} while {}",
            self.record.client_id, self.record.phase
        ))
    }

    fn request(&mut self, now: f64, stage: Stage) -> (f64, Event) {
        self.record.phase = Phase::Waiting(stage);
        self.record.visit_mut(stage).requested_at = Some(now);
        (
            now,
            Event::ResourceRequested {
                stage,
                client_id: self.record.client_id,
            },
        )
    }

    fn start_service(
        &mut self,
        now: f64,
        stage: Stage,
        queue_on_entry: usize,
    ) -> des::Response<Event, Stats> {
        if self.record.phase != Phase::Waiting(stage) {
            return self.unexpected(&format!("the {stage} server"));
        }
        let client_id = self.record.client_id;
        let demand = self.record.demand.for_stage(stage);
        let visit = self.record.visit_mut(stage);
        let wait = now - visit.requested_at.unwrap_or(now);
        visit.queue_on_entry = Some(queue_on_entry);
        visit.wait = Some(wait);
        visit.service_start = Some(now);
        self.record.phase = Phase::InService(stage);

        des::Response::events(vec![
            (
                now,
                Event::StageStarted {
                    stage,
                    client_id,
                    queue_length: queue_on_entry,
                    wait,
                },
            ),
            (now + demand, Event::ServiceCompleted { stage, client_id }),
        ])
    }

    fn finish_service(&mut self, now: f64, stage: Stage) -> des::Response<Event, Stats> {
        if self.record.phase != Phase::InService(stage) {
            return self.unexpected(&format!("end of {stage} service"));
        }
        let client_id = self.record.client_id;
        self.record.visit_mut(stage).service_end = Some(now);
        let release = (now, Event::ResourceReleased { stage, client_id });

        match stage.next() {
            Some(next) => {
                let request = self.request(now, next);
                des::Response::events(vec![release, request])
            }
            None => {
                self.record.phase = Phase::Departed;
                self.record.departure_time = Some(now);
                let sojourn = now - self.record.arrival_time;
                let departed = (now, Event::ClientDeparted { client_id, sojourn });
                des::Response::events(vec![release, departed])
            }
        }
    }
}

impl des::Agent<Event, Stats> for Client {
    fn act(&mut self, current_t: f64, data: &Event) -> des::Response<Event, Stats> {
        let own = self.record.client_id;
        match data {
            Event::ClientArrived { client_id } if *client_id == own => {
                if self.record.phase != Phase::Arrived {
                    return self.unexpected("a second arrival");
                }
                let (t, request) = self.request(current_t, Stage::Tasting);
                des::Response::event(t, request)
            }
            Event::ResourceAcquired {
                stage,
                client_id,
                queue_on_entry,
            } if *client_id == own => self.start_service(current_t, *stage, *queue_on_entry),
            Event::ServiceCompleted { stage, client_id } if *client_id == own => {
                self.finish_service(current_t, *stage)
            }
            _ => des::Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::ClientStats(self.record.clone())
    }
}
