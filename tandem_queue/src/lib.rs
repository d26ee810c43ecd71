//! Two-stage tandem queue: every client visits a tasting station, then a
//! survey station, then leaves.
//!
//! Agents:
//! - ArrivalProcess: Poisson arrivals, spawns one Client per arrival
//! - Resource: one per station, FIFO with fixed capacity
//! - Client: walks through both stations and reports its timings
//! - StatisticsCollector: owns the StatsLedger
//!
//! `TandemSimulation` wires them into a `des::EventLoop` and turns the final
//! agent stats into a `RunReport`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod analytic;
pub mod arrival;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod ledger;
pub mod output;
pub mod report;
pub mod resource;
pub mod simulation;
pub mod variates;

pub use analytic::{MM1, TandemAnalytic};
pub use arrival::{ArrivalProcess, ArrivalStats};
pub use client::{Client, ClientRecord, Phase, ServiceDemand, StageVisit};
pub use collector::StatisticsCollector;
pub use config::{ExperimentConfig, TandemConfig};
pub use error::{ConfigError, TandemError};
pub use ledger::StatsLedger;
pub use report::{MeanStd, ReplicationSummary, RunReport};
pub use resource::{Resource, ResourceStats};
pub use simulation::TandemSimulation;

/// The two stations, in visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Tasting,
    Survey,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Tasting, Stage::Survey];

    pub fn index(self) -> usize {
        match self {
            Stage::Tasting => 0,
            Stage::Survey => 1,
        }
    }

    /// Station visited after this one, if any.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Tasting => Some(Stage::Survey),
            Stage::Survey => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Tasting => write!(f, "tasting"),
            Stage::Survey => write!(f, "survey"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    /// Wake-up of the arrival process: the next client walks in.
    ArrivalDue,
    ClientArrived {
        client_id: usize,
    },
    ResourceRequested {
        stage: Stage,
        client_id: usize,
    },
    /// `queue_on_entry` is the number of clients that were already waiting
    /// when this client issued its request.
    ResourceAcquired {
        stage: Stage,
        client_id: usize,
        queue_on_entry: usize,
    },
    ResourceReleased {
        stage: Stage,
        client_id: usize,
    },
    StageStarted {
        stage: Stage,
        client_id: usize,
        queue_length: usize,
        wait: f64,
    },
    ServiceCompleted {
        stage: Stage,
        client_id: usize,
    },
    ClientDeparted {
        client_id: usize,
        sojourn: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stats {
    ArrivalStats(ArrivalStats),
    ResourceStats(ResourceStats),
    ClientStats(ClientRecord),
    LedgerStats(StatsLedger),
}
