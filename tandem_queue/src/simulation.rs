use des::parallel::{simple_progress_reporter, ParallelRunner};
use des::{Agent, EventLoop};
use tracing::{debug, info};

use crate::arrival::ArrivalProcess;
use crate::collector::StatisticsCollector;
use crate::config::TandemConfig;
use crate::error::TandemError;
use crate::report::RunReport;
use crate::resource::Resource;
use crate::variates::{DurationSource, ExpRate, StreamSeeds};
use crate::{Event, Stage, Stats};

/// Wire an arrival process, both stations and a collector into a fresh loop
/// primed with `Event::Start` at t = 0.
pub fn build_event_loop(
    arrivals: ArrivalProcess,
    capacities: [usize; 2],
) -> EventLoop<Event, Stats> {
    let tasting = capacities[Stage::Tasting.index()];
    let survey = capacities[Stage::Survey.index()];
    let agents: Vec<Box<dyn Agent<Event, Stats>>> = vec![
        Box::new(arrivals),
        Box::new(Resource::new(Stage::Tasting, tasting)),
        Box::new(Resource::new(Stage::Survey, survey)),
        Box::new(StatisticsCollector::new()),
    ];
    EventLoop::new(vec![(0.0, Event::Start)], agents)
}

/// A validated model ready to be run once or replicated.
#[derive(Debug, Clone)]
pub struct TandemSimulation {
    config: TandemConfig,
    seed: u64,
    inter_arrival: ExpRate,
    tasting: ExpRate,
    survey: ExpRate,
}

impl TandemSimulation {
    /// Validate `config` and fix the run seed, drawing a fresh one if unset.
    pub fn new(config: TandemConfig) -> Result<TandemSimulation, TandemError> {
        config.validate()?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Ok(TandemSimulation {
            inter_arrival: ExpRate::new(config.arrival_rate)?,
            tasting: ExpRate::new(config.service_rate(Stage::Tasting))?,
            survey: ExpRate::new(config.service_rate(Stage::Survey))?,
            config,
            seed,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &TandemConfig {
        &self.config
    }

    /// Seed of replication `replication`; replication 0 is the base run.
    pub fn replication_seed(&self, replication: usize) -> u64 {
        self.seed.wrapping_add(replication as u64)
    }

    /// A loop whose three random streams all derive from `seed`.
    pub fn event_loop(&self, seed: u64) -> EventLoop<Event, Stats> {
        let seeds = StreamSeeds::derive(seed);
        let source = |law: &ExpRate, seed: u64| -> Box<dyn DurationSource> {
            Box::new(law.stream(seed))
        };
        let arrivals = ArrivalProcess::with_sources(
            self.config.client_count,
            source(&self.inter_arrival, seeds.arrivals),
            source(&self.tasting, seeds.service(Stage::Tasting)),
            source(&self.survey, seeds.service(Stage::Survey)),
        );
        let capacities = [self.config.capacity_stage1, self.config.capacity_stage2];
        build_event_loop(arrivals, capacities)
    }

    pub fn run(&self) -> Result<RunReport, TandemError> {
        self.run_seeded(self.seed)
    }

    fn run_seeded(&self, seed: u64) -> Result<RunReport, TandemError> {
        debug!(seed, horizon = self.config.horizon, "run started");
        let mut event_loop = self.event_loop(seed);
        event_loop.run(self.config.horizon)?;
        Ok(RunReport::from_stats(event_loop.stats(), self.config.horizon, seed)?)
    }

    /// Run `replications` independent copies, seeded `seed, seed + 1, ...`.
    ///
    /// `results[i]` belongs to replication `i`.
    pub fn replicate(
        &self,
        replications: usize,
        threads: Option<usize>,
    ) -> Vec<Result<RunReport, String>> {
        info!(replications, seed = self.seed, "running replications");
        let mut runner = ParallelRunner::new(replications, |replication| {
            self.event_loop(self.replication_seed(replication))
        })
        .progress(simple_progress_reporter((replications / 10).max(1)));
        if let Some(n) = threads {
            runner = runner.num_threads(n);
        }

        runner
            .run(self.config.horizon)
            .into_iter()
            .enumerate()
            .map(|(replication, result)| {
                let seed = self.replication_seed(replication);
                result.and_then(|stats| {
                    RunReport::from_stats(stats, self.config.horizon, seed)
                        .map_err(|e| e.to_string())
                })
            })
            .collect()
    }
}
