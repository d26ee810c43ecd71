//! Duration streams for inter-arrival and service times

use crate::config::check_rate;
use crate::error::ConfigError;
use crate::Stage;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, Exp};

/// Anything that hands out non-negative durations one at a time.
pub trait DurationSource {
    fn draw(&mut self) -> f64;
}

/// A validated Exponential(rate) law with no generator attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpRate {
    rate: f64,
    dist: Exp<f64>,
}

impl ExpRate {
    pub fn new(rate: f64) -> Result<ExpRate, ConfigError> {
        check_rate("rate", rate)?;
        let dist = Exp::new(rate).map_err(|_| ConfigError::NonPositiveRate {
            name: "rate",
            value: rate,
        })?;
        Ok(ExpRate { rate, dist })
    }

    /// Durations from this law, drawn with a generator seeded by `seed`.
    pub fn stream(&self, seed: u64) -> Exponential {
        Exponential {
            law: *self,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn mean(&self) -> f64 {
        1.0 / self.rate
    }
}

/// Exponential(rate) durations from a seeded generator.
#[derive(Debug, Clone)]
pub struct Exponential {
    law: ExpRate,
    rng: StdRng,
}

impl Exponential {
    pub fn new(rate: f64, seed: u64) -> Result<Exponential, ConfigError> {
        Ok(ExpRate::new(rate)?.stream(seed))
    }

    pub fn rate(&self) -> f64 {
        self.law.rate()
    }

    pub fn mean(&self) -> f64 {
        self.law.mean()
    }
}

impl DurationSource for Exponential {
    fn draw(&mut self) -> f64 {
        self.law.dist.sample(&mut self.rng)
    }
}

/// Replays a fixed list of durations, wrapping around at the end.
///
/// An empty script yields zero.
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    durations: Vec<f64>,
    next: usize,
}

impl Scripted {
    pub fn new(durations: Vec<f64>) -> Scripted {
        Scripted { durations, next: 0 }
    }
}

impl DurationSource for Scripted {
    fn draw(&mut self) -> f64 {
        if self.durations.is_empty() {
            return 0.0;
        }
        let value = self.durations[self.next % self.durations.len()];
        self.next += 1;
        value
    }
}

/// One independent seed per random concern of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSeeds {
    pub arrivals: u64,
    pub tasting: u64,
    pub survey: u64,
}

impl StreamSeeds {
    pub fn derive(seed: u64) -> StreamSeeds {
        let mut master = StdRng::seed_from_u64(seed);
        StreamSeeds {
            arrivals: master.next_u64(),
            tasting: master.next_u64(),
            survey: master.next_u64(),
        }
    }

    pub fn service(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Tasting => self.tasting,
            Stage::Survey => self.survey,
        }
    }
}
