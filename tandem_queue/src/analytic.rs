//! Closed-form M/M/1 steady state
//!
//! Each station is treated as an independent M/M/1 queue fed at rate λ
//! (Burke's theorem), whatever its configured capacity. Every constructor
//! rejects μ ≤ λ, so the figures below are always finite and positive.

use serde::Serialize;

use crate::config::{check_rate, TandemConfig};
use crate::error::ConfigError;
use crate::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MM1 {
    arrival_rate: f64,
    service_rate: f64,
}

impl MM1 {
    /// A stable queue at `stage`, or the reason it is not one.
    pub fn new(stage: Stage, arrival_rate: f64, service_rate: f64) -> Result<MM1, ConfigError> {
        check_rate("arrival_rate", arrival_rate)?;
        check_rate("service_rate", service_rate)?;
        if service_rate <= arrival_rate {
            return Err(ConfigError::Unstable {
                stage,
                service_rate,
                arrival_rate,
            });
        }
        Ok(MM1 {
            arrival_rate,
            service_rate,
        })
    }

    pub fn for_stage(config: &TandemConfig, stage: Stage) -> Result<MM1, ConfigError> {
        MM1::new(stage, config.arrival_rate, config.service_rate(stage))
    }

    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate
    }

    pub fn service_rate(&self) -> f64 {
        self.service_rate
    }

    /// ρ = λ / μ
    pub fn utilization(&self) -> f64 {
        self.arrival_rate / self.service_rate
    }

    /// L = λ / (μ − λ)
    pub fn mean_in_system(&self) -> f64 {
        self.arrival_rate / (self.service_rate - self.arrival_rate)
    }

    /// W = 1 / (μ − λ)
    pub fn mean_time_in_system(&self) -> f64 {
        1.0 / (self.service_rate - self.arrival_rate)
    }

    /// Lq = λ² / (μ (μ − λ))
    pub fn mean_in_queue(&self) -> f64 {
        self.arrival_rate.powi(2) / (self.service_rate * (self.service_rate - self.arrival_rate))
    }

    /// Wq = λ / (μ (μ − λ))
    pub fn mean_wait_in_queue(&self) -> f64 {
        self.arrival_rate / (self.service_rate * (self.service_rate - self.arrival_rate))
    }
}

/// Both stations side by side, with system totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TandemAnalytic {
    pub tasting: MM1,
    pub survey: MM1,
}

impl TandemAnalytic {
    /// Steady-state figures for `config`, which must validate.
    pub fn new(config: &TandemConfig) -> Result<TandemAnalytic, ConfigError> {
        config.validate()?;
        Ok(TandemAnalytic {
            tasting: MM1::for_stage(config, Stage::Tasting)?,
            survey: MM1::for_stage(config, Stage::Survey)?,
        })
    }

    pub fn stage(&self, stage: Stage) -> &MM1 {
        match stage {
            Stage::Tasting => &self.tasting,
            Stage::Survey => &self.survey,
        }
    }

    pub fn mean_in_system(&self) -> f64 {
        self.tasting.mean_in_system() + self.survey.mean_in_system()
    }

    pub fn mean_time_in_system(&self) -> f64 {
        self.tasting.mean_time_in_system() + self.survey.mean_time_in_system()
    }

    /// Plain average of the two station utilizations.
    pub fn utilization(&self) -> f64 {
        (self.tasting.utilization() + self.survey.utilization()) / 2.0
    }
}
