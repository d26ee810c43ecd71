//! Model parameters and experiment files
//!
//! An experiment file is TOML with three optional tables:
//!
//! ```toml
//! [model]
//! arrival_rate = 2.0
//! service_rate_stage1 = 3.0
//! service_rate_stage2 = 4.0
//! capacity_stage1 = 1
//! capacity_stage2 = 1
//! client_count = 50
//! horizon = 30.0
//! random_seed = 42
//!
//! [experiment]
//! replications = 100
//! threads = 4
//!
//! [output]
//! dir = "results/baseline"
//! ```
//!
//! Anything left out falls back to the defaults below.

use crate::error::{ConfigError, TandemError};
use crate::Stage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters of one tandem queue run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TandemConfig {
    /// Mean arrivals per unit time (λ)
    pub arrival_rate: f64,
    /// Service completions per unit time per busy tasting server (μ1)
    pub service_rate_stage1: f64,
    /// Service completions per unit time per busy survey server (μ2)
    pub service_rate_stage2: f64,
    pub capacity_stage1: usize,
    pub capacity_stage2: usize,
    /// Maximum number of clients admitted
    pub client_count: usize,
    /// Simulated time after which no further events are dispatched
    pub horizon: f64,
    /// Fixes every variate draw when set
    pub random_seed: Option<u64>,
}

impl Default for TandemConfig {
    fn default() -> Self {
        TandemConfig {
            arrival_rate: 2.0,
            service_rate_stage1: 3.0,
            service_rate_stage2: 4.0,
            capacity_stage1: 1,
            capacity_stage2: 1,
            client_count: 50,
            horizon: 30.0,
            random_seed: None,
        }
    }
}

impl TandemConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn service_rate(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Tasting => self.service_rate_stage1,
            Stage::Survey => self.service_rate_stage2,
        }
    }

    pub fn capacity(&self, stage: Stage) -> usize {
        match stage {
            Stage::Tasting => self.capacity_stage1,
            Stage::Survey => self.capacity_stage2,
        }
    }

    /// Reject parameters the model or the steady-state formulas cannot handle.
    ///
    /// Each station must satisfy μ > λ on its own, regardless of capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("arrival_rate", self.arrival_rate)?;
        check_rate("service_rate_stage1", self.service_rate_stage1)?;
        check_rate("service_rate_stage2", self.service_rate_stage2)?;

        for stage in Stage::ALL {
            if self.capacity(stage) == 0 {
                return Err(ConfigError::NonPositiveCapacity { stage });
            }
            let service_rate = self.service_rate(stage);
            if service_rate <= self.arrival_rate {
                return Err(ConfigError::Unstable {
                    stage,
                    service_rate,
                    arrival_rate: self.arrival_rate,
                });
            }
        }

        if !self.horizon.is_finite() || self.horizon <= 0.0 {
            return Err(ConfigError::InvalidHorizon(self.horizon));
        }
        Ok(())
    }
}

pub(crate) fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveRate { name, value })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentSettings {
    pub replications: usize,
    /// Worker threads for replications; rayon's global pool when unset
    pub threads: Option<usize>,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        ExperimentSettings {
            replications: 1,
            threads: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Nothing is written when unset
    pub dir: Option<PathBuf>,
    pub save_queue_traces: bool,
    pub save_clients: bool,
    pub save_summary: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            dir: None,
            save_queue_traces: true,
            save_clients: true,
            save_summary: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub model: TandemConfig,
    pub experiment: ExperimentSettings,
    pub output: OutputSettings,
}

impl ExperimentConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, TandemError> {
        let config: ExperimentConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TandemError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.experiment.replications == 0 {
            return Err(ConfigError::NoReplications);
        }
        self.model.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_tasting_survey_setup() {
        let config = TandemConfig::default();
        assert_eq!(config.arrival_rate, 2.0);
        assert_eq!(config.service_rate(Stage::Tasting), 3.0);
        assert_eq!(config.service_rate(Stage::Survey), 4.0);
        assert_eq!(config.capacity(Stage::Tasting), 1);
        assert_eq!(config.client_count, 50);
        assert_eq!(config.horizon, 30.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn service_rate_not_above_arrival_rate_is_unstable() {
        let config = TandemConfig {
            service_rate_stage1: 2.0,
            ..TandemConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Unstable {
                stage: Stage::Tasting,
                service_rate: 2.0,
                arrival_rate: 2.0
            })
        );

        let config = TandemConfig {
            service_rate_stage2: 1.5,
            ..TandemConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Unstable {
                stage: Stage::Survey,
                ..
            })
        ));
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let zero_rate = TandemConfig {
            arrival_rate: 0.0,
            ..TandemConfig::default()
        };
        assert!(matches!(
            zero_rate.validate(),
            Err(ConfigError::NonPositiveRate {
                name: "arrival_rate",
                ..
            })
        ));

        let nan_rate = TandemConfig {
            service_rate_stage2: f64::NAN,
            ..TandemConfig::default()
        };
        assert!(matches!(
            nan_rate.validate(),
            Err(ConfigError::NonPositiveRate { .. })
        ));

        let no_servers = TandemConfig {
            capacity_stage2: 0,
            ..TandemConfig::default()
        };
        assert_eq!(
            no_servers.validate(),
            Err(ConfigError::NonPositiveCapacity {
                stage: Stage::Survey
            })
        );

        let no_horizon = TandemConfig {
            horizon: -1.0,
            ..TandemConfig::default()
        };
        assert_eq!(no_horizon.validate(), Err(ConfigError::InvalidHorizon(-1.0)));
    }

    #[test]
    fn experiment_file_fills_in_defaults() {
        let source = r#"
            [model]
            arrival_rate = 1.0
            service_rate_stage1 = 1.6666666666666667
            service_rate_stage2 = 1.5
            client_count = 100
            horizon = 150.0
            random_seed = 7

            [experiment]
            replications = 20
        "#;

        let config = ExperimentConfig::from_toml_str(source).unwrap();

        assert_eq!(config.model.client_count, 100);
        assert_eq!(config.model.capacity_stage1, 1);
        assert_eq!(config.model.random_seed, Some(7));
        assert_eq!(config.experiment.replications, 20);
        assert_eq!(config.experiment.threads, None);
        assert_eq!(config.output, OutputSettings::default());
    }

    #[test]
    fn experiment_file_is_validated() {
        let unstable = "[model]\narrival_rate = 5.0\n";
        assert!(matches!(
            ExperimentConfig::from_toml_str(unstable),
            Err(TandemError::Config(ConfigError::Unstable { .. }))
        ));

        let no_runs = "[experiment]\nreplications = 0\n";
        assert!(matches!(
            ExperimentConfig::from_toml_str(no_runs),
            Err(TandemError::Config(ConfigError::NoReplications))
        ));

        let typo = "[model]\narival_rate = 1.0\n";
        assert!(matches!(
            ExperimentConfig::from_toml_str(typo),
            Err(TandemError::Toml(_))
        ));
    }
}
