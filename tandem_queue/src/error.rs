use crate::Stage;
use des::SimError;
use thiserror::Error;

/// Rejected parameters. Raised before any simulated time advances.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive finite rate, got {value}")]
    NonPositiveRate { name: &'static str, value: f64 },

    #[error("the {stage} station needs at least one server")]
    NonPositiveCapacity { stage: Stage },

    #[error("{stage} station unstable: service rate {service_rate} must exceed {arrival_rate}")]
    Unstable {
        stage: Stage,
        service_rate: f64,
        arrival_rate: f64,
    },

    #[error("horizon must be positive and finite, got {0}")]
    InvalidHorizon(f64),

    #[error("at least one replication is required")]
    NoReplications,
}

#[derive(Debug, Error)]
pub enum TandemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("simulation aborted: {0}")]
    Engine(#[from] SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid experiment file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV output failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}
