//! Engine errors

use thiserror::Error;

/// Failures that abort an [`EventLoop`](crate::EventLoop) run.
///
/// None of these are recoverable: they point at a bug in an agent or in the
/// caller, so statistics gathered up to that point should not be trusted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid event time: {0}")]
    InvalidTime(f64),

    #[error("event scheduled at t={scheduled} but the clock is already at t={now}")]
    ScheduledInPast { now: f64, scheduled: f64 },

    #[error("clock moved backward from t={from} to t={to}")]
    ClockRegression { from: f64, to: f64 },

    #[error("invariant violated at t={t}: {reason}")]
    InvariantViolation { t: f64, reason: String },
}
