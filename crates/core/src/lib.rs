//! Shared primitives for all Gatewarden crates.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used for attempt-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Identity protected against credential guessing, such as a user id.
///
/// Opaque: the contents are stored and compared verbatim, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Creates a principal identifier from an opaque value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PrincipalId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Origin of a failed attempt, such as a client address.
///
/// Format-agnostic: no parsing or validation is performed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptSource(String);

impl AttemptSource {
    /// Creates a source identifier from an opaque value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for AttemptSource {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Failure reported by an attempt-store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the connection broke mid-operation.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The store did not answer within the caller-supplied deadline.
    #[error("store operation timed out: {0}")]
    Timeout(String),

    /// The store rejected the operation with a constraint violation.
    #[error("store constraint violated: {0}")]
    Constraint(String),
}

/// Invalid throttle configuration, rejected at construction time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A throttle policy needs at least one tier.
    #[error("throttle policy must contain at least one tier")]
    EmptyPolicy,

    /// Tier thresholds must be strictly increasing.
    #[error("tier thresholds must be strictly increasing: {next} follows {previous}")]
    ThresholdsNotIncreasing {
        /// Threshold of the preceding tier.
        previous: u32,
        /// Offending threshold that does not exceed it.
        next: u32,
    },

    /// Tier thresholds must be positive.
    #[error("tier thresholds must be positive")]
    ZeroThreshold,

    /// Delay tiers must wait a positive number of seconds.
    #[error("delay at threshold {threshold} must be a positive number of seconds")]
    ZeroDelay {
        /// Threshold of the tier carrying the zero-second delay.
        threshold: u32,
    },

    /// Windows must span a positive duration.
    #[error("window duration must be positive")]
    EmptyWindow,

    /// A tier action string could not be parsed.
    #[error("unrecognized tier action '{0}', expected 'challenge' or 'delay:<seconds>'")]
    UnknownAction(String),

    /// A policy entry string could not be parsed.
    #[error("invalid policy entry '{0}', expected '<threshold>:<action>'")]
    InvalidEntry(String),
}
