//! Time windows: what counts as recent, and when history may be dropped.

use chrono::Duration;

use gatewarden_core::ConfigError;

/// Time span defining which failed attempts count as recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationWindow {
    lookback: Duration,
}

impl EvaluationWindow {
    /// Creates a window counting attempts within `lookback` of now.
    pub fn new(lookback: Duration) -> Result<Self, ConfigError> {
        if lookback <= Duration::zero() {
            return Err(ConfigError::EmptyWindow);
        }

        Ok(Self { lookback })
    }

    /// How far back attempts count as recent.
    #[must_use]
    pub fn lookback(&self) -> Duration {
        self.lookback
    }
}

impl Default for EvaluationWindow {
    /// Ten minutes of history count toward throttling.
    fn default() -> Self {
        Self {
            lookback: Duration::minutes(10),
        }
    }
}

/// Time span after which recorded attempts become eligible for pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow {
    ttl: Duration,
}

impl RetentionWindow {
    /// Creates a retention window keeping attempts for `ttl`.
    pub fn new(ttl: Duration) -> Result<Self, ConfigError> {
        if ttl <= Duration::zero() {
            return Err(ConfigError::EmptyWindow);
        }

        Ok(Self { ttl })
    }

    /// Retention of twice the evaluation lookback, so the counting
    /// window never overlaps prunable history.
    #[must_use]
    pub fn for_lookback(window: &EvaluationWindow) -> Self {
        Self {
            ttl: window.lookback() * 2,
        }
    }

    /// How long attempts are retained before becoming prunable.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for RetentionWindow {
    /// Twice the default evaluation lookback.
    fn default() -> Self {
        Self::for_lookback(&EvaluationWindow::default())
    }
}
