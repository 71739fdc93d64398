//! Tiered throttle policy: recent-failure counts mapped to reactions.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use gatewarden_core::ConfigError;

/// Reaction once recent failures exceed a tier's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierAction {
    /// Require the caller to wait this many seconds after the most
    /// recent failure before the next attempt.
    Delay(u32),
    /// Require an additional verification challenge.
    Challenge,
}

impl Display for TierAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delay(seconds) => write!(formatter, "delay:{seconds}"),
            Self::Challenge => write!(formatter, "challenge"),
        }
    }
}

impl FromStr for TierAction {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "challenge" {
            return Ok(Self::Challenge);
        }

        match value.strip_prefix("delay:").map(str::parse::<u32>) {
            Some(Ok(seconds)) => Ok(Self::Delay(seconds)),
            _ => Err(ConfigError::UnknownAction(value.to_owned())),
        }
    }
}

/// A single policy rule: react with `action` once recent failures
/// exceed `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleTier {
    threshold: u32,
    action: TierAction,
}

impl ThrottleTier {
    /// Creates a tier applying `action` once failures exceed `threshold`.
    #[must_use]
    pub fn new(threshold: u32, action: TierAction) -> Self {
        Self { threshold, action }
    }

    /// Failure count that must be exceeded before the tier applies.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Reaction applied while this is the highest exceeded tier.
    #[must_use]
    pub fn action(&self) -> TierAction {
        self.action
    }
}

/// Ordered set of throttle tiers with strictly increasing thresholds.
///
/// Validated on construction: an invalid policy value cannot exist, so
/// an engine can never be built over one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    tiers: Vec<ThrottleTier>,
}

impl ThrottlePolicy {
    /// Validates and builds a policy from tiers ordered by threshold.
    ///
    /// Rejects empty policies, zero or non-increasing thresholds, and
    /// zero-second delays.
    pub fn new(tiers: Vec<ThrottleTier>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::EmptyPolicy);
        }

        let mut previous: Option<u32> = None;
        for tier in &tiers {
            if tier.threshold == 0 {
                return Err(ConfigError::ZeroThreshold);
            }

            if let Some(previous) = previous
                && tier.threshold <= previous
            {
                return Err(ConfigError::ThresholdsNotIncreasing {
                    previous,
                    next: tier.threshold,
                });
            }

            if let TierAction::Delay(0) = tier.action {
                return Err(ConfigError::ZeroDelay {
                    threshold: tier.threshold,
                });
            }

            previous = Some(tier.threshold);
        }

        Ok(Self { tiers })
    }

    /// Parses the compact comma-separated `<threshold>:<action>` form,
    /// e.g. `"50:delay:2,150:delay:4,300:challenge"`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let mut tiers = Vec::new();
        for entry in value.split(',') {
            let entry = entry.trim();
            let Some((threshold, action)) = entry.split_once(':') else {
                return Err(ConfigError::InvalidEntry(entry.to_owned()));
            };

            let threshold = threshold
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidEntry(entry.to_owned()))?;
            tiers.push(ThrottleTier::new(threshold, action.trim().parse()?));
        }

        Self::new(tiers)
    }

    /// Selects the applicable tier for a recent-failure count: the tier
    /// with the highest threshold strictly below `count`, or `None` when
    /// no tier has been exceeded.
    ///
    /// Equality does not trigger: a count exactly at a threshold is
    /// still below that tier.
    #[must_use]
    pub fn select(&self, count: u64) -> Option<&ThrottleTier> {
        self.tiers
            .iter()
            .rev()
            .find(|tier| u64::from(tier.threshold) < count)
    }

    /// Smallest configured threshold.
    #[must_use]
    pub fn smallest_threshold(&self) -> u32 {
        // Non-empty by construction.
        self.tiers.first().map_or(0, ThrottleTier::threshold)
    }

    /// Tiers in ascending threshold order.
    #[must_use]
    pub fn tiers(&self) -> &[ThrottleTier] {
        &self.tiers
    }
}

impl Default for ThrottlePolicy {
    /// Stock policy: short delays past 50 and 150 recent failures, a
    /// challenge past 300.
    fn default() -> Self {
        Self {
            tiers: vec![
                ThrottleTier::new(50, TierAction::Delay(2)),
                ThrottleTier::new(150, TierAction::Delay(4)),
                ThrottleTier::new(300, TierAction::Challenge),
            ],
        }
    }
}
