use serde::{Deserialize, Serialize};

/// Outcome of evaluating a principal's recent failure history.
///
/// Computed fresh on every evaluation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Decision {
    /// No throttling applies; the attempt may proceed.
    Allow,
    /// The caller must wait before the next attempt.
    Delay {
        /// Whole seconds left until the next attempt is allowed.
        remaining_seconds: u64,
    },
    /// An additional verification challenge is required.
    Challenge,
    /// The attempt store could not be consulted. The caller decides
    /// whether to fail open or closed.
    Unavailable {
        /// Description of the store failure.
        cause: String,
    },
}
