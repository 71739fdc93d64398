use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatewarden_core::{AttemptSource, PrincipalId};

/// A single recorded login failure.
///
/// Immutable once recorded: stores only ever append attempts and remove
/// them through pruning or clearing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAttempt {
    /// Principal the failure is counted against.
    pub principal: PrincipalId,
    /// Opaque origin of the attempt.
    pub source: AttemptSource,
    /// When the failure happened.
    pub occurred_at: DateTime<Utc>,
}
