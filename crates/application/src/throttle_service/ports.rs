use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gatewarden_core::{AttemptSource, PrincipalId, StoreResult};

/// Storage port for the failed-login attempt history.
///
/// Implementations must not lose concurrent appends; evaluations may
/// observe counts slightly stale relative to concurrent records.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Appends a failed attempt stamped with the current time.
    ///
    /// Duplicates are valid: each call represents a distinct failure.
    async fn record(&self, principal: &PrincipalId, source: &AttemptSource) -> StoreResult<()>;

    /// Counts attempts for `principal` with `occurred_at` strictly
    /// after `since`.
    async fn count_since(
        &self,
        principal: &PrincipalId,
        since: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Returns the latest attempt time for `principal`, or `None` when
    /// there is no history.
    async fn most_recent(&self, principal: &PrincipalId) -> StoreResult<Option<DateTime<Utc>>>;

    /// Deletes attempts across all principals strictly older than the
    /// cutoff. Returns the number deleted.
    ///
    /// Must be safe to call concurrently with `record` and
    /// `count_since`; repeating a cutoff deletes nothing the second
    /// time.
    async fn prune(&self, older_than: DateTime<Utc>) -> StoreResult<u64>;

    /// Deletes the entire attempt history. Returns the number deleted.
    async fn clear(&self) -> StoreResult<u64>;
}
