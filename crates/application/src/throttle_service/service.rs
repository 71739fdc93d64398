use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use gatewarden_core::{AttemptSource, PrincipalId, StoreResult};
use gatewarden_domain::{
    Decision, EvaluationWindow, RetentionWindow, ThrottlePolicy, TierAction,
};

use super::ports::AttemptStore;

/// Application service deciding whether a login attempt may proceed.
///
/// Stateless: every decision is derived from the store's history, the
/// policy and the clock, so engines on separate instances sharing one
/// store stay consistent and a restart loses nothing.
#[derive(Clone)]
pub struct ThrottleEngine {
    policy: ThrottlePolicy,
    window: EvaluationWindow,
    retention: RetentionWindow,
    auto_prune: bool,
    store: Arc<dyn AttemptStore>,
}

impl ThrottleEngine {
    /// Creates an engine over `store` with the given policy and windows.
    ///
    /// Stale history is pruned opportunistically on each evaluation;
    /// disable with [`Self::with_auto_prune`].
    #[must_use]
    pub fn new(
        policy: ThrottlePolicy,
        window: EvaluationWindow,
        retention: RetentionWindow,
        store: Arc<dyn AttemptStore>,
    ) -> Self {
        Self {
            policy,
            window,
            retention,
            auto_prune: true,
            store,
        }
    }

    /// Enables or disables opportunistic pruning during evaluation.
    #[must_use]
    pub fn with_auto_prune(mut self, enabled: bool) -> Self {
        self.auto_prune = enabled;
        self
    }

    /// Evaluates the current throttle status for `principal`.
    ///
    /// A store failure surfaces as [`Decision::Unavailable`]; the engine
    /// never substitutes a fail-open or fail-closed default.
    pub async fn evaluate(&self, principal: &PrincipalId) -> Decision {
        self.evaluate_at(principal, Utc::now()).await
    }

    /// Evaluates the throttle status as of `now`.
    ///
    /// [`Self::evaluate`] feeds this the system clock; taking the
    /// instant explicitly keeps tests and offline replay deterministic.
    pub async fn evaluate_at(&self, principal: &PrincipalId, now: DateTime<Utc>) -> Decision {
        let decision = self.decide(principal, now).await;

        if self.auto_prune {
            let cutoff = now - self.retention.ttl();
            if let Err(error) = self.store.prune(cutoff).await {
                // Hygiene only; a failed prune never alters the decision.
                warn!(error = %error, "failed to prune stale login attempts");
            }
        }

        decision
    }

    async fn decide(&self, principal: &PrincipalId, now: DateTime<Utc>) -> Decision {
        let since = now - self.window.lookback();
        let count = match self.store.count_since(principal, since).await {
            Ok(count) => count,
            Err(error) => {
                return Decision::Unavailable {
                    cause: error.to_string(),
                };
            }
        };

        let Some(tier) = self.policy.select(count) else {
            return Decision::Allow;
        };

        match tier.action() {
            TierAction::Challenge => Decision::Challenge,
            TierAction::Delay(seconds) => self.delay_decision(principal, now, seconds).await,
        }
    }

    async fn delay_decision(
        &self,
        principal: &PrincipalId,
        now: DateTime<Utc>,
        seconds: u32,
    ) -> Decision {
        let most_recent = match self.store.most_recent(principal).await {
            Ok(most_recent) => most_recent,
            Err(error) => {
                return Decision::Unavailable {
                    cause: error.to_string(),
                };
            }
        };

        // A positive count with no latest timestamp means pruning raced
        // this evaluation; nothing is left to delay against.
        let Some(most_recent) = most_recent else {
            return Decision::Allow;
        };

        let next_allowed = most_recent + Duration::seconds(i64::from(seconds));
        if now < next_allowed {
            let remaining = (next_allowed - now).num_seconds();
            Decision::Delay {
                remaining_seconds: u64::try_from(remaining).unwrap_or(0),
            }
        } else {
            Decision::Allow
        }
    }

    /// Records a failed login attempt for `principal` from `source`.
    ///
    /// Store failures surface to the caller unchanged: a silently
    /// dropped record would weaken protection.
    pub async fn record_failure(
        &self,
        principal: &PrincipalId,
        source: &AttemptSource,
    ) -> StoreResult<()> {
        self.store.record(principal, source).await
    }

    /// Deletes attempts older than the retention window. Intended for
    /// periodic cleanup outside the evaluation path.
    pub async fn prune_stale(&self) -> StoreResult<u64> {
        self.store.prune(Utc::now() - self.retention.ttl()).await
    }

    /// Deletes the entire failed-attempt history.
    pub async fn clear_history(&self) -> StoreResult<u64> {
        self.store.clear().await
    }
}
