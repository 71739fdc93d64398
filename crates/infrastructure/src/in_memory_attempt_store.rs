//! In-memory attempt store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use gatewarden_application::AttemptStore;
use gatewarden_core::{AttemptSource, PrincipalId, StoreResult};
use gatewarden_domain::FailedAttempt;

/// In-memory attempt store.
///
/// Immediately consistent. Backs the engine tests and suits
/// single-process deployments that can afford to lose history on
/// restart.
#[derive(Debug, Default)]
pub struct InMemoryAttemptStore {
    attempts: RwLock<Vec<FailedAttempt>>,
}

impl InMemoryAttemptStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: RwLock::new(Vec::new()),
        }
    }

    /// Records an attempt at an explicit instant, for seeding
    /// deterministic histories.
    pub async fn record_at(
        &self,
        principal: &PrincipalId,
        source: &AttemptSource,
        occurred_at: DateTime<Utc>,
    ) {
        self.attempts.write().await.push(FailedAttempt {
            principal: principal.clone(),
            source: source.clone(),
            occurred_at,
        });
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn record(&self, principal: &PrincipalId, source: &AttemptSource) -> StoreResult<()> {
        self.record_at(principal, source, Utc::now()).await;
        Ok(())
    }

    async fn count_since(
        &self,
        principal: &PrincipalId,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let attempts = self.attempts.read().await;
        let count = attempts
            .iter()
            .filter(|attempt| attempt.principal == *principal && attempt.occurred_at > since)
            .count();
        Ok(count as u64)
    }

    async fn most_recent(&self, principal: &PrincipalId) -> StoreResult<Option<DateTime<Utc>>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .iter()
            .filter(|attempt| attempt.principal == *principal)
            .map(|attempt| attempt.occurred_at)
            .max())
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|attempt| attempt.occurred_at >= older_than);
        Ok((before - attempts.len()) as u64)
    }

    async fn clear(&self) -> StoreResult<u64> {
        let mut attempts = self.attempts.write().await;
        let removed = attempts.len() as u64;
        attempts.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use gatewarden_application::{AttemptStore, ThrottleEngine};
    use gatewarden_core::{AttemptSource, PrincipalId};
    use gatewarden_domain::{
        Decision, EvaluationWindow, RetentionWindow, ThrottlePolicy, ThrottleTier, TierAction,
    };

    use super::InMemoryAttemptStore;

    fn principal(value: &str) -> PrincipalId {
        PrincipalId::new(value)
    }

    fn source() -> AttemptSource {
        AttemptSource::new("203.0.113.9")
    }

    async fn seed(
        store: &InMemoryAttemptStore,
        principal: &PrincipalId,
        count: usize,
        occurred_at: chrono::DateTime<Utc>,
    ) {
        for _ in 0..count {
            store.record_at(principal, &source(), occurred_at).await;
        }
    }

    fn stock_engine(store: Arc<InMemoryAttemptStore>) -> ThrottleEngine {
        ThrottleEngine::new(
            ThrottlePolicy::default(),
            EvaluationWindow::default(),
            RetentionWindow::default(),
            store,
        )
    }

    #[tokio::test]
    async fn count_excludes_attempts_at_the_window_boundary() {
        let now = Utc::now();
        let store = InMemoryAttemptStore::new();
        let alice = principal("alice");

        store.record_at(&alice, &source(), now).await;
        let counted = store.count_since(&alice, now).await;
        assert_eq!(counted.ok(), Some(0));

        let counted = store.count_since(&alice, now - Duration::seconds(1)).await;
        assert_eq!(counted.ok(), Some(1));
    }

    #[tokio::test]
    async fn counts_are_scoped_per_principal() {
        let now = Utc::now();
        let store = InMemoryAttemptStore::new();
        seed(&store, &principal("alice"), 3, now).await;
        seed(&store, &principal("bob"), 1, now).await;

        let counted = store
            .count_since(&principal("alice"), now - Duration::minutes(1))
            .await;
        assert_eq!(counted.ok(), Some(3));
    }

    #[tokio::test]
    async fn most_recent_picks_the_latest_attempt() {
        let now = Utc::now();
        let store = InMemoryAttemptStore::new();
        let alice = principal("alice");
        store.record_at(&alice, &source(), now - Duration::minutes(5)).await;
        store.record_at(&alice, &source(), now - Duration::minutes(1)).await;

        let most_recent = store.most_recent(&alice).await;
        assert_eq!(most_recent.ok(), Some(Some(now - Duration::minutes(1))));
    }

    #[tokio::test]
    async fn most_recent_is_none_without_history() {
        let store = InMemoryAttemptStore::new();
        let most_recent = store.most_recent(&principal("nobody")).await;
        assert_eq!(most_recent.ok(), Some(None));
    }

    #[tokio::test]
    async fn prune_removes_only_older_attempts_and_is_idempotent() {
        let now = Utc::now();
        let store = InMemoryAttemptStore::new();
        let alice = principal("alice");
        store.record_at(&alice, &source(), now - Duration::minutes(30)).await;
        store.record_at(&alice, &source(), now - Duration::minutes(5)).await;

        let cutoff = now - Duration::minutes(20);
        assert_eq!(store.prune(cutoff).await.ok(), Some(1));
        assert_eq!(store.prune(cutoff).await.ok(), Some(0));

        let counted = store.count_since(&alice, now - Duration::hours(1)).await;
        assert_eq!(counted.ok(), Some(1));
    }

    #[tokio::test]
    async fn clear_reports_the_removed_count() {
        let now = Utc::now();
        let store = InMemoryAttemptStore::new();
        seed(&store, &principal("alice"), 4, now).await;

        assert_eq!(store.clear().await.ok(), Some(4));
        assert_eq!(store.clear().await.ok(), Some(0));
    }

    #[tokio::test]
    async fn recorded_failure_is_visible_to_the_next_evaluation() {
        let store = Arc::new(InMemoryAttemptStore::new());
        let tiers = vec![ThrottleTier::new(1, TierAction::Challenge)];
        let policy = match ThrottlePolicy::new(tiers) {
            Ok(policy) => policy,
            Err(_) => panic!("single-tier policy is valid"),
        };
        let engine = ThrottleEngine::new(
            policy,
            EvaluationWindow::default(),
            RetentionWindow::default(),
            store,
        );
        let alice = principal("alice");

        assert_eq!(engine.evaluate(&alice).await, Decision::Allow);

        for _ in 0..2 {
            let recorded = engine.record_failure(&alice, &source()).await;
            assert!(recorded.is_ok());
        }

        assert_eq!(engine.evaluate(&alice).await, Decision::Challenge);
    }

    #[tokio::test]
    async fn principal_with_no_history_is_allowed() {
        let store = Arc::new(InMemoryAttemptStore::new());
        let engine = stock_engine(store);

        let decision = engine.evaluate_at(&principal("alice"), Utc::now()).await;
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn fresh_burst_just_past_the_first_tier_is_delayed() {
        let now = Utc::now();
        let store = Arc::new(InMemoryAttemptStore::new());
        let alice = principal("alice");
        seed(&store, &alice, 50, now - Duration::minutes(2)).await;
        store.record_at(&alice, &source(), now - Duration::seconds(1)).await;

        let engine = stock_engine(store);
        let decision = engine.evaluate_at(&alice, now).await;
        assert_eq!(
            decision,
            Decision::Delay {
                remaining_seconds: 1
            }
        );
    }

    #[tokio::test]
    async fn stale_burst_past_the_first_tier_is_allowed() {
        let now = Utc::now();
        let store = Arc::new(InMemoryAttemptStore::new());
        let alice = principal("alice");
        seed(&store, &alice, 50, now - Duration::minutes(2)).await;
        store.record_at(&alice, &source(), now - Duration::seconds(5)).await;

        let engine = stock_engine(store);
        let decision = engine.evaluate_at(&alice, now).await;
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn sustained_attack_is_challenged() {
        let now = Utc::now();
        let store = Arc::new(InMemoryAttemptStore::new());
        let alice = principal("alice");
        seed(&store, &alice, 301, now - Duration::minutes(2)).await;

        let engine = stock_engine(store);
        let decision = engine.evaluate_at(&alice, now).await;
        assert_eq!(decision, Decision::Challenge);
    }

    #[tokio::test]
    async fn attempts_outside_the_lookback_are_not_counted() {
        let now = Utc::now();
        let store = Arc::new(InMemoryAttemptStore::new());
        let alice = principal("alice");
        seed(&store, &alice, 301, now - Duration::minutes(11)).await;

        let engine = stock_engine(store.clone()).with_auto_prune(false);
        let decision = engine.evaluate_at(&alice, now).await;
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn evaluation_prunes_history_past_retention() {
        let now = Utc::now();
        let store = Arc::new(InMemoryAttemptStore::new());
        let alice = principal("alice");
        seed(&store, &alice, 3, now - Duration::minutes(30)).await;

        let engine = stock_engine(store.clone());
        let decision = engine.evaluate_at(&alice, now).await;
        assert_eq!(decision, Decision::Allow);

        let remaining = store.count_since(&alice, now - Duration::hours(2)).await;
        assert_eq!(remaining.ok(), Some(0));
    }

    #[tokio::test]
    async fn clear_history_empties_the_store() {
        let now = Utc::now();
        let store = Arc::new(InMemoryAttemptStore::new());
        seed(&store, &principal("alice"), 2, now).await;
        seed(&store, &principal("bob"), 1, now).await;

        let engine = stock_engine(store);
        assert_eq!(engine.clear_history().await.ok(), Some(3));
    }
}
