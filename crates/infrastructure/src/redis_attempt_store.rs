//! Redis-backed attempt store.
//!
//! Attempts for a principal live in a sorted set scored by epoch
//! seconds; a registry set tracks which principals have history so
//! pruning can walk them, and a sequence counter keeps duplicate
//! attempts distinct within each sorted set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::Script;

use gatewarden_application::AttemptStore;
use gatewarden_core::{AttemptSource, PrincipalId, StoreError, StoreResult};

const RECORD_ATTEMPT_SCRIPT: &str = r#"
local seq = redis.call('INCR', KEYS[3])
redis.call('ZADD', KEYS[1], ARGV[1], seq .. ':' .. ARGV[2])
redis.call('SADD', KEYS[2], ARGV[3])
return seq
"#;

/// Redis implementation of the attempt-store port.
#[derive(Clone)]
pub struct RedisAttemptStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisAttemptStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn attempts_key_for(&self, principal: &str) -> String {
        format!("{}:attempts:{principal}", self.key_prefix)
    }

    fn registry_key(&self) -> String {
        format!("{}:principals", self.key_prefix)
    }

    fn sequence_key(&self) -> String {
        format!("{}:sequence", self.key_prefix)
    }

    async fn connection(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| map_redis_error("failed to connect to redis", error))
    }
}

fn map_redis_error(context: &str, error: redis::RedisError) -> StoreError {
    if error.is_timeout() {
        StoreError::Timeout(format!("{context}: {error}"))
    } else {
        StoreError::Connection(format!("{context}: {error}"))
    }
}

fn score_for(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

fn time_from_score(score: f64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis((score * 1000.0).round() as i64)
        .ok_or_else(|| StoreError::Constraint(format!("invalid attempt timestamp score: {score}")))
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn record(&self, principal: &PrincipalId, source: &AttemptSource) -> StoreResult<()> {
        let mut connection = self.connection().await?;

        let script = Script::new(RECORD_ATTEMPT_SCRIPT);
        let _sequence: i64 = script
            .key(self.attempts_key_for(principal.as_str()))
            .key(self.registry_key())
            .key(self.sequence_key())
            .arg(score_for(Utc::now()))
            .arg(source.as_str())
            .arg(principal.as_str())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| map_redis_error("failed to record login attempt", error))?;

        Ok(())
    }

    async fn count_since(
        &self,
        principal: &PrincipalId,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut connection = self.connection().await?;

        // Exclusive lower bound: attempts exactly at `since` do not count.
        let count: u64 = redis::cmd("ZCOUNT")
            .arg(self.attempts_key_for(principal.as_str()))
            .arg(format!("({}", score_for(since)))
            .arg("+inf")
            .query_async(&mut connection)
            .await
            .map_err(|error| map_redis_error("failed to count recent login attempts", error))?;

        Ok(count)
    }

    async fn most_recent(&self, principal: &PrincipalId) -> StoreResult<Option<DateTime<Utc>>> {
        let mut connection = self.connection().await?;

        let entries: Vec<(String, f64)> = redis::cmd("ZRANGE")
            .arg(self.attempts_key_for(principal.as_str()))
            .arg(-1)
            .arg(-1)
            .arg("WITHSCORES")
            .query_async(&mut connection)
            .await
            .map_err(|error| map_redis_error("failed to look up latest login attempt", error))?;

        match entries.first() {
            Some((_, score)) => Ok(Some(time_from_score(*score)?)),
            None => Ok(None),
        }
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
        let mut connection = self.connection().await?;

        let principals: Vec<String> = redis::cmd("SMEMBERS")
            .arg(self.registry_key())
            .query_async(&mut connection)
            .await
            .map_err(|error| map_redis_error("failed to list principals for pruning", error))?;

        // Exclusive upper bound: only attempts strictly older go.
        let cutoff = format!("({}", score_for(older_than));
        let mut removed = 0u64;
        for principal in principals {
            let key = self.attempts_key_for(&principal);
            let dropped: u64 = redis::cmd("ZREMRANGEBYSCORE")
                .arg(&key)
                .arg("-inf")
                .arg(&cutoff)
                .query_async(&mut connection)
                .await
                .map_err(|error| map_redis_error("failed to prune stale login attempts", error))?;
            removed += dropped;

            let remaining: u64 = redis::cmd("ZCARD")
                .arg(&key)
                .query_async(&mut connection)
                .await
                .map_err(|error| map_redis_error("failed to inspect pruned history", error))?;
            if remaining == 0 {
                let _: u64 = redis::cmd("DEL")
                    .arg(&key)
                    .query_async(&mut connection)
                    .await
                    .map_err(|error| map_redis_error("failed to drop emptied history", error))?;
                let _: u64 = redis::cmd("SREM")
                    .arg(self.registry_key())
                    .arg(&principal)
                    .query_async(&mut connection)
                    .await
                    .map_err(|error| map_redis_error("failed to deregister principal", error))?;
            }
        }

        Ok(removed)
    }

    async fn clear(&self) -> StoreResult<u64> {
        let mut connection = self.connection().await?;

        let principals: Vec<String> = redis::cmd("SMEMBERS")
            .arg(self.registry_key())
            .query_async(&mut connection)
            .await
            .map_err(|error| map_redis_error("failed to list principals for clearing", error))?;

        let mut removed = 0u64;
        for principal in principals {
            let key = self.attempts_key_for(&principal);
            let count: u64 = redis::cmd("ZCARD")
                .arg(&key)
                .query_async(&mut connection)
                .await
                .map_err(|error| map_redis_error("failed to size history for clearing", error))?;
            removed += count;

            let _: u64 = redis::cmd("DEL")
                .arg(&key)
                .query_async(&mut connection)
                .await
                .map_err(|error| {
                    map_redis_error("failed to clear login attempt history", error)
                })?;
        }

        let _: u64 = redis::cmd("DEL")
            .arg(self.registry_key())
            .query_async(&mut connection)
            .await
            .map_err(|error| map_redis_error("failed to clear principal registry", error))?;
        let _: u64 = redis::cmd("DEL")
            .arg(self.sequence_key())
            .query_async(&mut connection)
            .await
            .map_err(|error| map_redis_error("failed to reset attempt sequence", error))?;

        Ok(removed)
    }
}
