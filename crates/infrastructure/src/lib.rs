//! Storage adapters for the Gatewarden attempt-store port.

#![forbid(unsafe_code)]

mod in_memory_attempt_store;
mod postgres_attempt_store;
mod redis_attempt_store;

pub use in_memory_attempt_store::InMemoryAttemptStore;
pub use postgres_attempt_store::PostgresAttemptStore;
pub use redis_attempt_store::RedisAttemptStore;
