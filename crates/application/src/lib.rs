//! Application services and ports for login throttling.

#![forbid(unsafe_code)]

mod throttle_service;

pub use throttle_service::{AttemptStore, ThrottleEngine};
