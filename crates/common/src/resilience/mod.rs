//! Resilience patterns for pacing calls against remote services
//!
//! This module provides **generic, reusable** building blocks:
//! - **Clock**: time abstraction with a controllable [`MockClock`] for tests
//! - **Rate limiting**: the async [`RateLimiter`] seam with a fixed-interval
//!   gate and a token bucket implementation
//!
//! Callers hold an `Arc<dyn RateLimiter>` and `acquire().await` before every
//! outbound request; the pacing policy is chosen at construction time and
//! never leaks into traversal logic.

pub mod clock;
pub mod rate_limiter;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{
    FixedIntervalGate, RateLimiter, RateLimiterError, TokenBucket, TokenBucketConfig,
    TokenBucketConfigBuilder, Unthrottled,
};
