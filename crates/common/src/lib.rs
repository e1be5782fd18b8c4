//! Modular common utilities shared across CarIndex crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `runtime`: async infrastructure (clock abstraction, rate limiting)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use resilience::{
    Clock, FixedIntervalGate, MockClock, RateLimiter, RateLimiterError, SystemClock, TokenBucket,
    TokenBucketConfig, Unthrottled,
};
