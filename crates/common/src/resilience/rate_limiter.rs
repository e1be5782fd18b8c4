//! Rate limiting implementations for pacing outbound requests
//!
//! Two policies sit behind the async [`RateLimiter`] seam:
//! - **Fixed-interval gate**: consecutive acquisitions are at least
//!   `interval` apart (the courtesy pause between remote calls)
//! - **Token bucket**: allows bursts up to a maximum capacity, then refills
//!   at a fixed rate
//!
//! [`Unthrottled`] is available for tests and trusted endpoints.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Clock, SystemClock};

/// Configuration validation error for rate limiters
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid rate limiter configuration: {0}")]
pub struct RateLimiterError(pub String);

/// Async pacing seam used before every outbound request.
#[async_trait]
pub trait RateLimiter: Send + Sync + fmt::Debug {
    /// Wait until the caller is allowed to issue one request.
    async fn acquire(&self);
}

/// No pacing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

#[async_trait]
impl RateLimiter for Unthrottled {
    async fn acquire(&self) {}
}

/// Fixed-interval gate
///
/// The first acquisition passes immediately; every following acquisition is
/// delayed until `interval` has elapsed since the previous one. Waiters are
/// served in arrival order.
#[derive(Debug)]
pub struct FixedIntervalGate {
    interval: Duration,
    last_grant: Mutex<Option<tokio::time::Instant>>,
}

impl FixedIntervalGate {
    /// Create a gate enforcing `interval` between consecutive requests
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_grant: Mutex::new(None) }
    }

    /// Configured spacing between requests
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl RateLimiter for FixedIntervalGate {
    async fn acquire(&self) {
        let mut last_grant = self.last_grant.lock().await;

        if let Some(previous) = *last_grant {
            let ready_at = previous + self.interval;
            if ready_at > tokio::time::Instant::now() {
                debug!(wait_ms = (ready_at - tokio::time::Instant::now()).as_millis() as u64, "pacing request");
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_grant = Some(tokio::time::Instant::now());
    }
}

/// Configuration for token bucket rate limiter
#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold
    pub capacity: u64,
    /// Number of tokens to refill per interval
    pub refill_amount: u64,
    /// Time interval for token refill
    pub refill_interval: Duration,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self { capacity: 10, refill_amount: 1, refill_interval: Duration::from_millis(250) }
    }
}

impl TokenBucketConfig {
    /// Create a new configuration builder
    pub fn builder() -> TokenBucketConfigBuilder {
        TokenBucketConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RateLimiterError> {
        if self.capacity == 0 {
            return Err(RateLimiterError("capacity must be greater than 0".to_string()));
        }
        if self.refill_amount == 0 {
            return Err(RateLimiterError("refill_amount must be greater than 0".to_string()));
        }
        if self.refill_interval.is_zero() {
            return Err(RateLimiterError("refill_interval must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for TokenBucketConfig
#[derive(Debug, Default)]
pub struct TokenBucketConfigBuilder {
    config: TokenBucketConfig,
}

impl TokenBucketConfigBuilder {
    pub fn new() -> Self {
        Self { config: TokenBucketConfig::default() }
    }

    pub fn capacity(mut self, capacity: u64) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn refill_amount(mut self, amount: u64) -> Self {
        self.config.refill_amount = amount;
        self
    }

    pub fn refill_interval(mut self, interval: Duration) -> Self {
        self.config.refill_interval = interval;
        self
    }

    pub fn build(self) -> Result<TokenBucketConfig, RateLimiterError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Token bucket rate limiter
///
/// Allows bursts of requests up to the capacity, then refills tokens at a fixed
/// rate. [`RateLimiter::acquire`] polls once per refill interval until a token
/// is available.
pub struct TokenBucket<C: Clock = SystemClock> {
    config: TokenBucketConfig,
    tokens: Arc<AtomicU64>,
    last_refill: Arc<RwLock<Instant>>,
    clock: Arc<C>,
}

impl<C: Clock> TokenBucket<C> {
    /// Create a new token bucket with custom clock
    pub fn with_clock(config: TokenBucketConfig, clock: C) -> Result<Self, RateLimiterError> {
        config.validate()?;

        Ok(Self {
            tokens: Arc::new(AtomicU64::new(config.capacity)),
            last_refill: Arc::new(RwLock::new(clock.now())),
            clock: Arc::new(clock),
            config,
        })
    }

    /// Refill tokens based on elapsed time
    fn refill(&self) {
        let now = self.clock.now();

        let last_refill = match self.last_refill.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn!("Token bucket last_refill lock poisoned");
                *poisoned.into_inner()
            }
        };

        let elapsed = now.duration_since(last_refill);
        let refills = elapsed.as_millis() / self.config.refill_interval.as_millis().max(1);

        if refills > 0 {
            let tokens_to_add = (refills as u64).saturating_mul(self.config.refill_amount);
            let current = self.tokens.load(Ordering::Acquire);
            let new_tokens = current.saturating_add(tokens_to_add).min(self.config.capacity);

            self.tokens.store(new_tokens, Ordering::Release);

            // Advance by whole intervals so partial progress is not lost
            if let Ok(mut guard) = self.last_refill.write() {
                *guard = last_refill
                    + self.config.refill_interval.saturating_mul(refills.min(u32::MAX as u128) as u32);
            }
        }
    }

    /// Try to acquire the specified number of tokens
    ///
    /// Returns `true` if tokens were acquired, `false` if not enough tokens
    /// available.
    pub fn try_acquire(&self, tokens: u64) -> bool {
        self.refill();

        let mut current = self.tokens.load(Ordering::Acquire);

        loop {
            if current < tokens {
                debug!("Rate limit: insufficient tokens ({} < {})", current, tokens);
                return false;
            }

            match self.tokens.compare_exchange_weak(
                current,
                current - tokens,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Get the current number of available tokens
    pub fn available_tokens(&self) -> u64 {
        self.refill();
        self.tokens.load(Ordering::Acquire)
    }
}

impl TokenBucket<SystemClock> {
    /// Create a new token bucket with system clock
    pub fn new(config: TokenBucketConfig) -> Result<Self, RateLimiterError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBucket")
            .field("config", &self.config)
            .field("tokens", &self.tokens.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl<C: Clock> RateLimiter for TokenBucket<C> {
    async fn acquire(&self) {
        while !self.try_acquire(1) {
            tokio::time::sleep(self.config.refill_interval).await;
        }
    }
}
