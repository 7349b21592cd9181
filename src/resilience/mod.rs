//! Outbound call policies: admission rate limiting and retry with backoff.

mod rate_limiter;
mod retry;

pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use retry::{Retryable, RetryPolicy};
