//! Bounded exponential-backoff retry.
//!
//! Errors classified as non-retryable (bad request, not found) are returned
//! after the first attempt. Everything else is retried up to `max_retries`
//! times, sleeping `min(initial_delay * multiplier^attempt, max_delay)`
//! between attempts. The caller always sees the last attempt's error.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
  fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
  /// Retries after the first attempt.
  pub max_retries: u32,
  pub initial_delay: Duration,
  pub max_delay: Duration,
  pub backoff_multiplier: f64,
}

impl RetryPolicy {
  pub const DEFAULT: RetryPolicy = RetryPolicy {
    max_retries: 3,
    initial_delay: Duration::from_secs(1),
    max_delay: Duration::from_secs(10),
    backoff_multiplier: 2.0,
  };

  /// Sleep before retry number `attempt + 1` (attempt counts from zero).
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
    let millis = self.initial_delay.as_millis() as f64 * factor;
    let capped = millis.min(self.max_delay.as_millis() as f64);
    Duration::from_millis(capped as u64)
  }

  /// Run `operation` until it succeeds, fails with a non-retryable error, or
  /// the retry budget is spent.
  ///
  /// `context` names the operation in log output.
  pub async fn run<T, E, F, Fut>(&self, context: &str, mut operation: F) -> Result<T, E>
  where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let mut attempt = 0u32;

    loop {
      match operation().await {
        Ok(value) => {
          if attempt > 0 {
            debug!(context, attempts = attempt + 1, "succeeded after retry");
          }
          return Ok(value);
        }
        Err(e) if !e.is_retryable() => {
          debug!(context, error = %e, "non-retryable error, giving up");
          return Err(e);
        }
        Err(e) if attempt >= self.max_retries => {
          error!(context, attempts = attempt + 1, error = %e, "retries exhausted");
          return Err(e);
        }
        Err(e) => {
          let delay = self.delay_for(attempt);
          warn!(
            context,
            attempt = attempt + 1,
            ?delay,
            error = %e,
            "attempt failed, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::DEFAULT
  }
}
