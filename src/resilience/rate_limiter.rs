use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
  /// Operation starts admitted per window.
  pub max_requests: usize,
  /// Length of the trailing window.
  pub window: Duration,
}

impl RateLimitConfig {
  /// Allow `count` operation starts per second.
  pub fn per_second(count: usize) -> Self {
    Self {
      max_requests: count,
      window: Duration::from_secs(1),
    }
  }
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self::per_second(10)
  }
}

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

/// Sliding-window limiter: at most `max_requests` starts in any trailing
/// `window`.
///
/// `acquire` never fails, it only delays. Waiters queue on a fair mutex and
/// the holder sleeps with the lock held, so admission is strictly FIFO.
#[derive(Debug)]
pub struct RateLimiter {
  config: RateLimitConfig,
  starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
  pub fn new(config: RateLimitConfig) -> Self {
    Self {
      config,
      starts: Mutex::new(VecDeque::with_capacity(config.max_requests)),
    }
  }

  /// Wait until one more start fits in the window, then record it.
  pub async fn acquire(&self) {
    let mut starts = self.starts.lock().await;

    loop {
      let now = Instant::now();
      while starts
        .front()
        .is_some_and(|started| now.duration_since(*started) >= self.config.window)
      {
        starts.pop_front();
      }

      if starts.len() < self.config.max_requests.max(1) {
        starts.push_back(now);
        return;
      }

      // Full window: the oldest start is the next to age out.
      let Some(oldest) = starts.front().copied() else {
        continue;
      };
      let resume_at = oldest + self.config.window;
      debug!(wait = ?resume_at.duration_since(now), "rate limit reached, waiting");
      tokio::time::sleep_until(resume_at).await;
    }
  }

  /// Number of starts still inside the current window.
  pub async fn in_flight_window(&self) -> usize {
    let now = Instant::now();
    self
      .starts
      .lock()
      .await
      .iter()
      .filter(|started| now.duration_since(**started) < self.config.window)
      .count()
  }
}

impl Default for RateLimiter {
  fn default() -> Self {
    Self::new(RateLimitConfig::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  /// Largest number of starts found in any window-length span.
  fn max_starts_per_window(starts: &[Instant], window: Duration) -> usize {
    starts
      .iter()
      .map(|first| {
        starts
          .iter()
          .filter(|t| **t >= *first && t.duration_since(*first) < window)
          .count()
      })
      .max()
      .unwrap_or(0)
  }

  #[tokio::test(start_paused = true)]
  async fn test_burst_within_capacity_is_immediate() {
    let limiter = RateLimiter::default();
    let begin = Instant::now();

    for _ in 0..10 {
      limiter.acquire().await;
    }

    assert_eq!(Instant::now(), begin);
    assert_eq!(limiter.in_flight_window().await, 10);
  }

  #[tokio::test(start_paused = true)]
  async fn test_eleventh_start_waits_for_window() {
    let limiter = RateLimiter::default();
    let begin = Instant::now();

    for _ in 0..11 {
      limiter.acquire().await;
    }

    assert!(Instant::now().duration_since(begin) >= Duration::from_millis(1000));
  }

  #[tokio::test(start_paused = true)]
  async fn test_never_more_than_limit_per_window() {
    let limiter = Arc::new(RateLimiter::default());
    let mut handles = Vec::new();

    for _ in 0..35 {
      let limiter = Arc::clone(&limiter);
      handles.push(tokio::spawn(async move {
        limiter.acquire().await;
        Instant::now()
      }));
    }

    let mut starts = Vec::new();
    for handle in handles {
      starts.push(handle.await.unwrap());
    }
    starts.sort();

    assert_eq!(starts.len(), 35);
    assert!(max_starts_per_window(&starts, Duration::from_millis(1000)) <= 10);
  }

  #[tokio::test(start_paused = true)]
  async fn test_admission_is_fifo() {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::per_second(2)));
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut handles = Vec::new();

    for i in 0..6 {
      let limiter = Arc::clone(&limiter);
      let order = Arc::clone(&order);
      handles.push(tokio::spawn(async move {
        limiter.acquire().await;
        order.lock().unwrap().push(i);
      }));
      // Let each task reach the queue before spawning the next.
      tokio::task::yield_now().await;
    }

    for handle in handles {
      handle.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_window_slides() {
    let limiter = RateLimiter::new(RateLimitConfig::per_second(2));
    limiter.acquire().await;
    tokio::time::advance(Duration::from_millis(600)).await;
    limiter.acquire().await;

    // First start ages out at t=1000ms; third start must wait until then.
    let before = Instant::now();
    limiter.acquire().await;
    assert_eq!(Instant::now().duration_since(before), Duration::from_millis(400));
  }
}
