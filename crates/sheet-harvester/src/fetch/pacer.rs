//! Fixed delay between sequential page requests.

use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Keeps at least `min_interval` between two acquisitions
#[derive(Debug)]
pub struct Pacer {
    /// Minimum gap between requests
    min_interval: Duration,
    /// Last request timestamp
    last_request: Option<Instant>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Wait until the next request may start
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait_time.as_millis(), "Pacing: waiting before next page");
                sleep(wait_time).await;
            }
        }

        self.last_request = Some(Instant::now());
    }
}
