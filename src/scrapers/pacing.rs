use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Gate that spaces out outbound requests
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait until the next request may be issued
    async fn wait(&self);
}

/// Enforces a minimum interval between consecutive requests.
///
/// The interval runs from one request's start to the next one's start, so a
/// slow response eats into the gap. The first call passes straight through.
pub struct FixedIntervalPacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl FixedIntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Pacer for FixedIntervalPacer {
    async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                debug!("Pacing: waiting {:?}", ready_at - Instant::now());
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
