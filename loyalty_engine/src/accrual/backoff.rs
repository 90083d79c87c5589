use std::time::Duration;

use log::*;

/// The "resume not before" delay requested by the accrual service when it rate limits us.
///
/// The delay applies to all orders, not just the one that triggered it. The worker sleeps it off at the end of the
/// iteration in which it was set.
#[derive(Debug, Clone, Default)]
pub struct Backoff {
    delay: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn current(&self) -> Duration {
        self.delay
    }

    pub fn is_active(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Sleeps for the current delay, then clears it. A no-op when no delay is set.
    pub async fn wait(&mut self) {
        if self.is_active() {
            info!("⏳️ Backing off for {:?} before the next accrual request", self.delay);
            tokio::time::sleep(self.delay).await;
        }
        self.delay = Duration::ZERO;
    }
}
