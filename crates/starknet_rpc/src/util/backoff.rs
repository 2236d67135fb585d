use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::time::Duration;

/// Per-object exponential delay for failed reconciliations.
///
/// The controller's error policy is synchronous, so the failure counts live
/// behind a plain mutex. A key without a failure for twice the maximum delay
/// is forgotten, which drops objects deleted while failing.
#[derive(Clone, Debug)]
pub struct ErrorBackoff {
    initial: Duration,
    max: Duration,
    failures: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
}

impl Default for ErrorBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(5 * 60))
    }
}

impl ErrorBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records one more failure for `key` and returns the delay before the next attempt
    pub fn next_delay(&self, key: &str) -> Duration {
        let now = Instant::now();
        let expiry = self.max.saturating_mul(2);
        let attempts = match self.failures.lock() {
            Ok(mut failures) => {
                failures.retain(|_, (_, last)| now.duration_since(*last) < expiry);
                let (count, last) = failures.entry(key.to_string()).or_insert((0, now));
                *count = count.saturating_add(1);
                *last = now;
                *count
            }
            Err(_) => return self.max,
        };

        let exponent = attempts.saturating_sub(1).min(16);
        self.initial.saturating_mul(1 << exponent).min(self.max)
    }

    /// Forgets the failures of `key` after a successful reconciliation or
    /// once its object is being deleted
    pub fn reset(&self, key: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(key);
        }
    }
}
