use std::time::Duration;

use rand::{thread_rng, Rng};

/// Exponential backoff with jitter that never gives up.
///
/// Attempt `n` waits somewhere in `[d/2, d]` where `d = min(max, min * 2^n)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            attempt: 0,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Upper bound for the current attempt, before jitter.
    fn ceiling(&self) -> Duration {
        2u32.checked_pow(self.attempt)
            .and_then(|factor| self.min.checked_mul(factor))
            .map_or(self.max, |d| d.min(self.max))
    }

    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling();
        self.attempt = self.attempt.saturating_add(1);

        let half = ceiling / 2;
        let jitter = thread_rng().gen_range(0..=(ceiling - half).as_millis() as u64);
        half + Duration::from_millis(jitter)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
