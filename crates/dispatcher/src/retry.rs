//! Exponential backoff bounded by total elapsed time

use std::time::Duration;

use contracts::RetryConfig;
use rand::Rng;

/// Backoff state for one batch
///
/// Each delay is the current interval randomized by `± randomization_factor`;
/// the interval then grows by `multiplier` up to `max_interval`. Once
/// `max_elapsed` has passed since the first attempt there are no more delays,
/// and the last delay is shortened so the final attempt lands on the ceiling.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    current_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    max_interval: Duration,
    max_elapsed: Duration,
}

impl ExponentialBackoff {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            initial_interval: config.initial_interval(),
            current_interval: config.initial_interval(),
            multiplier: config.multiplier,
            randomization_factor: config.randomization_factor,
            max_interval: config.max_interval(),
            max_elapsed: config.max_elapsed(),
        }
    }

    /// Delay before the next attempt, or `None` to give up
    pub fn next_backoff(&mut self, elapsed: Duration) -> Option<Duration> {
        if elapsed >= self.max_elapsed {
            return None;
        }

        let delay = self.randomize(self.current_interval);
        self.current_interval = self
            .current_interval
            .mul_f64(self.multiplier)
            .min(self.max_interval);

        Some(delay.min(self.max_elapsed - elapsed))
    }

    fn randomize(&self, interval: Duration) -> Duration {
        if self.randomization_factor <= 0.0 {
            return interval;
        }
        let delta = interval.as_secs_f64() * self.randomization_factor;
        let low = interval.as_secs_f64() - delta;
        let high = interval.as_secs_f64() + delta;
        Duration::from_secs_f64(rand::rng().random_range(low..=high))
    }
}
