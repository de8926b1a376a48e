// ABOUTME: Bounded retry policy for remote storage and routing operations.
// ABOUTME: Runs any async fallible operation with a fixed or exponential delay between attempts.

use serde::Deserialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles after every failed attempt, capped at `max_delay`.
    Exponential,
}

/// Retry configuration shared by every network step of a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,

    #[serde(default)]
    pub backoff: Backoff,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
}

fn default_attempts() -> u32 {
    3
}

fn default_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay: default_delay(),
            backoff: Backoff::default(),
            max_delay: default_max_delay(),
        }
    }
}

/// The last error of an operation that never succeeded.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub error: E,
}

impl RetryPolicy {
    /// A policy that tries once and never sleeps.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Policy with the given attempt count and no delay (for tests and dry runs).
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay to wait after `attempt` (1-indexed) failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let pow = attempt.saturating_sub(1).min(16);
                self.delay
                    .saturating_mul(2_u32.saturating_pow(pow))
                    .min(self.max_delay)
            }
        }
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// The closure receives the current attempt number, starting at 1. `step`
    /// only names the operation in log output.
    pub async fn run<T, E, F, Fut>(&self, step: &str, mut operation: F) -> Result<T, Exhausted<E>>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= attempts => {
                    tracing::error!(step, attempt, "giving up: {}", error);
                    return Err(Exhausted { attempts, error });
                }
                Err(error) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        step,
                        attempt,
                        "attempt failed, retrying in {:?}: {}",
                        delay,
                        error
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
