// src/schedule/retry.rs
// =============================================================================
// Retry-with-fixed-delay.
//
// The sampler runs unattended and treats every failure as transient, so the
// default policy retries forever. A ceiling can be configured; when it is
// reached the last error is handed back to the caller.
//
// Failures are logged at the policy's level: a failed page fetch is routine
// (warn), a whole cycle falling over is not (error).
// =============================================================================

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between a failure and the next attempt
    pub delay: Duration,
    /// Total attempts allowed; None = unlimited
    pub max_attempts: Option<u32>,
    /// Level at which failed attempts are logged
    pub failure_level: Level,
}

impl RetryPolicy {
    pub fn forever(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
            failure_level: Level::WARN,
        }
    }

    pub fn logged_at(mut self, level: Level) -> Self {
        self.failure_level = level;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Whether another attempt may follow `attempts_made` failed ones.
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts_made < max)
    }
}

/// Runs `op` until it succeeds or the policy runs out.
///
/// `what` names the operation in log lines.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                if attempts > 1 {
                    info!("{} succeeded after {} attempts", what, attempts);
                }
                return Ok(value);
            }
            Err(e) => {
                if !policy.allows_another(attempts) {
                    log_failure(
                        policy.failure_level,
                        format_args!("{} failed {} times, giving up: {:#}", what, attempts, e),
                    );
                    return Err(e);
                }
                log_failure(
                    policy.failure_level,
                    format_args!("{} failed (attempt {}): {:#}", what, attempts, e),
                );
                tokio::time::sleep(policy.delay).await;
                debug!("Retrying {}", what);
            }
        }
    }
}

// tracing macros need the level at compile time
fn log_failure(level: Level, message: std::fmt::Arguments<'_>) {
    if level == Level::ERROR {
        error!("{}", message);
    } else if level == Level::WARN {
        warn!("{}", message);
    } else if level == Level::INFO {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}
