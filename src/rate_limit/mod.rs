//! Request pacing for calls to cloud APIs.
//!
//! The batch processor uses a [`RatePacer`] to keep outgoing requests under a
//! requests-per-minute budget. The OCR client uses [`backoff_delay`] to space
//! out its status polls.

mod pacer;

pub use pacer::{PacingMode, RateError, RatePacer};

use std::time::Duration;

/// Calculate exponential backoff delay for a given attempt, capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Get a numeric setting from an environment variable, if set and parseable.
pub fn env_number<T: std::str::FromStr>(env_var: &str) -> Option<T> {
    std::env::var(env_var).ok().and_then(|s| s.trim().parse().ok())
}
