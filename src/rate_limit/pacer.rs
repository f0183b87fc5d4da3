//! Fixed-rate pacing for sequential request streams.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RateError {
    #[error("rate must be a positive number of requests per minute, got {0}")]
    InvalidRate(f64),
}

/// How the interval between requests is measured.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PacingMode {
    /// Space request starts by the interval; request latency counts toward it.
    #[default]
    Interval,
    /// Sleep the full interval after every request, on top of its latency.
    FixedDelay,
}

impl PacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::FixedDelay => "fixed-delay",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "interval" => Some(Self::Interval),
            "fixed-delay" | "fixed_delay" | "fixed" => Some(Self::FixedDelay),
            _ => None,
        }
    }
}

/// Paces a sequence of requests to at most `rate` per minute.
///
/// The first call to [`wait_turn`](Self::wait_turn) never waits. Later calls
/// wait according to the [`PacingMode`]. Not shared between tasks: one pacer
/// belongs to one sequential flow.
#[derive(Debug)]
pub struct RatePacer {
    interval: Duration,
    mode: PacingMode,
    last_start: Option<Instant>,
    turns: u64,
}

impl RatePacer {
    /// Create a pacer for `rate` requests per minute.
    pub fn per_minute(rate: f64, mode: PacingMode) -> Result<Self, RateError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(RateError::InvalidRate(rate));
        }
        let interval =
            Duration::try_from_secs_f64(60.0 / rate).map_err(|_| RateError::InvalidRate(rate))?;
        Ok(Self::with_interval(interval, mode))
    }

    pub fn with_interval(interval: Duration, mode: PacingMode) -> Self {
        Self {
            interval,
            mode,
            last_start: None,
            turns: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    /// Number of turns granted so far.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// How long the next turn would have to wait if requested now.
    pub fn time_until_ready(&self) -> Duration {
        let Some(last) = self.last_start else {
            return Duration::ZERO;
        };
        match self.mode {
            PacingMode::FixedDelay => self.interval,
            PacingMode::Interval => self.interval.saturating_sub(last.elapsed()),
        }
    }

    /// Wait until the next request may start, then mark it as started.
    /// Returns how long this call slept.
    pub async fn wait_turn(&mut self) -> Duration {
        let wait = self.time_until_ready();
        if wait > Duration::ZERO {
            debug!("Pacing: waiting {:?} before request {}", wait, self.turns + 1);
            tokio::time::sleep(wait).await;
        }
        self.last_start = Some(Instant::now());
        self.turns += 1;
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_rate() {
        let pacer = RatePacer::per_minute(15.0, PacingMode::Interval).unwrap();
        assert_eq!(pacer.interval(), Duration::from_secs(4));

        let pacer = RatePacer::per_minute(120.0, PacingMode::FixedDelay).unwrap();
        assert_eq!(pacer.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_rejects_invalid_rate() {
        assert_eq!(
            RatePacer::per_minute(0.0, PacingMode::Interval).unwrap_err(),
            RateError::InvalidRate(0.0)
        );
        assert!(RatePacer::per_minute(-3.0, PacingMode::Interval).is_err());
        assert!(RatePacer::per_minute(f64::NAN, PacingMode::Interval).is_err());
        assert!(RatePacer::per_minute(f64::INFINITY, PacingMode::Interval).is_err());
    }

    #[test]
    fn test_rejects_rate_too_small_for_interval() {
        assert_eq!(
            RatePacer::per_minute(1e-20, PacingMode::Interval).unwrap_err(),
            RateError::InvalidRate(1e-20)
        );
        assert!(RatePacer::per_minute(f64::MIN_POSITIVE, PacingMode::FixedDelay).is_err());
        // One request a day is still representable.
        assert!(RatePacer::per_minute(1.0 / 1440.0, PacingMode::Interval).is_ok());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(PacingMode::from_str("interval"), Some(PacingMode::Interval));
        assert_eq!(PacingMode::from_str("Fixed-Delay"), Some(PacingMode::FixedDelay));
        assert_eq!(PacingMode::from_str("bucket"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_turn_does_not_wait() {
        let mut pacer = RatePacer::per_minute(15.0, PacingMode::FixedDelay).unwrap();
        let start = Instant::now();
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(pacer.turns(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_adds_latency() {
        let mut pacer = RatePacer::per_minute(15.0, PacingMode::FixedDelay).unwrap();
        let start = Instant::now();

        pacer.wait_turn().await;
        tokio::time::sleep(Duration::from_secs(1)).await; // simulated request
        pacer.wait_turn().await;

        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_absorbs_latency() {
        let mut pacer = RatePacer::per_minute(15.0, PacingMode::Interval).unwrap();
        let start = Instant::now();

        pacer.wait_turn().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let waited = pacer.wait_turn().await;

        assert_eq!(waited, Duration::from_secs(3));
        assert_eq!(start.elapsed(), Duration::from_secs(4));

        // Latency longer than the interval means no wait at all.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
    }
}
