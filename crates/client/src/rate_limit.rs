//! Rate limiting for producer-side warnings
//!
//! Misused push sequences tend to repeat on every frame of the host loop.
//! Warnings about them are logged at most once per interval, with a count
//! of what was suppressed in between.

use std::time::{Duration, Instant};

/// Default interval between misuse warnings
pub(crate) const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(10);

/// Gate deciding whether a repeated warning should be logged
#[derive(Debug, Clone)]
pub(crate) struct RateLimitedWarn {
    min_interval: Duration,
    last_logged: Option<Instant>,
    suppressed: u64,
}

impl Default for RateLimitedWarn {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl RateLimitedWarn {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_logged: None,
            suppressed: 0,
        }
    }

    /// Record a warning
    ///
    /// Returns `Some(suppressed)` when it should be logged, carrying the
    /// number of warnings dropped since the last logged one.
    pub(crate) fn admit(&mut self) -> Option<u64> {
        self.admit_at(Instant::now())
    }

    #[cfg(test)]
    pub(crate) fn suppressed(&self) -> u64 {
        self.suppressed
    }

    fn admit_at(&mut self, now: Instant) -> Option<u64> {
        let due = match self.last_logged {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };
        if !due {
            self.suppressed += 1;
            return None;
        }
        self.last_logged = Some(now);
        Some(std::mem::take(&mut self.suppressed))
    }
}
