//! Rolling crawl health
//!
//! Tracks the outcome of the most recent requests and decides when a crawl
//! should stop itself. The window is strict: an old success does not hide a
//! run of recent failures once it has scrolled out.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Outcomes kept in the rolling window
pub const WINDOW_SIZE: usize = 100;

/// Samples required before the failure rate is judged
pub const MIN_SAMPLES: usize = 20;

/// Failure rate above which the crawl is considered failing
pub const MAX_FAILURE_RATE: f64 = 0.7;

/// A success within this long keeps a failing crawl alive
pub const SUCCESS_GRACE: Duration = Duration::from_secs(5 * 60);

/// Consecutive same-kind errors tolerated
pub const MAX_ERROR_STREAK: usize = 20;

#[derive(Debug)]
pub struct HealthMonitor {
    window: VecDeque<bool>,
    started: Instant,
    last_success: Option<Instant>,
    streak_kind: Option<String>,
    streak: usize,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_SIZE),
            started: Instant::now(),
            last_success: None,
            streak_kind: None,
            streak: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.push(true);
        self.last_success = Some(Instant::now());
        self.streak_kind = None;
        self.streak = 0;
    }

    /// Records a failure of the given kind (e.g. `timeout`, `http_503`)
    pub fn record_failure(&mut self, kind: &str) {
        self.push(false);
        if self.streak_kind.as_deref() == Some(kind) {
            self.streak += 1;
        } else {
            self.streak_kind = Some(kind.to_string());
            self.streak = 1;
        }
    }

    fn push(&mut self, ok: bool) {
        if self.window.len() == WINDOW_SIZE {
            self.window.pop_front();
        }
        self.window.push_back(ok);
    }

    pub fn samples(&self) -> usize {
        self.window.len()
    }

    pub fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|ok| !**ok).count();
        failures as f64 / self.window.len() as f64
    }

    /// Returns why the crawl is unhealthy, or `None` when it may continue
    pub fn check(&self) -> Option<String> {
        if self.streak > MAX_ERROR_STREAK {
            if let Some(kind) = &self.streak_kind {
                return Some(format!("{} consecutive {} errors", self.streak, kind));
            }
        }

        if self.window.len() < MIN_SAMPLES {
            return None;
        }

        let rate = self.failure_rate();
        let since_success = self.last_success.unwrap_or(self.started).elapsed();
        if rate > MAX_FAILURE_RATE && since_success >= SUCCESS_GRACE {
            return Some(format!(
                "{:.0}% of the last {} requests failed with no success in {} minutes",
                rate * 100.0,
                self.window.len(),
                SUCCESS_GRACE.as_secs() / 60
            ));
        }

        None
    }
}
