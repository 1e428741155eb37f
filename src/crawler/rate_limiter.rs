//! Per-host politeness delays
//!
//! The effective delay for a host is the larger of the configured minimum
//! delay and the crawl-delay its cached robots.txt declares. Each host owns an
//! async mutex that is held across the sleep and the timestamp update, so
//! concurrent callers for one host are serialized while distinct hosts never
//! wait on each other.

use crate::robots::RobotsCache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::debug;

type HostSlot = Arc<AsyncMutex<Option<Instant>>>;

/// Per-host request spacing
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    robots: Arc<RobotsCache>,
    robots_agent: String,
    hosts: Mutex<HashMap<String, HostSlot>>,
}

impl RateLimiter {
    /// Creates a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `min_delay` - Minimum spacing between two requests to one host
    /// * `robots` - Shared robots cache consulted for crawl-delay
    /// * `robots_agent` - Product token matched against robots.txt groups
    pub fn new(min_delay: Duration, robots: Arc<RobotsCache>, robots_agent: &str) -> Self {
        Self {
            min_delay,
            robots,
            robots_agent: robots_agent.to_string(),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Delay currently enforced for the host
    pub fn effective_delay(&self, host: &str) -> Duration {
        let robots_delay = self
            .robots
            .crawl_delay(host, &self.robots_agent)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(Duration::ZERO);

        self.min_delay.max(robots_delay)
    }

    /// Waits until a request to `host` may be dispatched, then stamps it
    ///
    /// Dropping the returned future before it completes leaves the host's
    /// timestamp untouched.
    pub async fn wait_for_slot(&self, host: &str) {
        let slot = self.slot(host);
        let mut last_request = slot.lock().await;

        if let Some(last) = *last_request {
            let delay = self.effective_delay(host);
            let ready_at = last + delay;
            if ready_at > Instant::now() {
                debug!(
                    "Waiting {:?} before next request to {}",
                    ready_at - Instant::now(),
                    host
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_request = Some(Instant::now());
    }

    fn slot(&self, host: &str) -> HostSlot {
        let mut hosts = match self.hosts.lock() {
            Ok(hosts) => hosts,
            Err(poisoned) => poisoned.into_inner(),
        };
        hosts.entry(host.to_string()).or_default().clone()
    }
}
