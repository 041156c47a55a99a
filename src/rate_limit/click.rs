//! Per-IP throttle for *recording* clicks, independent of the redirect.

use dashmap::DashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const MIN_INTERVAL: Duration = Duration::from_millis(100);
const SWEEP_WINDOW: Duration = Duration::from_secs(60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Decides whether a click from a given IP should be recorded. The redirect
/// itself never depends on this decision.
pub struct ClickRateLimiter {
    last_recorded: DashMap<IpAddr, Instant>,
}

impl ClickRateLimiter {
    pub fn new() -> std::sync::Arc<Self> {
        let limiter = std::sync::Arc::new(Self {
            last_recorded: DashMap::new(),
        });
        limiter.clone().spawn_sweeper();
        limiter
    }

    /// Returns `true` if this click should be recorded, updating internal
    /// state as a side effect. At most one recorded click per 100 ms per IP.
    pub fn should_record(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        match self.last_recorded.get(&ip) {
            Some(last) if now.duration_since(*last) < MIN_INTERVAL => false,
            _ => {
                self.last_recorded.insert(ip, now);
                true
            }
        }
    }

    fn spawn_sweeper(self: std::sync::Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let cutoff = Instant::now();
                self.last_recorded
                    .retain(|_, last| cutoff.duration_since(*last) < SWEEP_WINDOW);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_click_from_an_ip_is_recorded() {
        let limiter = ClickRateLimiter {
            last_recorded: DashMap::new(),
        };
        assert!(limiter.should_record("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn rapid_second_click_is_not_recorded() {
        let limiter = ClickRateLimiter {
            last_recorded: DashMap::new(),
        };
        let ip = "127.0.0.1".parse().unwrap();
        assert!(limiter.should_record(ip));
        assert!(!limiter.should_record(ip));
    }

    #[test]
    fn click_after_interval_elapses_is_recorded() {
        let limiter = ClickRateLimiter {
            last_recorded: DashMap::new(),
        };
        let ip = "127.0.0.1".parse().unwrap();
        assert!(limiter.should_record(ip));
        limiter
            .last_recorded
            .insert(ip, Instant::now() - MIN_INTERVAL - Duration::from_millis(1));
        assert!(limiter.should_record(ip));
    }

    #[test]
    fn distinct_ips_are_independent() {
        let limiter = ClickRateLimiter {
            last_recorded: DashMap::new(),
        };
        assert!(limiter.should_record("10.0.0.1".parse().unwrap()));
        assert!(limiter.should_record("10.0.0.2".parse().unwrap()));
    }
}
