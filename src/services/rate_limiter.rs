//! Login rate limiter
//!
//! Two sliding windows guard the login endpoint:
//! - failed attempts per username (5 per 15 minutes)
//! - attempts per client IP (10 per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

const USERNAME_LIMIT: usize = 5;
const USERNAME_WINDOW_MINUTES: i64 = 15;
const IP_LIMIT: usize = 10;
const IP_WINDOW_MINUTES: i64 = 1;

/// Timestamps of recent events per key, pruned to a fixed window
struct SlidingWindow<K> {
    limit: usize,
    window: Duration,
    events: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            events: RwLock::new(HashMap::new()),
        }
    }

    async fn is_limited(&self, key: K) -> bool {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        let times = events.entry(key).or_default();
        times.retain(|time| *time > cutoff);
        times.len() >= self.limit
    }

    async fn record(&self, key: K) {
        self.events.write().await.entry(key).or_default().push(Utc::now());
    }

    async fn clear(&self, key: &K) {
        self.events.write().await.remove(key);
    }

    async fn prune(&self) -> usize {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        events.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
        events.len()
    }
}

/// Login rate limiter shared across requests
pub struct LoginRateLimiter {
    usernames: SlidingWindow<String>,
    ips: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            usernames: SlidingWindow::new(USERNAME_LIMIT, Duration::minutes(USERNAME_WINDOW_MINUTES)),
            ips: SlidingWindow::new(IP_LIMIT, Duration::minutes(IP_WINDOW_MINUTES)),
        }
    }

    /// Usernames are compared case-insensitively
    pub async fn is_username_limited(&self, username: &str) -> bool {
        self.usernames.is_limited(username.to_lowercase()).await
    }

    pub async fn record_failed_attempt(&self, username: &str) {
        self.usernames.record(username.to_lowercase()).await;
    }

    /// Forget failures after a successful login
    pub async fn clear_username_attempts(&self, username: &str) {
        self.usernames.clear(&username.to_lowercase()).await;
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.ips.is_limited(ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ips.record(ip).await;
    }

    /// Drop stale entries; returns how many keys are still tracked
    pub async fn cleanup(&self) -> usize {
        self.usernames.prune().await + self.ips.prune().await
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
