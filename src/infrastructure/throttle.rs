//! Fixed-window rate limiting for unresolved traffic
//!
//! Applies only to requests whose credential did not resolve; authenticated
//! traffic bypasses the limiter entirely. Windows are keyed by normalized
//! client address and are per process: horizontally scaled deployments do not
//! share counters.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Configuration for the unauthenticated-traffic throttle
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Fixed window length
    pub window: Duration,
    /// Admissions allowed per window per address
    pub max_requests: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
        }
    }
}

/// Outcome of a throttle check, with the standard remaining/reset metadata
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_in: Duration,
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counter per client address.
///
/// The window resets strictly when its length elapses, independent of
/// traffic; mid-window requests never extend it. Counter mutation happens
/// under one mutex so concurrent requests cannot lose increments.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    config: ThrottleConfig,
    windows: Mutex<HashMap<IpAddr, Window>>,
    last_cleanup: Mutex<Instant>,
}

impl FixedWindowLimiter {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    /// Count one unresolved request from the given address and decide
    /// admission
    pub fn check(&self, addr: IpAddr) -> RateLimitDecision {
        self.maybe_cleanup();

        let addr = normalize_client_addr(addr);
        let now = Instant::now();

        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        let window = windows.entry(addr).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(window.started_at) >= self.config.window {
            window.started_at = now;
            window.count = 0;
        }

        window.count += 1;

        let elapsed = now.duration_since(window.started_at);
        let reset_in = self.config.window.saturating_sub(elapsed);

        RateLimitDecision {
            allowed: window.count <= self.config.max_requests,
            limit: self.config.max_requests,
            remaining: self.config.max_requests.saturating_sub(window.count),
            reset_in,
        }
    }

    /// Drop windows idle past their length so the map stays bounded
    fn maybe_cleanup(&self) {
        let should_cleanup = {
            let last = self.last_cleanup.lock().expect("throttle lock poisoned");
            last.elapsed() >= self.config.window
        };

        if !should_cleanup {
            return;
        }

        let now = Instant::now();
        *self.last_cleanup.lock().expect("throttle lock poisoned") = now;

        let window = self.config.window;
        self.windows
            .lock()
            .expect("throttle lock poisoned")
            .retain(|_, w| now.duration_since(w.started_at) < window);
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

/// Folds IPv4-mapped IPv6 addresses onto their bare IPv4 form, so dual-stack
/// representations cannot evade a shared window
pub fn normalize_client_addr(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => addr,
        },
        IpAddr::V4(_) => addr,
    }
}
