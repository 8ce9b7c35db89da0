use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failures within `window` that trip the breaker.
    pub failure_threshold: usize,
    /// Sliding window over which failures are counted.
    pub window: Duration,
    /// How long the breaker stays open before a half-open probe.
    pub open_for: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(30),
            open_for: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum Inner {
    Closed { failures: Vec<Instant> },
    Open { since: Instant },
    HalfOpen,
}

/// Stateful guard in front of the registry fetch.
///
/// Five failures inside a 30 second window open the circuit; while open,
/// calls fail fast. After 30 seconds the next call runs as a half-open
/// probe: success closes the circuit, failure re-opens it.
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::Closed { failures: Vec::new() }),
        }
    }

    /// Whether a call may proceed. Transitions open → half-open once the
    /// open period has elapsed.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker poisoned");
        match &*inner {
            Inner::Closed { .. } | Inner::HalfOpen => true,
            Inner::Open { since } => {
                if since.elapsed() >= self.config.open_for {
                    info!("Circuit breaker half-open, probing registry");
                    *inner = Inner::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker poisoned");
        if matches!(&*inner, Inner::HalfOpen) {
            info!("Circuit breaker closed after successful probe");
        }
        *inner = Inner::Closed { failures: Vec::new() };
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker poisoned");
        let now = Instant::now();

        match &mut *inner {
            Inner::Closed { failures } => {
                failures.push(now);
                failures.retain(|at| now.duration_since(*at) < self.config.window);
                if failures.len() >= self.config.failure_threshold {
                    warn!(
                        failures = failures.len(),
                        "Circuit breaker opened after repeated registry failures"
                    );
                    *inner = Inner::Open { since: now };
                }
            }
            Inner::HalfOpen => {
                warn!("Circuit breaker re-opened after failed probe");
                *inner = Inner::Open { since: now };
            }
            Inner::Open { .. } => {}
        }
    }

    pub fn state(&self) -> BreakerState {
        match &*self.inner.lock().expect("breaker poisoned") {
            Inner::Closed { .. } => BreakerState::Closed,
            Inner::Open { .. } => BreakerState::Open,
            Inner::HalfOpen => BreakerState::HalfOpen,
        }
    }
}
