use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Circuit state as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    /// Tripped at the given instant; calls are refused until the reset window passes
    Open(Instant),
    /// Reset window passed; a single trial call decides between Closed and Open
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failures: u32,
    /// When the outstanding half-open trial was let through
    trial_started: Option<Instant>,
}

/// Consecutive-failure circuit breaker for the distributed tier
///
/// Clones share state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<RwLock<Inner>>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: BreakerState::Closed,
                failures: 0,
                trial_started: None,
            })),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
        }
    }

    /// Check if a call may go through, moving Open to HalfOpen once the window passes
    ///
    /// In HalfOpen only one trial call is admitted until it reports back. A
    /// trial that never reports (its caller was cancelled) is replaced after
    /// another reset window.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.write();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open(opened_at) => {
                if opened_at.elapsed() >= self.reset_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.trial_started = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => {
                let trial_pending = inner
                    .trial_started
                    .is_some_and(|started| started.elapsed() < self.reset_timeout);
                if trial_pending {
                    false
                } else {
                    inner.trial_started = Some(Instant::now());
                    true
                }
            }
        }
    }

    pub fn report_success(&self) {
        let mut inner = self.inner.write();
        inner.state = BreakerState::Closed;
        inner.failures = 0;
        inner.trial_started = None;
    }

    pub fn report_failure(&self) {
        let mut inner = self.inner.write();
        inner.trial_started = None;
        match inner.state {
            BreakerState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.failure_threshold {
                    inner.state = BreakerState::Open(Instant::now());
                }
            }
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open(Instant::now());
            }
            BreakerState::Open(_) => {}
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.read().state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state(), BreakerState::Open(_))
    }
}
