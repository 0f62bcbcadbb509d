use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};
use webhelm_config::BreakerConfig;

use super::{BreakerSnapshot, BreakerStatus, OperationClass};
use crate::clock::Clock;
use crate::error::BrowserError;

/// Rejection from an open (or probing) breaker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CircuitOpen {
    pub class: OperationClass,
    pub retry_after: Duration,
    pub probe_in_flight: bool,
}

impl CircuitOpen {
    pub fn message(&self) -> String {
        if self.probe_in_flight {
            format!(
                "{} circuit is half-open and a probe is in flight; retry shortly",
                self.class
            )
        } else {
            format!(
                "{} circuit is open after repeated failures; retry in {} ms",
                self.class,
                self.retry_after.as_millis()
            )
        }
    }
}

impl std::fmt::Display for CircuitOpen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl From<CircuitOpen> for BrowserError {
    fn from(open: CircuitOpen) -> Self {
        BrowserError::CircuitOpen {
            class: open.class,
            retry_after_ms: open.retry_after.as_millis() as u64,
            message: open.message(),
        }
    }
}

/// Error from [`CircuitBreaker::guard`].
#[derive(Debug, Error)]
pub enum GuardError<E> {
    #[error(transparent)]
    Open(CircuitOpen),

    #[error(transparent)]
    Inner(E),
}

#[derive(Debug)]
struct BreakerState {
    status: BreakerStatus,
    failure_count: u32,
    cooldown_deadline: Option<Instant>,
    probe_in_flight: bool,
}

pub struct CircuitBreaker {
    class: OperationClass,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(class: OperationClass, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            class,
            config,
            clock,
            state: Mutex::new(BreakerState {
                status: BreakerStatus::Closed,
                failure_count: 0,
                cooldown_deadline: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn class(&self) -> OperationClass {
        self.class
    }

    fn threshold(&self) -> u32 {
        self.config.failure_threshold.max(1)
    }

    /// Cooldown after `failures` counting failures.
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(self.threshold()).min(64) as i32;
        let ms = self.config.base_cooldown_ms as f64 * self.config.multiplier.powi(exponent);
        let capped = ms.min(self.config.max_cooldown_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Ask to run one call.
    ///
    /// An open breaker whose cooldown has elapsed turns half-open and hands
    /// the caller the single probe permit.
    pub fn acquire(&self) -> Result<Permit<'_>, CircuitOpen> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        match state.status {
            BreakerStatus::Closed => Ok(Permit::new(self, false)),
            BreakerStatus::Open => {
                let deadline = state.cooldown_deadline.unwrap_or(now);
                if now < deadline {
                    return Err(CircuitOpen {
                        class: self.class,
                        retry_after: deadline - now,
                        probe_in_flight: false,
                    });
                }
                info!("{} circuit half-open, admitting probe", self.class);
                state.status = BreakerStatus::HalfOpen;
                state.probe_in_flight = true;
                Ok(Permit::new(self, true))
            }
            BreakerStatus::HalfOpen => {
                if state.probe_in_flight {
                    return Err(CircuitOpen {
                        class: self.class,
                        retry_after: Duration::ZERO,
                        probe_in_flight: true,
                    });
                }
                state.probe_in_flight = true;
                Ok(Permit::new(self, true))
            }
        }
    }

    /// Run `f` behind the breaker. `counts` decides whether an error counts
    /// as a failure; `f` is never invoked while the breaker rejects.
    pub async fn guard<T, E, F, Fut, C>(&self, f: F, counts: C) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
    {
        let permit = self.acquire().map_err(GuardError::Open)?;
        match f().await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(e) => {
                permit.failure(counts(&e));
                Err(GuardError::Inner(e))
            }
        }
    }

    pub fn status(&self) -> BreakerStatus {
        self.state.lock().status
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = self.clock.now();
        let state = self.state.lock();
        let retry_after_ms = match (state.status, state.cooldown_deadline) {
            (BreakerStatus::Open, Some(deadline)) => {
                deadline.saturating_duration_since(now).as_millis() as u64
            }
            _ => 0,
        };
        BreakerSnapshot {
            class: self.class,
            status: state.status,
            failure_count: state.failure_count,
            retry_after_ms,
        }
    }

    fn on_success(&self, probe: bool) {
        let mut state = self.state.lock();
        if probe {
            info!("{} circuit closed after successful probe", self.class);
            state.status = BreakerStatus::Closed;
            state.cooldown_deadline = None;
            state.probe_in_flight = false;
            state.failure_count = 0;
        } else if state.status == BreakerStatus::Closed {
            state.failure_count = 0;
        }
    }

    fn on_failure(&self, probe: bool, counts: bool) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if probe {
            state.probe_in_flight = false;
            if !counts {
                debug!("{} probe failed without counting; still half-open", self.class);
                return;
            }
            state.failure_count += 1;
            self.trip(&mut state, now);
            return;
        }

        if !counts {
            return;
        }
        state.failure_count += 1;
        if state.status == BreakerStatus::Closed && state.failure_count >= self.threshold() {
            self.trip(&mut state, now);
        }
    }

    fn trip(&self, state: &mut BreakerState, now: Instant) {
        let cooldown = self.backoff(state.failure_count);
        state.status = BreakerStatus::Open;
        state.cooldown_deadline = Some(now + cooldown);
        warn!(
            "{} circuit opened after {} failures; cooling down for {} ms",
            self.class,
            state.failure_count,
            cooldown.as_millis()
        );
    }

    fn release_probe(&self) {
        let mut state = self.state.lock();
        state.probe_in_flight = false;
    }
}

/// Admission to run one call. Resolve it with `success` or `failure`;
/// dropping an unresolved probe permit frees the probe slot.
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    resolved: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            resolved: false,
        }
    }

    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.on_success(self.probe);
    }

    pub fn failure(mut self, counts: bool) {
        self.resolved = true;
        self.breaker.on_failure(self.probe, counts);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.probe && !self.resolved {
            debug!("{} probe abandoned", self.breaker.class);
            self.breaker.release_probe();
        }
    }
}
