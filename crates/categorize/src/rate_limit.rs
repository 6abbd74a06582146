use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

/// Time source for the rate limiter.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock that only moves when told to. `sleep` advances it instantly and
/// records the requested duration.
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.lock().elapsed += by;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.lock().elapsed
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Keeps outbound lookups at least `delay` apart.
///
/// One limiter serves one sequential caller; `&mut self` on `await_turn`
/// keeps concurrent callers from sharing it without their own lock.
pub struct RateLimiter<C = SystemClock> {
    delay: Duration,
    clock: C,
    last_turn: Option<Instant>,
}

impl RateLimiter<SystemClock> {
    pub fn new(delay: Duration) -> Self {
        Self::with_clock(delay, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(delay: Duration, clock: C) -> Self {
        Self {
            delay,
            clock,
            last_turn: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until `delay` has passed since the previous turn. The first
    /// turn is granted immediately.
    pub async fn await_turn(&mut self) {
        if let Some(last) = self.last_turn {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.delay {
                let wait = self.delay - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "rate limiting search request");
                self.clock.sleep(wait).await;
            }
        }
        self.last_turn = Some(self.clock.now());
    }
}
