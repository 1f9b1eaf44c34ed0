use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::scheduler::Scheduler;

/// Result of driving one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick ran and the next one is armed.
    Armed,
    /// The target has shut down; nothing ran and nothing was armed.
    Closed,
}

/// Something driven periodically by a [`Ticker`].
pub trait Tick: Send + Sync + 'static {
    fn tick(&self) -> TickOutcome;
}

/// Arms the next invocation of a periodic target on a scheduler.
///
/// The ticker only holds a weak handle: once the target is dropped, a
/// pending tick fires into nothing and the cycle ends. The target decides
/// whether to re-arm, which is how it stops after shutdown.
pub struct Ticker<S: Scheduler> {
    scheduler: Arc<S>,
    interval: Duration,
    target: Weak<dyn Tick>,
}

impl<S: Scheduler> Ticker<S> {
    pub fn new(scheduler: Arc<S>, interval: Duration, target: Weak<dyn Tick>) -> Self {
        Self {
            scheduler,
            interval,
            target,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedules one future tick one interval from now and returns its fire time.
    ///
    /// Returns `None` without scheduling anything when the fire time is not
    /// representable as an `Instant`.
    pub fn arm(&self) -> Option<Instant> {
        let Some(at) = self.scheduler.now().checked_add(self.interval) else {
            warn!(interval = ?self.interval, "tick interval overflows the clock, not arming");
            return None;
        };
        let target = self.target.clone();
        self.scheduler.put(
            Box::new(move || {
                if let Some(target) = target.upgrade() {
                    target.tick();
                }
            }),
            at,
        );
        Some(at)
    }
}

impl<S: Scheduler> fmt::Debug for Ticker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("interval", &self.interval)
            .field("target_alive", &(self.target.strong_count() > 0))
            .finish()
    }
}
