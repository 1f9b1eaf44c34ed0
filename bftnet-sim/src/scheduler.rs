//! # Schedulers
//!
//! Peers own no threads. Every delivery and every tick is a [`Task`] handed
//! to a [`Scheduler`] together with the instant it should fire at.
//!
//! - [`TokioScheduler`] runs tasks on a tokio runtime in real time.
//! - [`ManualScheduler`] keeps a virtual clock and only runs tasks when a
//!   test tells it to, which makes timing fully deterministic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::trace;

/// A callback submitted for later execution.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Timed executor collaborator.
///
/// `put` is fire-and-forget: there is no handle and no cancellation. A task
/// runs at or after `at`, never before; a fire time in the past means "as
/// soon as possible". No ordering is promised between two tasks beyond that.
pub trait Scheduler: Send + Sync + 'static {
    fn put(&self, task: Task, at: Instant);

    /// The scheduler's notion of the current instant.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Real-time scheduler backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Binds to the runtime the caller is running on, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn put(&self, task: Task, at: Instant) {
        self.handle.spawn(async move {
            tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await;
            task();
        });
    }
}

struct Entry {
    at: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // BinaryHeap is a max-heap; invert so the earliest entry is on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct ManualState {
    now: Instant,
    next_seq: u64,
    queue: BinaryHeap<Entry>,
}

/// Virtual-time scheduler for deterministic tests.
///
/// Tasks are run in `(fire time, submission order)` order, and only from
/// inside `run_*` calls. Running a task advances the virtual clock to its
/// fire time. Tasks may submit new tasks while they run.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now,
                next_seq: 0,
                queue: BinaryHeap::new(),
            }),
        }
    }

    /// Number of submitted tasks that have not run yet.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Fire times of all pending tasks, earliest first.
    pub fn pending_fire_times(&self) -> Vec<Instant> {
        let state = self.state.lock();
        let mut times: Vec<Instant> = state.queue.iter().map(|e| e.at).collect();
        times.sort();
        times
    }

    pub fn next_fire_time(&self) -> Option<Instant> {
        self.state.lock().queue.peek().map(|e| e.at)
    }

    /// Runs the earliest pending task. Returns `false` if nothing was queued.
    pub fn run_next(&self) -> bool {
        let task = {
            let mut state = self.state.lock();
            match state.queue.pop() {
                Some(entry) => {
                    if entry.at > state.now {
                        state.now = entry.at;
                    }
                    entry.task
                }
                None => return false,
            }
        };
        task();
        true
    }

    /// Runs every task due at or before `deadline`, including tasks that
    /// become due while running, then moves the clock to `deadline`.
    pub fn run_until(&self, deadline: Instant) -> usize {
        let mut ran = 0;
        loop {
            let task = {
                let mut state = self.state.lock();
                match state.queue.peek() {
                    Some(entry) if entry.at <= deadline => {}
                    _ => {
                        if deadline > state.now {
                            state.now = deadline;
                        }
                        break;
                    }
                }
                let entry = match state.queue.pop() {
                    Some(entry) => entry,
                    None => break,
                };
                if entry.at > state.now {
                    state.now = entry.at;
                }
                entry.task
            };
            task();
            ran += 1;
        }
        ran
    }

    /// Advances the virtual clock by `by`, running everything that falls due.
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.now() + by;
        self.run_until(deadline)
    }

    /// Runs tasks until the queue drains or `max_steps` tasks have run.
    ///
    /// The step bound matters when a periodic ticker is still armed, since
    /// the queue would otherwise never empty.
    pub fn run_all(&self, max_steps: usize) -> usize {
        let mut ran = 0;
        while ran < max_steps && self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn put(&self, task: Task, at: Instant) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        trace!(seq, ?at, "task queued");
        state.queue.push(Entry { at, seq, task });
    }

    fn now(&self) -> Instant {
        self.state.lock().now
    }
}
