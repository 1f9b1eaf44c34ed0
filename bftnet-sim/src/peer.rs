//! # IPC Peer
//!
//! An in-process peer that "sends" by calling straight into another engine,
//! after an artificial delay drawn from a normal distribution around the
//! configured mean latency.
//!
//! Every message gets an independent delay, so messages routinely overtake
//! each other, as they would on a real asynchronous network.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use bftnet_core::{
    network::Peer, Consensus, Delay, Height, PeerAddr, PublicKey, Result, Round, State,
};
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::config::{DeliveryOnClose, IpcConfig, NegativeDelayPolicy};
use crate::delay::{shared_rng, DelayGenerator, SharedRng};
use crate::lifecycle::Shutdown;
use crate::scheduler::Scheduler;
use crate::stats::{LatencyStats, PeerStats};
use crate::ticker::{Tick, TickOutcome, Ticker};

struct PeerInner<E: Consensus, S: Scheduler> {
    engine: Arc<E>,
    scheduler: Arc<S>,
    delay: DelayGenerator,
    negative_delay: NegativeDelayPolicy,
    on_close: DeliveryOnClose,
    addr: PeerAddr,
    // Guards the counters and serializes deliveries, ticks and passthroughs.
    stats: Mutex<PeerStats>,
    shutdown: Shutdown,
    ticker: Ticker<S>,
}

impl<E: Consensus, S: Scheduler> PeerInner<E, S> {
    fn deliver(&self, message: Bytes, delay: Delay) {
        let mut stats = self.stats.lock();

        if self.on_close == DeliveryOnClose::Drop && self.shutdown.is_closed() {
            stats.record_drop();
            debug!(
                peer = %self.addr,
                bytes = message.len(),
                "dropped in-flight message after close"
            );
            return;
        }

        stats.record_delivery(delay, message.len());
        trace!(peer = %self.addr, %delay, bytes = message.len(), "message delivered");

        if let Err(err) = self.engine.receive_message(&message, SystemTime::now()) {
            debug!(peer = %self.addr, %err, "engine rejected message");
        }
    }

    fn update(&self) -> TickOutcome {
        let _guard = self.stats.lock();

        if self.shutdown.is_closed() {
            return TickOutcome::Closed;
        }

        if let Err(err) = self.engine.update(SystemTime::now()) {
            debug!(peer = %self.addr, %err, "engine update failed");
        }

        self.ticker.arm();
        TickOutcome::Armed
    }
}

impl<E: Consensus, S: Scheduler> Tick for PeerInner<E, S> {
    fn tick(&self) -> TickOutcome {
        self.update()
    }
}

/// Handle to a simulated peer bound to one consensus engine.
///
/// Cloning the handle is cheap and yields the same peer.
pub struct IpcPeer<E: Consensus, S: Scheduler> {
    inner: Arc<PeerInner<E, S>>,
}

impl<E: Consensus, S: Scheduler> Clone for IpcPeer<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Consensus, S: Scheduler> IpcPeer<E, S> {
    /// Creates a peer with its own random source, seeded from the config.
    pub fn new(engine: Arc<E>, config: IpcConfig, scheduler: Arc<S>) -> Result<Self> {
        let rng = shared_rng(config.randomization_seed);
        Self::with_rng(engine, config, scheduler, rng)
    }

    /// Creates a peer drawing delays from an existing random source.
    pub fn with_rng(
        engine: Arc<E>,
        config: IpcConfig,
        scheduler: Arc<S>,
        rng: SharedRng,
    ) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new_cyclic(|weak: &Weak<PeerInner<E, S>>| {
            let target: Weak<dyn Tick> = weak.clone();
            PeerInner {
                engine,
                ticker: Ticker::new(scheduler.clone(), config.tick_interval, target),
                scheduler,
                delay: DelayGenerator::new(config.latency, config.jitter_ratio, rng),
                negative_delay: config.negative_delay,
                on_close: config.on_close,
                addr: PeerAddr::new(),
                stats: Mutex::new(PeerStats::default()),
                shutdown: Shutdown::new(),
            }
        });

        info!(
            peer = %inner.addr,
            latency = ?config.latency,
            tick = ?config.tick_interval,
            "created ipc peer"
        );

        Ok(Self { inner })
    }

    /// Schedules `message` for delivery after a sampled delay.
    ///
    /// Never blocks. Statistics change when the delivery fires, not here.
    pub fn send(&self, message: impl Into<Bytes>) {
        let message = message.into();
        let sampled = self.inner.delay.sample();

        let recorded = match self.inner.negative_delay {
            NegativeDelayPolicy::Clamp => sampled.max_zero(),
            NegativeDelayPolicy::FireImmediately => sampled,
        };
        let at = self.inner.scheduler.now() + recorded.clamped();

        trace!(
            peer = %self.inner.addr,
            delay = %recorded,
            bytes = message.len(),
            "message scheduled"
        );

        let inner = self.inner.clone();
        self.inner
            .scheduler
            .put(Box::new(move || inner.deliver(message, recorded)), at);
    }

    /// Ticks the engine's clock and arms the next tick, unless closed.
    pub fn update(&self) -> TickOutcome {
        self.inner.update()
    }

    /// Stops the update loop. Returns `true` for the call that closed it.
    ///
    /// Already scheduled ticks and deliveries are not cancelled.
    pub fn close(&self) -> bool {
        let closed = self.inner.shutdown.close();
        if closed {
            info!(peer = %self.inner.addr, "ipc peer closed");
        }
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_closed()
    }

    /// The bound engine's key; peers have no key of their own.
    pub fn public_key(&self) -> PublicKey {
        self.inner.engine.public_key()
    }

    pub fn remote_addr(&self) -> PeerAddr {
        self.inner.addr
    }

    pub fn mean_latency(&self) -> Duration {
        self.inner.delay.mean()
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.inner.engine
    }

    pub fn message_count(&self) -> u64 {
        self.inner.stats.lock().messages
    }

    pub fn bytes_count(&self) -> u64 {
        self.inner.stats.lock().bytes
    }

    pub fn latencies(&self) -> LatencyStats {
        self.inner.stats.lock().latencies
    }

    pub fn stats(&self) -> PeerStats {
        *self.inner.stats.lock()
    }

    /// Proposes a state to be finalized at the next height.
    pub fn propose(&self, state: State) {
        let _guard = self.inner.stats.lock();
        self.inner.engine.propose(state);
    }

    pub fn latest_state(&self) -> (Height, Round, State) {
        let _guard = self.inner.stats.lock();
        self.inner.engine.current_state()
    }
}

impl<E: Consensus, S: Scheduler> Peer for IpcPeer<E, S> {
    fn public_key(&self) -> PublicKey {
        IpcPeer::public_key(self)
    }

    fn remote_addr(&self) -> PeerAddr {
        IpcPeer::remote_addr(self)
    }

    fn send(&self, message: Bytes) -> Result<()> {
        IpcPeer::send(self, message);
        Ok(())
    }
}

impl<E: Consensus, S: Scheduler> fmt::Debug for IpcPeer<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpcPeer")
            .field("addr", &self.inner.addr)
            .field("latency", &self.inner.delay.mean())
            .field("closed", &self.inner.shutdown.is_closed())
            .finish()
    }
}
