//! Consensus engine doubles.
//!
//! - [`RecordingEngine`] records every call it receives and can be told to
//!   reject messages, so tests can check what a transport delivered.
//! - [`GossipEngine`] is a toy replicated log: proposing a state bumps the
//!   height and floods it to every attached peer; receivers adopt any state
//!   with a higher height. Enough protocol to watch a mesh converge.
//!   Peers are held weakly, since each peer keeps its bound engine alive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use bftnet_core::{network::Peer, Consensus, ConsensusError, Height, PublicKey, Round, State};
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::debug;

/// One message as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub payload: Bytes,
    pub at: SystemTime,
}

#[derive(Debug)]
pub struct RecordingEngine {
    key: PublicKey,
    received: Mutex<Vec<Received>>,
    updates: AtomicUsize,
    proposals: Mutex<Vec<State>>,
    reject_with: Mutex<Option<ConsensusError>>,
}

impl RecordingEngine {
    pub fn new(key: impl Into<Bytes>) -> Arc<Self> {
        Arc::new(Self {
            key: PublicKey::new(key),
            received: Mutex::new(Vec::new()),
            updates: AtomicUsize::new(0),
            proposals: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
        })
    }

    /// Makes every later `receive_message` and `update` fail with `error`.
    pub fn reject_with(&self, error: ConsensusError) {
        *self.reject_with.lock() = Some(error);
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    pub fn payloads(&self) -> Vec<Bytes> {
        self.received
            .lock()
            .iter()
            .map(|r| r.payload.clone())
            .collect()
    }

    pub fn received_count(&self) -> usize {
        self.received.lock().len()
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn proposals(&self) -> Vec<State> {
        self.proposals.lock().clone()
    }
}

impl Consensus for RecordingEngine {
    fn receive_message(&self, message: &[u8], now: SystemTime) -> Result<(), ConsensusError> {
        self.received.lock().push(Received {
            payload: Bytes::copy_from_slice(message),
            at: now,
        });
        match *self.reject_with.lock() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn update(&self, _now: SystemTime) -> Result<(), ConsensusError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        match *self.reject_with.lock() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn propose(&self, state: State) {
        self.proposals.lock().push(state);
    }

    fn current_state(&self) -> (Height, Round, State) {
        let proposals = self.proposals.lock();
        let state = proposals.last().cloned().unwrap_or_default();
        (Height::new(proposals.len() as u64), Round::default(), state)
    }

    fn public_key(&self) -> PublicKey {
        self.key.clone()
    }
}

#[derive(Debug, Default)]
struct Decided {
    height: Height,
    round: Round,
    state: State,
}

pub struct GossipEngine {
    key: PublicKey,
    decided: Mutex<Decided>,
    peers: Mutex<Vec<Weak<dyn Peer>>>,
    rejected: AtomicUsize,
    ticks: AtomicUsize,
}

impl GossipEngine {
    pub fn new(key: impl Into<Bytes>) -> Arc<Self> {
        Arc::new(Self {
            key: PublicKey::new(key),
            decided: Mutex::new(Decided::default()),
            peers: Mutex::new(Vec::new()),
            rejected: AtomicUsize::new(0),
            ticks: AtomicUsize::new(0),
        })
    }

    /// Adds peers this engine floods proposals to.
    ///
    /// Only weak handles are kept: the caller owns the peers, and a peer
    /// dropped by its owner is skipped from then on.
    pub fn attach<'a>(&self, peers: impl IntoIterator<Item = &'a Arc<dyn Peer>>) {
        self.peers.lock().extend(peers.into_iter().map(Arc::downgrade));
    }

    /// Number of attached peers that are still alive.
    pub fn attached(&self) -> usize {
        self.peers
            .lock()
            .iter()
            .filter(|peer| peer.strong_count() > 0)
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }

    fn encode(height: Height, state: &State) -> Bytes {
        let mut buf = BytesMut::with_capacity(8 + state.len());
        buf.put_u64(height.value());
        buf.put_slice(state.as_bytes());
        buf.freeze()
    }

    fn decode(message: &[u8]) -> Result<(Height, State), ConsensusError> {
        if message.is_empty() {
            return Err(ConsensusError::MessageIsEmpty);
        }
        if message.len() < 8 {
            return Err(ConsensusError::MessageUnknownMessageType);
        }
        let (head, tail) = message.split_at(8);
        let mut height = [0u8; 8];
        height.copy_from_slice(head);
        Ok((
            Height::new(u64::from_be_bytes(height)),
            State::new(Bytes::copy_from_slice(tail)),
        ))
    }
}

impl Consensus for GossipEngine {
    fn receive_message(&self, message: &[u8], _now: SystemTime) -> Result<(), ConsensusError> {
        let result = Self::decode(message).and_then(|(height, state)| {
            let mut decided = self.decided.lock();
            if height <= decided.height {
                return Err(ConsensusError::DecideHeightLower);
            }
            decided.height = height;
            decided.round = Round::default();
            decided.state = state;
            Ok(())
        });
        if result.is_err() {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    fn update(&self, _now: SystemTime) -> Result<(), ConsensusError> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn propose(&self, state: State) {
        let payload = {
            let mut decided = self.decided.lock();
            decided.height = decided.height.next();
            decided.round = Round::default();
            decided.state = state;
            Self::encode(decided.height, &decided.state)
        };

        let peers: Vec<Arc<dyn Peer>> = {
            let mut peers = self.peers.lock();
            peers.retain(|peer| peer.strong_count() > 0);
            peers.iter().filter_map(Weak::upgrade).collect()
        };
        for peer in peers {
            if let Err(err) = peer.send(payload.clone()) {
                debug!(peer = %peer.remote_addr(), %err, "broadcast failed");
            }
        }
    }

    fn current_state(&self) -> (Height, Round, State) {
        let decided = self.decided.lock();
        (decided.height, decided.round, decided.state.clone())
    }

    fn public_key(&self) -> PublicKey {
        self.key.clone()
    }
}
