use std::time::SystemTime;

use crate::{ConsensusError, Height, PublicKey, Round, State};

/// The narrow capability surface a transport needs from a consensus engine.
///
/// Implementations are shared between every peer bound to the same engine,
/// so all methods take `&self` and must be safe to call concurrently.
/// Implementations must not call back into the peer that invoked them.
pub trait Consensus: Send + Sync + 'static {
    /// Feeds one encoded message into the engine.
    fn receive_message(&self, message: &[u8], now: SystemTime) -> Result<(), ConsensusError>;

    /// Advances the engine's internal clock (timeouts, retransmissions).
    fn update(&self, now: SystemTime) -> Result<(), ConsensusError>;

    /// Queues a state to be agreed on at the next height.
    fn propose(&self, state: State);

    /// Latest decided position and state.
    fn current_state(&self) -> (Height, Round, State);

    /// The engine's public verification key.
    fn public_key(&self) -> PublicKey;
}
