use bytes::Bytes;

use crate::{PeerAddr, PublicKey, Result};

/// A remote participant as seen by a consensus engine.
///
/// `send` is fire-and-forget: a successful return only means the message
/// was handed to the transport, not that it arrived.
pub trait Peer: Send + Sync {
    /// Long-term identity of the remote participant.
    fn public_key(&self) -> PublicKey;

    /// Transport-level address, used for logging and deduplication.
    fn remote_addr(&self) -> PeerAddr;

    /// Submits an already encoded and signed message for delivery.
    fn send(&self, message: Bytes) -> Result<()>;
}
