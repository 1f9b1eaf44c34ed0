//! # bftnet Core
//!
//! Shared vocabulary for the bftnet in-process transport:
//!
//! - **Types**: `Height`, `Round`, `State`, `PublicKey`, the synthetic
//!   `PeerAddr` and the signed `Delay` used for latency accounting
//! - **Consensus**: the capability trait a BFT engine exposes to its transport
//! - **Peer**: the trait an engine uses to reach remote participants
//! - **Errors**: the engine's validation error catalog and the workspace's
//!   own error type
//!
//! ```rust
//! use bftnet_core::{ConsensusError, ErrorPhase};
//!
//! let error = ConsensusError::DecideProofInsufficient;
//! assert_eq!(error.phase(), ErrorPhase::Decide);
//! ```

pub mod consensus;
pub mod error;
pub mod network;
pub mod types;

pub use consensus::Consensus;
pub use error::*;
pub use network::Peer;
pub use types::*;
