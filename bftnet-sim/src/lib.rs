//! # bftnet Sim
//!
//! In-process, latency-emulating transport for running several BFT
//! consensus engines inside one test process.
//!
//! ## Key Components
//!
//! - **IpcPeer**: an addressable endpoint bound to one engine; `send` turns a
//!   payload into a delivery scheduled after a normally distributed delay
//! - **DelayGenerator**: samples `mean + 0.1 * mean * Z` from an injected,
//!   seedable random source
//! - **Scheduler**: the timed executor peers hand their work to, with a
//!   tokio-backed real-time implementation and a manual virtual-time one
//! - **Ticker**: re-arms a peer's engine update every tick interval until
//!   the peer is closed
//! - **IpcMesh**: connects a set of engines pairwise and aggregates stats
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use bftnet_sim::{IpcConfig, IpcPeer, ManualScheduler};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let config = IpcConfig::new()
//!     .with_latency(Duration::from_millis(50))
//!     .with_randomization_seed(1);
//! let peer = IpcPeer::new(engine, config, scheduler.clone())?;
//!
//! peer.update();
//! peer.send(encoded_message);
//! scheduler.advance(Duration::from_millis(100));
//! println!("delivered {} messages", peer.message_count());
//! peer.close();
//! ```

pub mod config;
pub mod delay;
pub mod lifecycle;
pub mod mesh;
pub mod peer;
pub mod scheduler;
pub mod stats;
pub mod ticker;

pub use config::*;
pub use delay::*;
pub use lifecycle::*;
pub use mesh::*;
pub use peer::*;
pub use scheduler::*;
pub use stats::*;
pub use ticker::*;
