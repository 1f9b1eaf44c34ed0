use std::sync::Arc;

use bftnet_core::{BftNetError, Consensus, Delay, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::IpcConfig;
use crate::delay::shared_rng;
use crate::peer::IpcPeer;
use crate::scheduler::Scheduler;
use crate::stats::PeerStats;

/// Aggregated statistics over every peer in a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshReport {
    pub engines: usize,
    pub peers: usize,
    pub stats: PeerStats,
    pub mean_latency: Option<Delay>,
}

/// Fully connected set of peers between local engines.
///
/// For every ordered pair `(from, to)` with `from != to` there is one peer
/// bound to engine `to`: the handle engine `from` uses to reach it. All
/// peers draw delays from one shared random source.
pub struct IpcMesh<E: Consensus, S: Scheduler> {
    links: Vec<Vec<(usize, IpcPeer<E, S>)>>,
}

impl<E: Consensus, S: Scheduler> IpcMesh<E, S> {
    pub const MIN_ENGINES: usize = 2;

    pub fn build(engines: &[Arc<E>], config: IpcConfig, scheduler: Arc<S>) -> Result<Self> {
        if engines.len() < Self::MIN_ENGINES {
            return Err(BftNetError::MeshTooSmall {
                required: Self::MIN_ENGINES,
                actual: engines.len(),
            });
        }
        config.validate()?;

        let rng = shared_rng(config.randomization_seed);
        let mut links = Vec::with_capacity(engines.len());
        for from in 0..engines.len() {
            let mut peers = Vec::with_capacity(engines.len() - 1);
            for (to, engine) in engines.iter().enumerate() {
                if to == from {
                    continue;
                }
                let peer = IpcPeer::with_rng(
                    engine.clone(),
                    config.clone(),
                    scheduler.clone(),
                    rng.clone(),
                )?;
                peers.push((to, peer));
            }
            links.push(peers);
        }

        info!(
            engines = engines.len(),
            peers = engines.len() * (engines.len() - 1),
            latency = ?config.latency,
            "built ipc mesh"
        );

        Ok(Self { links })
    }

    /// Number of engines in the mesh.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn peer_count(&self) -> usize {
        self.links.iter().map(Vec::len).sum()
    }

    /// The peers engine `from` sends through, paired with their target index.
    pub fn peers_of(&self, from: usize) -> Result<&[(usize, IpcPeer<E, S>)]> {
        self.links
            .get(from)
            .map(Vec::as_slice)
            .ok_or(BftNetError::PeerNotFound {
                index: from,
                size: self.len(),
            })
    }

    pub fn peer(&self, from: usize, to: usize) -> Result<&IpcPeer<E, S>> {
        self.peers_of(from)?
            .iter()
            .find(|(target, _)| *target == to)
            .map(|(_, peer)| peer)
            .ok_or(BftNetError::PeerNotFound {
                index: to,
                size: self.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpcPeer<E, S>> {
        self.links.iter().flatten().map(|(_, peer)| peer)
    }

    /// Starts the update loop of every peer.
    pub fn start(&self) {
        for peer in self.iter() {
            peer.update();
        }
    }

    /// Closes every peer; returns how many were still open.
    pub fn close_all(&self) -> usize {
        let closed = self.iter().filter(|peer| peer.close()).count();
        info!(closed, "closed ipc mesh");
        closed
    }

    pub fn report(&self) -> MeshReport {
        let mut stats = PeerStats::default();
        for peer in self.iter() {
            stats.merge(&peer.stats());
        }
        MeshReport {
            engines: self.len(),
            peers: self.peer_count(),
            mean_latency: stats.mean_latency(),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use bftnet_core::{ConsensusError, Height, PublicKey, Round, State};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};

    struct Node {
        id: u8,
        received: AtomicUsize,
        updates: AtomicUsize,
    }

    impl Node {
        fn new(id: u8) -> Arc<Self> {
            Arc::new(Self {
                id,
                received: AtomicUsize::new(0),
                updates: AtomicUsize::new(0),
            })
        }
    }

    impl Consensus for Node {
        fn receive_message(
            &self,
            _message: &[u8],
            _now: SystemTime,
        ) -> std::result::Result<(), ConsensusError> {
            self.received.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn update(&self, _now: SystemTime) -> std::result::Result<(), ConsensusError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn propose(&self, _state: State) {}

        fn current_state(&self) -> (Height, Round, State) {
            (Height::default(), Round::default(), State::default())
        }

        fn public_key(&self) -> PublicKey {
            PublicKey::new(vec![self.id])
        }
    }

    fn config() -> IpcConfig {
        IpcConfig::new()
            .with_latency(Duration::from_millis(10))
            .with_randomization_seed(5)
    }

    #[test]
    fn test_mesh_needs_two_engines() {
        let scheduler = Arc::new(ManualScheduler::new());
        let result = IpcMesh::build(&[Node::new(0)], config(), scheduler);
        assert!(matches!(
            result,
            Err(BftNetError::MeshTooSmall {
                required: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_mesh_topology() {
        let engines: Vec<_> = (0..4).map(Node::new).collect();
        let scheduler = Arc::new(ManualScheduler::new());
        let mesh = IpcMesh::build(&engines, config(), scheduler).unwrap();

        assert_eq!(mesh.len(), 4);
        assert_eq!(mesh.peer_count(), 12);
        for from in 0..4 {
            let peers = mesh.peers_of(from).unwrap();
            assert_eq!(peers.len(), 3);
            assert!(peers.iter().all(|(to, _)| *to != from));
        }
        assert_eq!(mesh.peer(0, 2).unwrap().public_key(), PublicKey::new(vec![2u8]));
        assert!(mesh.peer(1, 1).is_err());
        assert!(mesh.peers_of(9).is_err());
    }

    #[test]
    fn test_broadcast_and_report() {
        let engines: Vec<_> = (0..4).map(Node::new).collect();
        let scheduler = Arc::new(ManualScheduler::new());
        let mesh = IpcMesh::build(&engines, config(), scheduler.clone()).unwrap();

        for (_, peer) in mesh.peers_of(0).unwrap() {
            peer.send(vec![1u8; 64]);
        }
        scheduler.run_all(100);

        assert_eq!(engines[0].received.load(Ordering::SeqCst), 0);
        for engine in &engines[1..] {
            assert_eq!(engine.received.load(Ordering::SeqCst), 1);
        }

        let report = mesh.report();
        assert_eq!(report.engines, 4);
        assert_eq!(report.peers, 12);
        assert_eq!(report.stats.messages, 3);
        assert_eq!(report.stats.bytes, 192);
        assert!(report.mean_latency.is_some());

        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["stats"]["messages"], 3);
        assert_eq!(json["stats"]["dropped"], 0);
    }

    #[test]
    fn test_start_and_close_all() {
        let engines: Vec<_> = (0..3).map(Node::new).collect();
        let scheduler = Arc::new(ManualScheduler::new());
        let mesh = IpcMesh::build(&engines, config(), scheduler.clone()).unwrap();

        mesh.start();
        // every engine has two inbound peers, each ticking it once
        for engine in &engines {
            assert_eq!(engine.updates.load(Ordering::SeqCst), 2);
        }
        assert_eq!(scheduler.pending(), 6);

        assert_eq!(mesh.close_all(), 6);
        assert_eq!(mesh.close_all(), 0);
        scheduler.run_all(100);
        assert_eq!(scheduler.pending(), 0);
        for engine in &engines {
            assert_eq!(engine.updates.load(Ordering::SeqCst), 2);
        }
    }
}
