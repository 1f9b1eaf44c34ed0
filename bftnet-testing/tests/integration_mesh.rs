//! Mesh integration tests
//!
//! Several engines connected pairwise through `IpcMesh`.

use std::sync::Arc;
use std::time::Duration;

use bftnet_core::{BftNetError, Consensus, Height, Peer, State};
use bftnet_sim::{IpcConfig, IpcMesh, ManualScheduler, Scheduler, TokioScheduler};
use bftnet_testing::{init_tracing, run_scenario, GossipEngine, LatencyScenario};
use tokio::time::sleep;

/// Attaches every engine to its outbound peers. The returned handles own the
/// peers; engines only hold them weakly.
fn wire<S: Scheduler>(
    engines: &[Arc<GossipEngine>],
    mesh: &IpcMesh<GossipEngine, S>,
) -> Vec<Arc<dyn Peer>> {
    let mut links = Vec::new();
    for (from, engine) in engines.iter().enumerate() {
        let peers: Vec<Arc<dyn Peer>> = mesh
            .peers_of(from)
            .unwrap()
            .iter()
            .map(|(_, peer)| Arc::new(peer.clone()) as Arc<dyn Peer>)
            .collect();
        engine.attach(&peers);
        links.extend(peers);
    }
    links
}

/// A proposal flooded from one engine reaches every other engine
#[test]
fn test_gossip_converges_deterministically() {
    init_tracing();

    let engines: Vec<_> = (0..4u8).map(|i| GossipEngine::new(vec![i])).collect();
    let scheduler = Arc::new(ManualScheduler::new());
    let config = IpcConfig::new()
        .with_latency(Duration::from_millis(40))
        .with_randomization_seed(21);
    let mesh = IpcMesh::build(&engines, config, scheduler.clone()).unwrap();
    let _links = wire(&engines, &mesh);

    mesh.peer(1, 0).unwrap().propose(State::new(&b"genesis"[..]));
    // the proposer is the engine the peer is bound to
    assert_eq!(engines[0].current_state().0, Height::new(1));

    scheduler.advance(Duration::from_millis(500));

    for engine in &engines {
        let (height, _, state) = engine.current_state();
        assert_eq!(height, Height::new(1));
        assert_eq!(state.as_bytes(), b"genesis");
    }

    let report = mesh.report();
    assert_eq!(report.stats.messages, 3);
    assert_eq!(report.stats.dropped, 0);
}

/// Later proposals overtake nothing: receivers reject stale heights
#[test]
fn test_gossip_tolerates_stale_messages() {
    init_tracing();

    let engines: Vec<_> = (0..3u8).map(|i| GossipEngine::new(vec![i])).collect();
    let scheduler = Arc::new(ManualScheduler::new());
    let config = IpcConfig::new()
        .with_latency(Duration::from_millis(40))
        .with_jitter_ratio(0.5)
        .with_randomization_seed(8);
    let mesh = IpcMesh::build(&engines, config, scheduler.clone()).unwrap();
    let _links = wire(&engines, &mesh);

    for n in 0..20u8 {
        mesh.peer(1, 0).unwrap().propose(State::new(vec![n]));
    }
    scheduler.advance(Duration::from_secs(1));

    for engine in &engines[1..] {
        let (height, _, state) = engine.current_state();
        assert_eq!(height, Height::new(20));
        assert_eq!(state.as_bytes(), &[19]);
    }
    // with independent delays some lower heights arrive after higher ones
    let stale: usize = engines[1..].iter().map(|e| e.rejected()).sum();
    assert!(stale > 0);
    assert_eq!(mesh.report().stats.messages, 40);
}

/// Mesh on a live runtime with ticking peers
#[tokio::test]
async fn test_mesh_on_tokio_runtime() {
    init_tracing();

    let engines: Vec<_> = (0..4u8).map(|i| GossipEngine::new(vec![i])).collect();
    let scheduler = Arc::new(TokioScheduler::try_current().unwrap());
    let config = IpcConfig::new().with_latency(Duration::from_millis(10));
    let mesh = IpcMesh::build(&engines, config, scheduler).unwrap();
    let _links = wire(&engines, &mesh);

    mesh.start();
    engines[2].propose(State::new(&b"live"[..]));
    sleep(Duration::from_millis(150)).await;
    mesh.close_all();

    for engine in &engines {
        assert_eq!(engine.current_state().2.as_bytes(), b"live");
        // three inbound peers each tick the engine, at least a few rounds
        assert!(engine.ticks() >= 6, "only {} ticks", engine.ticks());
    }
}

#[test]
fn test_mesh_rejects_single_engine() {
    let engines = vec![GossipEngine::new(vec![0u8])];
    let scheduler = Arc::new(ManualScheduler::new());
    let result = IpcMesh::build(&engines, IpcConfig::new(), scheduler);
    assert!(matches!(result, Err(BftNetError::MeshTooSmall { .. })));
}

/// Scenario runner delivers every message and reports sane latencies
#[tokio::test]
async fn test_scenario_runner() {
    init_tracing();

    let scenario = LatencyScenario {
        name: "smoke".to_string(),
        description: "three engines, 50ms".to_string(),
        engine_count: 3,
        latency: Duration::from_millis(50),
        rounds: 4,
        payload_size: 100,
        settle: Duration::from_millis(400),
        seed: 99,
    };

    let result = run_scenario(&scenario).await.unwrap();
    assert_eq!(result.expected_messages, 24);
    assert!(result.all_delivered());
    assert_eq!(result.report.stats.bytes, 2400);

    let mean = result.report.mean_latency.unwrap();
    assert!(mean > bftnet_core::Delay::from_millis(40));
    assert!(mean < bftnet_core::Delay::from_millis(60));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["report"]["stats"]["messages"], 24);
}

/// Dropping the mesh and the peer handles frees every engine
#[test]
fn test_wired_mesh_releases_engines() {
    let engines: Vec<_> = (0..3u8).map(|i| GossipEngine::new(vec![i])).collect();
    let scheduler = Arc::new(ManualScheduler::new());
    let config = IpcConfig::new()
        .with_latency(Duration::from_millis(5))
        .with_randomization_seed(2);
    let mesh = IpcMesh::build(&engines, config, scheduler.clone()).unwrap();
    let links = wire(&engines, &mesh);

    mesh.start();
    engines[0].propose(State::new(&b"x"[..]));
    scheduler.advance(Duration::from_millis(100));
    assert!(engines.iter().all(|e| e.attached() == 2));

    mesh.close_all();
    scheduler.run_all(100);
    drop(mesh);
    drop(links);

    assert!(engines.iter().all(|e| e.attached() == 0));
    for engine in &engines {
        assert_eq!(Arc::strong_count(engine), 1);
    }
}
