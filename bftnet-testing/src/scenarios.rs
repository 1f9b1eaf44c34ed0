use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context};
use serde::Serialize;
use tokio::time::sleep;
use tracing::info;

use bftnet_sim::{IpcConfig, IpcMesh, MeshReport, TokioScheduler};

use crate::engines::RecordingEngine;

/// A full-mesh traffic pattern run against real-time schedulers.
#[derive(Debug, Clone)]
pub struct LatencyScenario {
    pub name: String,
    pub description: String,
    pub engine_count: usize,
    pub latency: Duration,
    pub rounds: usize,
    pub payload_size: usize,
    pub settle: Duration,
    pub seed: u64,
}

impl LatencyScenario {
    /// Messages the mesh carries when every engine sends `rounds` payloads
    /// to every other engine.
    pub fn expected_messages(&self) -> u64 {
        (self.engine_count * self.engine_count.saturating_sub(1) * self.rounds) as u64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub report: MeshReport,
    pub expected_messages: u64,
    pub elapsed: Duration,
}

impl ScenarioResult {
    pub fn all_delivered(&self) -> bool {
        self.report.stats.messages == self.expected_messages
    }
}

/// Runs one scenario on the current tokio runtime.
pub async fn run_scenario(scenario: &LatencyScenario) -> anyhow::Result<ScenarioResult> {
    ensure!(
        scenario.engine_count >= 2,
        "scenario '{}' needs at least two engines",
        scenario.name
    );
    info!("Running latency scenario: {}", scenario.name);

    let scheduler = Arc::new(
        TokioScheduler::try_current().context("latency scenarios need a tokio runtime")?,
    );
    let engines: Vec<_> = (0..scenario.engine_count)
        .map(|i| RecordingEngine::new((i as u32).to_be_bytes().to_vec()))
        .collect();

    let config = IpcConfig::new()
        .with_latency(scenario.latency)
        .with_randomization_seed(scenario.seed);
    let mesh = IpcMesh::build(&engines, config, scheduler)?;

    let start = Instant::now();
    mesh.start();

    for round in 0..scenario.rounds {
        for from in 0..mesh.len() {
            for (_, peer) in mesh.peers_of(from)? {
                let mut payload = vec![0u8; scenario.payload_size];
                if let Some(first) = payload.first_mut() {
                    *first = round as u8;
                }
                peer.send(payload);
            }
        }
    }

    sleep(scenario.settle).await;
    mesh.close_all();

    let result = ScenarioResult {
        name: scenario.name.clone(),
        report: mesh.report(),
        expected_messages: scenario.expected_messages(),
        elapsed: start.elapsed(),
    };

    info!(
        "Scenario '{}' delivered {}/{} messages, mean latency {:?}",
        result.name,
        result.report.stats.messages,
        result.expected_messages,
        result.report.mean_latency
    );

    Ok(result)
}

pub fn create_latency_scenarios() -> Vec<LatencyScenario> {
    vec![
        LatencyScenario {
            name: "LAN".to_string(),
            description: "Four engines on a low-latency link".to_string(),
            engine_count: 4,
            latency: Duration::from_millis(5),
            rounds: 10,
            payload_size: 128,
            settle: Duration::from_millis(200),
            seed: 1,
        },
        LatencyScenario {
            name: "WAN".to_string(),
            description: "Four engines across a 50ms link".to_string(),
            engine_count: 4,
            latency: Duration::from_millis(50),
            rounds: 10,
            payload_size: 100,
            settle: Duration::from_millis(500),
            seed: 2,
        },
        LatencyScenario {
            name: "Large Cluster".to_string(),
            description: "Ten engines exchanging small messages".to_string(),
            engine_count: 10,
            latency: Duration::from_millis(20),
            rounds: 3,
            payload_size: 64,
            settle: Duration::from_millis(400),
            seed: 3,
        },
    ]
}

pub async fn run_all_scenarios() -> anyhow::Result<Vec<ScenarioResult>> {
    let mut results = Vec::new();
    for scenario in create_latency_scenarios() {
        results.push(run_scenario(&scenario).await?);
    }
    Ok(results)
}

pub fn print_scenario_summary(results: &[ScenarioResult]) {
    println!("\n=== LATENCY SCENARIO SUMMARY ===");
    println!(
        "{:<15} {:<12} {:<12} {:<12} {:<12} {:<12}",
        "Scenario", "Delivered", "Bytes", "Min", "Mean", "Max"
    );
    println!("{}", "-".repeat(80));

    for result in results {
        let latencies = result.report.stats.latencies;
        let show = |d: Option<bftnet_core::Delay>| d.map_or("-".to_string(), |d| d.to_string());
        println!(
            "{:<15} {:<12} {:<12} {:<12} {:<12} {:<12}",
            result.name,
            format!("{}/{}", result.report.stats.messages, result.expected_messages),
            result.report.stats.bytes,
            show(latencies.min),
            show(result.report.mean_latency),
            show(latencies.max),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny(engine_count: usize) -> LatencyScenario {
        LatencyScenario {
            name: "tiny".to_string(),
            description: "two engines, 1ms".to_string(),
            engine_count,
            latency: Duration::from_millis(1),
            rounds: 2,
            payload_size: 16,
            settle: Duration::from_millis(100),
            seed: 4,
        }
    }

    #[test]
    fn test_expected_messages() {
        assert_eq!(tiny(2).expected_messages(), 4);
        assert_eq!(tiny(5).expected_messages(), 40);
    }

    #[test]
    fn test_scenario_needs_two_engines() {
        let err = tokio_test::block_on(run_scenario(&tiny(1))).unwrap_err();
        assert!(err.to_string().contains("at least two engines"));
    }

    #[test]
    fn test_scenario_on_blocking_runtime() {
        let result = tokio_test::block_on(run_scenario(&tiny(2))).unwrap();
        assert!(result.all_delivered());
        assert_eq!(result.report.stats.bytes, 64);
        assert_eq!(result.report.stats.dropped, 0);
    }

    #[test]
    fn test_default_scenarios_are_well_formed() {
        let scenarios = create_latency_scenarios();
        assert_eq!(scenarios.len(), 3);
        for scenario in &scenarios {
            assert!(scenario.engine_count >= 2);
            assert!(scenario.settle > scenario.latency * 4);
        }
    }
}
