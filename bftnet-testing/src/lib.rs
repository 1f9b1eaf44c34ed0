//! # bftnet Testing
//!
//! Test support for the bftnet simulated transport.
//!
//! - **Engines**: `RecordingEngine` records what a transport delivered and
//!   can reject on demand; `GossipEngine` floods height-ordered proposals
//!   so a mesh can be watched converging
//! - **Scenarios**: full-mesh latency scenarios run on a live tokio runtime,
//!   with a printed summary table
//! - **Tracing**: `init_tracing` for tests, filtered by `RUST_LOG`

pub mod engines;
pub mod scenarios;

pub use engines::{GossipEngine, Received, RecordingEngine};
pub use scenarios::{
    create_latency_scenarios, print_scenario_summary, run_all_scenarios, run_scenario,
    LatencyScenario, ScenarioResult,
};

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call takes effect.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
