use bftnet_core::Delay;
use serde::{Deserialize, Serialize};

/// Observed delivery delays. `min` and `max` stay `None` until the first
/// delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min: Option<Delay>,
    pub max: Option<Delay>,
    pub total: Delay,
}

impl LatencyStats {
    pub fn record(&mut self, delay: Delay) {
        self.min = Some(self.min.map_or(delay, |min| min.min(delay)));
        self.max = Some(self.max.map_or(delay, |max| max.max(delay)));
        self.total += delay;
    }

    /// Folds another set of observations into this one.
    pub fn merge(&mut self, other: &LatencyStats) {
        if let Some(min) = other.min {
            self.min = Some(self.min.map_or(min, |m| m.min(min)));
        }
        if let Some(max) = other.max {
            self.max = Some(self.max.map_or(max, |m| m.max(max)));
        }
        self.total += other.total;
    }
}

/// Point-in-time copy of a peer's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStats {
    pub messages: u64,
    pub bytes: u64,
    pub dropped: u64,
    pub latencies: LatencyStats,
}

impl PeerStats {
    pub(crate) fn record_delivery(&mut self, delay: Delay, bytes: usize) {
        self.latencies.record(delay);
        self.messages += 1;
        self.bytes += bytes as u64;
    }

    pub(crate) fn record_drop(&mut self) {
        self.dropped += 1;
    }

    /// Mean delay over delivered messages, if any were delivered.
    pub fn mean_latency(&self) -> Option<Delay> {
        if self.messages == 0 {
            return None;
        }
        Some(Delay::from_nanos(
            self.latencies.total.as_nanos() / self.messages as i64,
        ))
    }

    pub fn merge(&mut self, other: &PeerStats) {
        self.messages += other.messages;
        self.bytes += other.bytes;
        self.dropped += other.dropped;
        self.latencies.merge(&other.latencies);
    }
}
