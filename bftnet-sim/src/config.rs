use std::time::Duration;

use bftnet_core::{BftNetError, Result};
use serde::{Deserialize, Serialize};

/// What to do with a sampled delay below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegativeDelayPolicy {
    /// Schedule and record the delay as zero.
    #[default]
    Clamp,
    /// Record the raw negative sample and schedule the delivery for now.
    FireImmediately,
}

/// Fate of deliveries that fire after the peer has been closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOnClose {
    /// In-flight messages are still handed to the engine.
    #[default]
    Deliver,
    /// In-flight messages are discarded and counted as dropped.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcConfig {
    pub latency: Duration,
    pub jitter_ratio: f64,
    pub tick_interval: Duration,
    pub negative_delay: NegativeDelayPolicy,
    pub on_close: DeliveryOnClose,
    pub randomization_seed: Option<u64>,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            jitter_ratio: 0.1,
            tick_interval: Duration::from_millis(20),
            negative_delay: NegativeDelayPolicy::Clamp,
            on_close: DeliveryOnClose::Deliver,
            randomization_seed: None,
        }
    }
}

impl IpcConfig {
    /// Longest accepted update-loop period.
    pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(3600);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_negative_delay(mut self, policy: NegativeDelayPolicy) -> Self {
        self.negative_delay = policy;
        self
    }

    pub fn with_on_close(mut self, on_close: DeliveryOnClose) -> Self {
        self.on_close = on_close;
        self
    }

    pub fn with_randomization_seed(mut self, seed: u64) -> Self {
        self.randomization_seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.jitter_ratio.is_finite() || self.jitter_ratio < 0.0 {
            return Err(BftNetError::invalid_config(format!(
                "jitter_ratio must be a finite non-negative number, got {}",
                self.jitter_ratio
            )));
        }

        if self.tick_interval.is_zero() {
            return Err(BftNetError::invalid_config(
                "tick_interval must be greater than zero",
            ));
        }

        if self.tick_interval > Self::MAX_TICK_INTERVAL {
            return Err(BftNetError::invalid_config(format!(
                "tick_interval must be at most {:?}, got {:?}",
                Self::MAX_TICK_INTERVAL,
                self.tick_interval
            )));
        }

        Ok(())
    }
}
